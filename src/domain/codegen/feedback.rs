//! FeedbackRecord - a human rating of a generated snippet.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{FeedbackRating, SnippetId, Timestamp, UserId};

/// Append-only rating record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    snippet_id: SnippetId,
    rating: FeedbackRating,
    free_text: String,
    user_id: UserId,
    submitted_at: Timestamp,
}

impl FeedbackRecord {
    pub fn new(
        snippet_id: SnippetId,
        rating: FeedbackRating,
        free_text: impl Into<String>,
        user_id: UserId,
    ) -> Self {
        Self {
            snippet_id,
            rating,
            free_text: free_text.into(),
            user_id,
            submitted_at: Timestamp::now(),
        }
    }

    pub fn snippet_id(&self) -> SnippetId {
        self.snippet_id
    }

    pub fn rating(&self) -> FeedbackRating {
        self.rating
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }
}
