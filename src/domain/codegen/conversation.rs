//! Short-term conversation memory for a session.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::foundation::{SnippetId, Timestamp};

use super::GenerationMode;

/// One prompt/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub prompt: String,
    pub mode: GenerationMode,
    /// Snippet produced for the prompt, if generation succeeded.
    pub snippet_id: Option<SnippetId>,
    /// Short description of the answer, reused when building later prompts.
    pub summary: String,
    pub at: Timestamp,
}

impl ConversationEntry {
    pub fn new(prompt: impl Into<String>, mode: GenerationMode) -> Self {
        Self {
            prompt: prompt.into(),
            mode,
            snippet_id: None,
            summary: String::new(),
            at: Timestamp::now(),
        }
    }

    pub fn with_answer(mut self, snippet_id: SnippetId, summary: impl Into<String>) -> Self {
        self.snippet_id = Some(snippet_id);
        self.summary = summary.into();
        self
    }
}

/// FIFO log that never holds more than `cap` entries.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    cap: usize,
    entries: VecDeque<ConversationEntry>,
}

impl ConversationLog {
    /// Creates an empty log. A cap of zero is raised to one.
    pub fn with_cap(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            entries: VecDeque::with_capacity(cap),
        }
    }

    /// Appends an entry, evicting the oldest ones beyond the cap.
    ///
    /// Returns how many entries were evicted.
    pub fn push(&mut self, entry: ConversationEntry) -> usize {
        self.entries.push_back(entry);
        let mut evicted = 0;
        while self.entries.len() > self.cap {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.entries.iter().cloned().collect()
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ConversationEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }
}
