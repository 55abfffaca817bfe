//! In-memory persistence store.
//!
//! Keeps snippets in insertion order with upsert by id. Useful for tests
//! that restart the context store within one process.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::codegen::{FeedbackRecord, Snippet};
use crate::domain::foundation::ProjectId;
use crate::ports::{PersistenceError, PersistenceStore};

#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistenceStore {
    snippets: Arc<RwLock<Vec<Snippet>>>,
    feedback: Arc<RwLock<Vec<FeedbackRecord>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPersistenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `PersistenceError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn snippet_count(&self) -> usize {
        self.snippets.read().await.len()
    }

    pub async fn feedback_count(&self) -> usize {
        self.feedback.read().await.len()
    }

    fn check_available(&self) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for InMemoryPersistenceStore {
    async fn save_snippet(&self, snippet: &Snippet) -> Result<(), PersistenceError> {
        self.check_available()?;
        let mut snippets = self.snippets.write().await;
        match snippets.iter_mut().find(|s| s.id() == snippet.id()) {
            Some(existing) => *existing = snippet.clone(),
            None => snippets.push(snippet.clone()),
        }
        Ok(())
    }

    async fn load_snippets(&self, project_id: &ProjectId) -> Result<Vec<Snippet>, PersistenceError> {
        self.check_available()?;
        let snippets = self.snippets.read().await;
        Ok(snippets
            .iter()
            .filter(|s| s.project_id() == project_id)
            .cloned()
            .collect())
    }

    async fn save_feedback(&self, records: &[FeedbackRecord]) -> Result<(), PersistenceError> {
        self.check_available()?;
        self.feedback.write().await.extend_from_slice(records);
        Ok(())
    }

    async fn load_feedback(&self) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        self.check_available()?;
        Ok(self.feedback.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codegen::{CommandContext, SnippetDraft};
    use crate::domain::foundation::{BackendId, FeedbackRating, QualityScore, SessionKey, UserId};

    fn snippet(project: &str, content: &str) -> Snippet {
        let context = CommandContext::builder(SessionKey::new("s1").unwrap(), ProjectId::new(project).unwrap())
            .build()
            .unwrap();
        SnippetDraft::for_context(&context, BackendId::new("b").unwrap(), content).build()
    }

    #[tokio::test]
    async fn save_snippet_upserts_by_id() {
        let store = InMemoryPersistenceStore::new();
        let mut s = snippet("p1", "x = 1");
        store.save_snippet(&s).await.unwrap();

        s.annotate(&["code-injection: eval".to_string()], QualityScore::new(93));
        store.save_snippet(&s).await.unwrap();

        let loaded = store.load_snippets(&ProjectId::new("p1").unwrap()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].quality_score().value(), 93);
    }

    #[tokio::test]
    async fn load_snippets_filters_by_project() {
        let store = InMemoryPersistenceStore::new();
        store.save_snippet(&snippet("p1", "a")).await.unwrap();
        store.save_snippet(&snippet("p2", "b")).await.unwrap();
        store.save_snippet(&snippet("p1", "c")).await.unwrap();

        let loaded = store.load_snippets(&ProjectId::new("p1").unwrap()).await.unwrap();
        let contents: Vec<&str> = loaded.iter().map(|s| s.content()).collect();
        assert_eq!(contents, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn feedback_is_appended() {
        let store = InMemoryPersistenceStore::new();
        let record = FeedbackRecord::new(
            snippet("p1", "a").id(),
            FeedbackRating::new(5).unwrap(),
            "great",
            UserId::new("u1").unwrap(),
        );
        store.save_feedback(&[record.clone(), record]).await.unwrap();

        assert_eq!(store.load_feedback().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryPersistenceStore::new();
        store.set_unavailable(true);

        assert!(store.save_snippet(&snippet("p1", "a")).await.is_err());
        assert!(store.load_feedback().await.is_err());

        store.set_unavailable(false);
        assert!(store.load_feedback().await.is_ok());
    }
}
