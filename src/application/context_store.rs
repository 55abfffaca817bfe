//! ContextStore - per-session context and conversation, per-project history.
//!
//! Every session key and every project owns its own `tokio::sync::Mutex`.
//! The outer maps are locked only long enough to fetch or create that cell,
//! so operations on one key are linearizable while different keys never
//! wait on each other.
//!
//! Snippet history is append-only. When a [`PersistenceStore`] is attached,
//! every recorded or annotated snippet is handed to a background writer in
//! order; the caller never waits on storage and write failures are logged.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, Mutex, RwLock};

use crate::domain::codegen::{
    CommandContext, ContextPatch, ConversationEntry, ConversationLog, EngineError, Language, Snippet,
};
use crate::domain::foundation::{FileId, ProjectId, QualityScore, SessionKey, SnippetId};
use crate::ports::{PersistenceError, PersistenceStore};

/// Default number of conversation entries kept per session.
pub const DEFAULT_CONVERSATION_CAP: usize = 10;

/// Values a fresh session context starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDefaults {
    pub language: Language,
    pub framework: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub conversation_cap: usize,
}

impl Default for ContextDefaults {
    fn default() -> Self {
        Self {
            language: Language::Python,
            framework: String::new(),
            temperature: 0.2,
            max_tokens: 2048,
            conversation_cap: DEFAULT_CONVERSATION_CAP,
        }
    }
}

struct SessionState {
    context: Option<CommandContext>,
    conversation: ConversationLog,
}

type SessionCell = Arc<Mutex<SessionState>>;
type ProjectCell = Arc<Mutex<Vec<Snippet>>>;

pub struct ContextStore {
    defaults: ContextDefaults,
    sessions: RwLock<HashMap<SessionKey, SessionCell>>,
    projects: RwLock<HashMap<ProjectId, ProjectCell>>,
    writer: Option<SnippetWriter>,
}

impl ContextStore {
    pub fn new(defaults: ContextDefaults) -> Self {
        Self {
            defaults,
            sessions: RwLock::new(HashMap::new()),
            projects: RwLock::new(HashMap::new()),
            writer: None,
        }
    }

    /// Mirrors every recorded and annotated snippet into `store`.
    pub fn with_persistence(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.writer = Some(SnippetWriter::new(store));
        self
    }

    pub fn defaults(&self) -> &ContextDefaults {
        &self.defaults
    }

    // ───────────────────────────────────────────────────────────────
    // Session context
    // ───────────────────────────────────────────────────────────────

    /// Current context of a session. An unseen session starts from the
    /// configured defaults, scoped to `project_id`.
    pub async fn get_context(
        &self,
        session_key: &SessionKey,
        project_id: &ProjectId,
    ) -> Result<CommandContext, EngineError> {
        let cell = self.session(session_key).await;
        let mut state = cell.lock().await;
        if let Some(context) = &state.context {
            return Ok(context.clone());
        }

        let context = CommandContext::builder(session_key.clone(), project_id.clone())
            .with_language(self.defaults.language.clone())
            .with_framework(self.defaults.framework.clone())
            .with_temperature(self.defaults.temperature)
            .with_max_tokens(self.defaults.max_tokens)
            .build()?;
        state.context = Some(context.clone());
        Ok(context)
    }

    /// Context last stored for a session, if any.
    pub async fn current_context(&self, session_key: &SessionKey) -> Option<CommandContext> {
        let cell = self.existing_session(session_key).await?;
        let state = cell.lock().await;
        state.context.clone()
    }

    /// Derives a new context from the session's current one and stores it.
    ///
    /// # Errors
    ///
    /// `EngineError::InvalidRequest` if the session has no context yet or
    /// the patched context is invalid. The stored context is left unchanged.
    pub async fn update_context(
        &self,
        session_key: &SessionKey,
        patch: ContextPatch,
    ) -> Result<CommandContext, EngineError> {
        let cell = self.session(session_key).await;
        let mut state = cell.lock().await;
        let current = state.context.as_ref().ok_or_else(|| {
            EngineError::InvalidRequest(format!("session '{}' has no context", session_key))
        })?;

        let next = current.derive(patch)?;
        state.context = Some(next.clone());
        Ok(next)
    }

    /// Stores `context` as its session's current context.
    pub async fn set_context(&self, context: CommandContext) {
        let cell = self.session(context.session_key()).await;
        cell.lock().await.context = Some(context);
    }

    // ───────────────────────────────────────────────────────────────
    // Conversation
    // ───────────────────────────────────────────────────────────────

    /// Appends to the session's conversation. Returns how many old entries
    /// were evicted.
    pub async fn append_conversation(&self, session_key: &SessionKey, entry: ConversationEntry) -> usize {
        let cell = self.session(session_key).await;
        let evicted = cell.lock().await.conversation.push(entry);
        if evicted > 0 {
            tracing::debug!(session = %session_key, evicted, "Evicted conversation entries");
        }
        evicted
    }

    /// Conversation entries, oldest first.
    pub async fn conversation(&self, session_key: &SessionKey) -> Vec<ConversationEntry> {
        match self.existing_session(session_key).await {
            Some(cell) => cell.lock().await.conversation.entries(),
            None => Vec::new(),
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Snippet history
    // ───────────────────────────────────────────────────────────────

    /// Appends a snippet to its project's history.
    pub async fn record_snippet(&self, snippet: Snippet) {
        let cell = self.project(snippet.project_id()).await;
        let mut history = cell.lock().await;
        if let Some(writer) = &self.writer {
            writer.enqueue(snippet.clone());
        }
        tracing::debug!(
            snippet_id = %snippet.id(),
            project = %snippet.project_id(),
            "Recorded snippet"
        );
        history.push(snippet);
    }

    /// Sets the security warnings and quality score of a recorded snippet.
    ///
    /// Returns the updated snippet, or `None` if the project has no snippet
    /// with that id.
    pub async fn annotate_snippet(
        &self,
        project_id: &ProjectId,
        snippet_id: SnippetId,
        security_warnings: &[String],
        quality_score: QualityScore,
    ) -> Option<Snippet> {
        let cell = self.existing_project(project_id).await?;
        let mut history = cell.lock().await;
        let snippet = history.iter_mut().find(|s| s.id() == snippet_id)?;
        snippet.annotate(security_warnings, quality_score);

        let updated = snippet.clone();
        if let Some(writer) = &self.writer {
            writer.enqueue(updated.clone());
        }
        Some(updated)
    }

    /// Snippets of a project in recording order, optionally limited to one
    /// file.
    pub async fn history(&self, project_id: &ProjectId, file_id: Option<&FileId>) -> Vec<Snippet> {
        let Some(cell) = self.existing_project(project_id).await else {
            return Vec::new();
        };
        let history = cell.lock().await;
        history
            .iter()
            .filter(|s| file_id.map_or(true, |f| s.file_id() == Some(f)))
            .cloned()
            .collect()
    }

    /// Loads a project's history from the persistence store.
    ///
    /// Persisted snippets go ahead of the live ones. A snippet already in
    /// memory keeps its live annotations, so restoring twice adds nothing.
    /// Returns the number of snippets added.
    pub async fn restore_history(&self, project_id: &ProjectId) -> Result<usize, PersistenceError> {
        let Some(writer) = &self.writer else {
            return Ok(0);
        };

        let loaded = writer.store.load_snippets(project_id).await?;
        let cell = self.project(project_id).await;
        let mut history = cell.lock().await;

        let live: HashSet<SnippetId> = history.iter().map(|s| s.id()).collect();
        // Last write per id wins; the first occurrence keeps its position.
        let mut latest: HashMap<SnippetId, Snippet> = HashMap::new();
        let mut order = Vec::new();
        for snippet in loaded {
            if live.contains(&snippet.id()) {
                continue;
            }
            if !latest.contains_key(&snippet.id()) {
                order.push(snippet.id());
            }
            latest.insert(snippet.id(), snippet);
        }

        let mut merged: Vec<Snippet> = order.iter().filter_map(|id| latest.remove(id)).collect();
        let restored = merged.len();
        merged.append(&mut history);
        *history = merged;

        tracing::info!(project = %project_id, restored, total = history.len(), "Restored snippet history");
        Ok(restored)
    }

    // ───────────────────────────────────────────────────────────────
    // Cells
    // ───────────────────────────────────────────────────────────────

    async fn existing_session(&self, key: &SessionKey) -> Option<SessionCell> {
        self.sessions.read().await.get(key).cloned()
    }

    async fn session(&self, key: &SessionKey) -> SessionCell {
        if let Some(cell) = self.existing_session(key).await {
            return cell;
        }
        let mut sessions = self.sessions.write().await;
        let cap = self.defaults.conversation_cap;
        Arc::clone(sessions.entry(key.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(SessionState {
                context: None,
                conversation: ConversationLog::with_cap(cap),
            }))
        }))
    }

    async fn existing_project(&self, project_id: &ProjectId) -> Option<ProjectCell> {
        self.projects.read().await.get(project_id).cloned()
    }

    async fn project(&self, project_id: &ProjectId) -> ProjectCell {
        if let Some(cell) = self.existing_project(project_id).await {
            return cell;
        }
        let mut projects = self.projects.write().await;
        Arc::clone(projects.entry(project_id.clone()).or_default())
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(ContextDefaults::default())
    }
}

/// Ordered background writes of snippets to a persistence store.
///
/// The writer task is started on first use, so the store can be built
/// outside a runtime.
struct SnippetWriter {
    store: Arc<dyn PersistenceStore>,
    sender: mpsc::UnboundedSender<Snippet>,
    receiver: StdMutex<Option<mpsc::UnboundedReceiver<Snippet>>>,
}

impl SnippetWriter {
    fn new(store: Arc<dyn PersistenceStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            store,
            sender,
            receiver: StdMutex::new(Some(receiver)),
        }
    }

    fn enqueue(&self, snippet: Snippet) {
        let pending = match self.receiver.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(receiver) = pending {
            tokio::spawn(write_loop(Arc::clone(&self.store), receiver));
        }

        if self.sender.send(snippet).is_err() {
            tracing::warn!("Snippet writer stopped; snippet not persisted");
        }
    }
}

async fn write_loop(store: Arc<dyn PersistenceStore>, mut receiver: mpsc::UnboundedReceiver<Snippet>) {
    while let Some(snippet) = receiver.recv().await {
        if let Err(e) = store.save_snippet(&snippet).await {
            tracing::warn!(snippet_id = %snippet.id(), error = %e, "Failed to persist snippet");
        }
    }
}
