//! File-based persistence store.
//!
//! Writes two JSON-lines files in a base directory:
//!
//! - `snippets.jsonl` - one line per save; the last line for an id wins on load
//! - `feedback.jsonl` - one line per feedback record
//!
//! Files are append-only so a crash mid-write loses at most the last line,
//! which is skipped on load.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::codegen::{FeedbackRecord, Snippet};
use crate::domain::foundation::{ProjectId, SnippetId};
use crate::ports::{PersistenceError, PersistenceStore};

const SNIPPETS_FILE: &str = "snippets.jsonl";
const FEEDBACK_FILE: &str = "feedback.jsonl";

/// JSON-lines storage for snippets and feedback.
#[derive(Debug)]
pub struct JsonFilePersistenceStore {
    base_path: PathBuf,
    /// Serializes appends so lines never interleave.
    write_lock: Mutex<()>,
}

impl JsonFilePersistenceStore {
    /// Create a store rooted at `base_path`. The directory is created on
    /// first write.
    ///
    /// # Example
    /// ```ignore
    /// let store = JsonFilePersistenceStore::new("./data/codegen");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn snippets_path(&self) -> PathBuf {
        self.base_path.join(SNIPPETS_FILE)
    }

    fn feedback_path(&self) -> PathBuf {
        self.base_path.join(FEEDBACK_FILE)
    }

    async fn append_lines(&self, path: &Path, lines: &[String]) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.base_path).await?;

        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        let mut buffer = String::new();
        for line in lines {
            buffer.push_str(line);
            buffer.push('\n');
        }
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Reads every parseable line of a file. A missing file reads as empty.
    async fn read_lines<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Vec<T>, PersistenceError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut items = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping unreadable persistence line"
                    );
                }
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl PersistenceStore for JsonFilePersistenceStore {
    async fn save_snippet(&self, snippet: &Snippet) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(snippet)?;
        self.append_lines(&self.snippets_path(), &[line]).await
    }

    async fn load_snippets(&self, project_id: &ProjectId) -> Result<Vec<Snippet>, PersistenceError> {
        let all: Vec<Snippet> = self.read_lines(&self.snippets_path()).await?;

        // First occurrence fixes the position, the last one the value.
        let mut order: Vec<SnippetId> = Vec::new();
        let mut latest: HashMap<SnippetId, Snippet> = HashMap::new();
        for snippet in all.into_iter().filter(|s| s.project_id() == project_id) {
            if !latest.contains_key(&snippet.id()) {
                order.push(snippet.id());
            }
            latest.insert(snippet.id(), snippet);
        }

        Ok(order.iter().filter_map(|id| latest.remove(id)).collect())
    }

    async fn save_feedback(&self, records: &[FeedbackRecord]) -> Result<(), PersistenceError> {
        if records.is_empty() {
            return Ok(());
        }
        let lines = records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        self.append_lines(&self.feedback_path(), &lines).await
    }

    async fn load_feedback(&self) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        self.read_lines(&self.feedback_path()).await
    }
}
