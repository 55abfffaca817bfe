//! FeedbackCollector - bounded intake of snippet ratings.
//!
//! `submit` never awaits and never fails: a record is either queued or
//! rejected with a reason. The `FeedbackFlusher` background service moves
//! queued records into the PersistenceStore.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `flush_interval` | 1000ms | How often queued records are written |
//! | `batch_size` | 100 | Max records written per flush |
//!
//! ## Graceful Shutdown
//!
//! The flusher listens for a shutdown signal and writes one final batch
//! before stopping.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::codegen::FeedbackRecord;
use crate::domain::foundation::{FeedbackRating, SnippetId, UserId};
use crate::ports::{PersistenceError, PersistenceStore};

/// Default number of records the queue holds.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Why a submission was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    QueueFull,
    InvalidRating,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::QueueFull => "queue_full",
            RejectReason::InvalidRating => "invalid_rating",
        }
    }
}

/// Acknowledgement returned to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackAck {
    /// Accepted; `pending` is the queue length after the push.
    Queued { pending: usize },
    Rejected(RejectReason),
}

impl FeedbackAck {
    pub fn is_queued(&self) -> bool {
        matches!(self, FeedbackAck::Queued { .. })
    }
}

/// Bounded FIFO of feedback records awaiting persistence.
pub struct FeedbackCollector {
    queue: Mutex<VecDeque<FeedbackRecord>>,
    capacity: usize,
}

impl FeedbackCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queues a rating for a snippet.
    ///
    /// Snippet ids are not checked against history.
    pub fn submit(
        &self,
        snippet_id: SnippetId,
        rating: u8,
        free_text: impl Into<String>,
        user_id: UserId,
    ) -> FeedbackAck {
        let rating = match FeedbackRating::new(rating) {
            Ok(rating) => rating,
            Err(_) => return FeedbackAck::Rejected(RejectReason::InvalidRating),
        };

        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return FeedbackAck::Rejected(RejectReason::QueueFull);
        }
        queue.push_back(FeedbackRecord::new(snippet_id, rating, free_text, user_id));
        FeedbackAck::Queued {
            pending: queue.len(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Removes up to `max` of the oldest records.
    pub fn drain(&self, max: usize) -> Vec<FeedbackRecord> {
        let mut queue = self.lock();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Puts a batch back at the front, keeping its order.
    ///
    /// Requeued records may push the queue past capacity; they were
    /// accepted once and are not dropped.
    pub fn requeue(&self, batch: Vec<FeedbackRecord>) {
        let mut queue = self.lock();
        for record in batch.into_iter().rev() {
            queue.push_front(record);
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<FeedbackRecord>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for FeedbackCollector {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Configuration for the FeedbackFlusher service.
#[derive(Debug, Clone)]
pub struct FeedbackFlusherConfig {
    /// How often to write queued records.
    pub flush_interval: Duration,

    /// Maximum records written per flush.
    pub batch_size: usize,
}

impl Default for FeedbackFlusherConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(1000),
            batch_size: 100,
        }
    }
}

impl FeedbackFlusherConfig {
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }
}

/// Background service that writes queued feedback to the PersistenceStore.
pub struct FeedbackFlusher {
    collector: Arc<FeedbackCollector>,
    store: Arc<dyn PersistenceStore>,
    config: FeedbackFlusherConfig,
}

impl FeedbackFlusher {
    pub fn new(collector: Arc<FeedbackCollector>, store: Arc<dyn PersistenceStore>) -> Self {
        Self::with_config(collector, store, FeedbackFlusherConfig::default())
    }

    pub fn with_config(
        collector: Arc<FeedbackCollector>,
        store: Arc<dyn PersistenceStore>,
        config: FeedbackFlusherConfig,
    ) -> Self {
        Self {
            collector,
            store,
            config,
        }
    }

    /// Run the flush loop until the shutdown signal is received.
    ///
    /// Write failures are logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.flush_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        self.flush_remaining().await;
                        tracing::info!(pending = self.collector.pending_count(), "Feedback flusher stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.flush_once().await {
                        tracing::warn!(error = %e, "Feedback flush failed, batch requeued");
                    }
                }
            }
        }
    }

    /// Writes one batch. On failure the batch goes back to the queue front.
    pub async fn flush_once(&self) -> Result<usize, PersistenceError> {
        let batch = self.collector.drain(self.config.batch_size);
        if batch.is_empty() {
            return Ok(0);
        }

        match self.store.save_feedback(&batch).await {
            Ok(()) => {
                tracing::debug!(records = batch.len(), "Feedback batch persisted");
                Ok(batch.len())
            }
            Err(e) => {
                self.collector.requeue(batch);
                Err(e)
            }
        }
    }

    async fn flush_remaining(&self) {
        loop {
            match self.flush_once().await {
                Ok(0) => return,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Final feedback flush failed");
                    return;
                }
            }
        }
    }
}
