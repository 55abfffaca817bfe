//! Mock backend for testing selection and orchestration.
//!
//! Unlike [`ProviderBackend`](super::ProviderBackend) this needs no model
//! client: it hands out scripted snippet contents directly and lets tests
//! flip its health at any time.
//!
//! # Example
//!
//! ```ignore
//! let backend = MockBackend::new("fast", BackendKind::Mistral)
//!     .with_content("def add(a, b):\n    return a + b\n")
//!     .with_generate_delay(Duration::from_millis(50));
//!
//! backend.set_health(MockHealth::Unhealthy);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::domain::codegen::{BackendKind, Snippet, SnippetDraft};
use crate::domain::foundation::BackendId;
use crate::ports::{BackendDescriptor, BackendError, BackendHandle, GenerateRequest};

/// What the next health probe reports.
#[derive(Debug, Clone, PartialEq)]
pub enum MockHealth {
    Healthy,
    Unhealthy,
    Failing(BackendError),
}

/// A scripted generation result.
#[derive(Debug, Clone)]
pub enum MockGeneration {
    Content(String),
    Error(BackendError),
}

/// Configurable in-process backend.
#[derive(Debug, Clone)]
pub struct MockBackend {
    descriptor: BackendDescriptor,
    health: Arc<Mutex<MockHealth>>,
    health_delay: Duration,
    generate_delay: Duration,
    script: Arc<Mutex<VecDeque<MockGeneration>>>,
    fallback_content: String,
    health_checks: Arc<AtomicUsize>,
    generate_calls: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Creates a healthy backend.
    ///
    /// # Panics
    ///
    /// Panics if `id` is blank.
    pub fn new(id: &str, kind: BackendKind) -> Self {
        let id = BackendId::new(id).expect("MockBackend: id must not be blank");
        Self {
            descriptor: BackendDescriptor::new(id, kind, format!("mock-{}", kind.as_str())),
            health: Arc::new(Mutex::new(MockHealth::Healthy)),
            health_delay: Duration::ZERO,
            generate_delay: Duration::ZERO,
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback_content: "fn generated() -> u32 {\n    42\n}\n".to_string(),
            health_checks: Arc::new(AtomicUsize::new(0)),
            generate_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Content returned once the script is exhausted.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.fallback_content = content.into();
        self
    }

    /// Queues a one-off generation result.
    pub fn with_generation(self, generation: MockGeneration) -> Self {
        self.script.lock().unwrap().push_back(generation);
        self
    }

    pub fn with_health(self, health: MockHealth) -> Self {
        self.set_health(health);
        self
    }

    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = delay;
        self
    }

    pub fn with_generate_delay(mut self, delay: Duration) -> Self {
        self.generate_delay = delay;
        self
    }

    pub fn set_health(&self, health: MockHealth) {
        *self.health.lock().unwrap() = health;
    }

    pub fn health_check_count(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> MockGeneration {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockGeneration::Content(self.fallback_content.clone()))
    }
}

#[async_trait]
impl BackendHandle for MockBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Snippet>, BackendError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let budget = request.remaining();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            _ = sleep_until(request.deadline) => return Err(BackendError::timeout(budget)),
            _ = sleep(self.generate_delay) => {}
        }

        match self.next_generation() {
            MockGeneration::Content(content) => {
                let snippet =
                    SnippetDraft::for_context(&request.context, self.descriptor.id.clone(), content)
                        .with_description(request.prompt.trim())
                        .build();
                Ok(vec![snippet])
            }
            MockGeneration::Error(err) => Err(err),
        }
    }

    async fn health_check(&self, timeout: Duration) -> Result<bool, BackendError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.health_delay > timeout {
            sleep(timeout).await;
            return Ok(false);
        }
        sleep(self.health_delay).await;

        match self.health.lock().unwrap().clone() {
            MockHealth::Healthy => Ok(true),
            MockHealth::Unhealthy => Ok(false),
            MockHealth::Failing(err) => Err(err),
        }
    }
}
