//! Mock model client for testing.
//!
//! Provides a configurable implementation of the ModelClient port so
//! backends can be exercised without a real model endpoint.
//!
//! # Features
//!
//! - Pre-configured responses, consumed in order
//! - Per-chunk delay for deadline and cancellation testing
//! - Error injection before streaming or mid-stream
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let client = MockModelClient::new()
//!     .with_response("```rust\nfn main() {}\n```")
//!     .with_chunk_delay(Duration::from_millis(10));
//!
//! let backend = ProviderBackend::new(descriptor, client);
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    ChunkStream, CompletionRequest, FinishReason, ModelClient, ModelError, ProviderInfo,
    StreamChunk, TokenUsage,
};

/// Mock model client.
#[derive(Debug, Clone)]
pub struct MockModelClient {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    info: ProviderInfo,
    /// Delay before each streamed chunk.
    chunk_delay: Duration,
    ping_result: Arc<Mutex<Result<(), ModelError>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream the content, then a final chunk.
    Success { content: String, usage: TokenUsage },
    /// Fail before the first chunk.
    Error(ModelError),
    /// Stream the content, then fail instead of finishing.
    FailMidStream { content: String, error: ModelError },
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-coder-1", 32_000),
            chunk_delay: Duration::ZERO,
            ping_result: Arc::new(Mutex::new(Ok(()))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        let content = content.into();
        let usage = TokenUsage::new(10, estimate_tokens(&content));
        self.push(MockResponse::Success { content, usage })
    }

    /// Adds an error returned before streaming starts.
    pub fn with_error(self, error: ModelError) -> Self {
        self.push(MockResponse::Error(error))
    }

    /// Adds a response that streams `content` and then fails.
    pub fn with_mid_stream_error(self, content: impl Into<String>, error: ModelError) -> Self {
        self.push(MockResponse::FailMidStream {
            content: content.into(),
            error,
        })
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_provider_info(mut self, info: ProviderInfo) -> Self {
        self.info = info;
        self
    }

    /// Sets what `ping` returns from now on.
    pub fn set_ping_result(&self, result: Result<(), ModelError>) {
        *self.ping_result.lock().unwrap() = result;
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn push(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success {
                content: "```\n// mock output\n```".to_string(),
                usage: TokenUsage::new(5, 5),
            })
    }
}

/// Splits content into line chunks so code layout survives streaming.
fn line_chunks(content: &str) -> Vec<Result<StreamChunk, ModelError>> {
    content
        .split_inclusive('\n')
        .map(|line| Ok(StreamChunk::content(line)))
        .collect()
}

fn estimate_tokens(text: &str) -> u32 {
    // Rough approximation: ~4 characters per token
    (text.len() / 4).max(1) as u32
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn stream_complete(&self, request: CompletionRequest) -> Result<ChunkStream, ModelError> {
        self.calls.lock().unwrap().push(request);

        let delay = self.chunk_delay;
        let (chunks, tail) = match self.next_response() {
            MockResponse::Success { content, usage } => (
                line_chunks(&content),
                Ok(StreamChunk::final_chunk(FinishReason::Stop, usage)),
            ),
            MockResponse::Error(err) => return Err(err),
            MockResponse::FailMidStream { content, error } => (line_chunks(&content), Err(error)),
        };

        let paced = stream::iter(chunks)
            .chain(stream::once(async move { tail }))
            .then(move |item| async move {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                item
            });

        Ok(Box::pin(paced))
    }

    async fn ping(&self) -> Result<(), ModelError> {
        self.ping_result.lock().unwrap().clone()
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}
