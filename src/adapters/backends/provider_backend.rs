//! Backend over a streaming model client.
//!
//! Builds prompts from the request context, consumes the chunk stream under
//! the request deadline and the cancellation token, and splits the answer
//! into snippets. Dropping the stream on abort releases the underlying
//! request.

use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::codegen::{Language, Snippet, SnippetDraft};
use crate::ports::{
    BackendDescriptor, BackendError, BackendHandle, ChunkStream, CompletionRequest, GenerateRequest,
    MessageRole, ModelClient, ModelError, RequestMetadata,
};

use super::prompt::{parse_answer, system_prompt, user_message};

/// A [`BackendHandle`] backed by any [`ModelClient`].
pub struct ProviderBackend<C> {
    descriptor: BackendDescriptor,
    client: C,
}

impl<C: ModelClient> ProviderBackend<C> {
    pub fn new(descriptor: BackendDescriptor, client: C) -> Self {
        Self { descriptor, client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn completion_request(&self, request: &GenerateRequest) -> CompletionRequest {
        let context = &request.context;
        let metadata = RequestMetadata::new(
            context.session_key().clone(),
            context.project_id().clone(),
            Uuid::new_v4().to_string(),
        );

        let (temperature, max_tokens) = self
            .descriptor
            .limits
            .clamp(context.temperature(), context.max_tokens());

        CompletionRequest::new(metadata)
            .with_system_prompt(system_prompt(context))
            .with_message(MessageRole::User, user_message(&request.prompt, context))
            .with_temperature(temperature)
            .with_max_tokens(max_tokens)
    }

    /// Reads the stream to its final chunk, aborting on deadline or cancel.
    async fn collect(
        &self,
        mut stream: ChunkStream,
        request: &GenerateRequest,
        cancel: &CancellationToken,
        budget: Duration,
    ) -> Result<String, BackendError> {
        let mut text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BackendError::Cancelled),
                _ = sleep_until(request.deadline) => return Err(BackendError::timeout(budget)),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    text.push_str(&chunk.delta);
                    if chunk.is_final() {
                        break;
                    }
                }
                Some(Err(err)) => return Err(map_model_error(err)),
                None => break,
            }
        }
        Ok(text)
    }
}

#[async_trait]
impl<C: ModelClient + 'static> BackendHandle for ProviderBackend<C> {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        cancel: CancellationToken,
    ) -> Result<Vec<Snippet>, BackendError> {
        let budget = request.remaining();
        let completion = self.completion_request(&request);

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
            _ = sleep_until(request.deadline) => return Err(BackendError::timeout(budget)),
            result = self.client.stream_complete(completion) => result.map_err(map_model_error)?,
        };

        let text = self.collect(stream, &request, &cancel, budget).await?;
        let answer = parse_answer(&text);
        if answer.blocks.is_empty() {
            return Err(BackendError::EmptyResponse);
        }

        let description = if answer.summary.is_empty() {
            request.prompt.trim().to_string()
        } else {
            answer.summary
        };

        let mut snippets: Vec<Snippet> = Vec::with_capacity(answer.blocks.len());
        for block in answer.blocks {
            let mut draft = SnippetDraft::for_context(
                &request.context,
                self.descriptor.id.clone(),
                block.code,
            )
            .with_description(description.clone());
            if let Some(tag) = block.tag {
                draft = draft.with_language(Language::from_name(&tag));
            }
            if let Some(primary) = snippets.first() {
                draft = draft.with_parent(primary.id());
            }
            snippets.push(draft.build());
        }

        tracing::debug!(
            backend = %self.descriptor.id,
            model = %self.descriptor.model,
            snippets = snippets.len(),
            "Generation completed"
        );

        Ok(snippets)
    }

    async fn health_check(&self, timeout: Duration) -> Result<bool, BackendError> {
        match tokio::time::timeout(timeout, self.client.ping()).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(err)) => Err(map_model_error(err)),
            Err(_) => Ok(false),
        }
    }
}

fn map_model_error(err: ModelError) -> BackendError {
    match err {
        ModelError::RateLimited { retry_after_secs } => BackendError::RateLimited {
            retry_after_secs: Some(retry_after_secs),
        },
        ModelError::Timeout { timeout_secs } => BackendError::Timeout {
            timeout_ms: u64::from(timeout_secs) * 1000,
        },
        ModelError::Unavailable { message } | ModelError::Network(message) => {
            BackendError::Unavailable(message)
        }
        ModelError::AuthenticationFailed => BackendError::unavailable("authentication failed"),
        other => BackendError::generation(other.to_string()),
    }
}
