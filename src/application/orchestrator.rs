//! Orchestrator - the engine facade.
//!
//! Ties selection, generation, history, validation and feedback together
//! for one request:
//!
//! 1. Store the request context and snapshot the project configuration
//! 2. Select a healthy backend and generate under the request deadline
//! 3. Record every returned snippet, validate each and annotate it
//! 4. Append the exchange to the session conversation
//!
//! Nothing is recorded when a request fails or is cancelled before the
//! backend answers. Once recorded, a snippet stays in history even if the
//! request is cancelled during validation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::domain::codegen::{
    CommandContext, ContextPatch, ConversationEntry, EngineError, ProjectConfig, Snippet,
    ValidationReport,
};
use crate::domain::foundation::{BackendId, FileId, ProjectId, SessionKey, SnippetId, UserId};
use crate::ports::{BackendError, GenerateRequest, ProjectConfigProvider, TelemetryFields, TelemetrySink};

use super::context_store::ContextStore;
use super::feedback_collector::{FeedbackAck, FeedbackCollector};
use super::model_selector::{ModelSelector, Selection};
use super::validation_pipeline::ValidationPipeline;

/// Default time a backend gets to answer.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest conversation summary kept per exchange.
const SUMMARY_MAX_CHARS: usize = 80;

/// Collaborators of the orchestrator.
pub struct OrchestratorDeps {
    pub selector: Arc<ModelSelector>,
    pub context_store: Arc<ContextStore>,
    pub pipeline: Arc<ValidationPipeline>,
    pub feedback: Arc<FeedbackCollector>,
    pub project_config: Arc<dyn ProjectConfigProvider>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub generation_timeout: Duration,
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The recorded snippet, annotated with its validation results.
    pub snippet: Snippet,
    pub report: ValidationReport,
    /// Further snippets from the same answer, recorded after the primary
    /// one with `parent_id` pointing at it.
    pub related: Vec<Snippet>,
    pub backend_id: BackendId,
}

pub struct Orchestrator {
    selector: Arc<ModelSelector>,
    context_store: Arc<ContextStore>,
    pipeline: Arc<ValidationPipeline>,
    feedback: Arc<FeedbackCollector>,
    project_config: Arc<dyn ProjectConfigProvider>,
    telemetry: Arc<dyn TelemetrySink>,
    generation_timeout: Duration,
}

impl Orchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            selector: deps.selector,
            context_store: deps.context_store,
            pipeline: deps.pipeline,
            feedback: deps.feedback,
            project_config: deps.project_config,
            telemetry: deps.telemetry,
            generation_timeout: deps.generation_timeout,
        }
    }

    pub fn context_store(&self) -> &Arc<ContextStore> {
        &self.context_store
    }

    pub fn feedback(&self) -> &Arc<FeedbackCollector> {
        &self.feedback
    }

    /// Generates, records and validates code for `prompt`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty prompt
    /// - `BackendUnavailable` when no backend passes its health check
    /// - `BackendTimeout`, `RateLimited` or `BackendFailed` from the backend
    /// - `Cancelled` when `cancel` fires before the snippet is recorded
    pub async fn generate_code(
        &self,
        context: CommandContext,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, EngineError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(EngineError::InvalidRequest("prompt must not be empty".to_string()));
        }

        let project = self.project_snapshot(context.project_id()).await;
        let context = apply_project_defaults(context, &project)?;
        self.context_store.set_context(context.clone()).await;

        let selection = self.selector.select(&context, &project, cancel).await?;
        let backend_id = selection.backend_id().clone();
        self.telemetry.log_event(
            "codegen.backend_selected",
            &TelemetryFields::new()
                .with("backend", &backend_id)
                .with("source", selection.source.as_str())
                .with("probes", selection.attempts.len())
                .with("session", context.session_key()),
        );

        let started = Instant::now();
        let (snippet, related) = self.generate(&selection, &context, prompt, cancel).await?;

        self.context_store.record_snippet(snippet.clone()).await;
        for child in &related {
            self.context_store.record_snippet(child.clone()).await;
        }
        self.telemetry.log_event(
            "codegen.snippet_generated",
            &TelemetryFields::new()
                .with("backend", &backend_id)
                .with("snippet_id", snippet.id())
                .with("language", snippet.language())
                .with("related", related.len())
                .with("elapsed_ms", started.elapsed().as_millis()),
        );

        let (snippet, report) = self.validate_and_annotate(snippet, &project, cancel).await;
        let mut annotated_related = Vec::with_capacity(related.len());
        for child in related {
            let (child, _) = self.validate_and_annotate(child, &project, cancel).await;
            annotated_related.push(child);
        }
        self.telemetry.log_event(
            "codegen.validation_completed",
            &TelemetryFields::new()
                .with("snippet_id", snippet.id())
                .with("score", report.quality_score().value())
                .with("issues", report.issues().len())
                .with("security_warnings", report.security_warnings().len())
                .with("incomplete", report.incomplete_stages().len()),
        );

        let entry = ConversationEntry::new(prompt, context.generation_mode())
            .with_answer(snippet.id(), summarize(&snippet));
        self.context_store
            .append_conversation(context.session_key(), entry)
            .await;

        tracing::info!(
            session = %context.session_key(),
            backend = %backend_id,
            snippet_id = %snippet.id(),
            score = report.quality_score().value(),
            "Code generated"
        );

        Ok(GenerationOutcome {
            snippet,
            report,
            related: annotated_related,
            backend_id,
        })
    }

    /// Picks a backend for the context without generating anything.
    pub async fn select_backend(&self, context: &CommandContext) -> Result<Selection, EngineError> {
        let project = self.project_snapshot(context.project_id()).await;
        self.selector
            .select(context, &project, &CancellationToken::new())
            .await
    }

    /// Queues a rating. Rejections are reported to telemetry, never raised.
    pub fn record_feedback(
        &self,
        snippet_id: SnippetId,
        rating: u8,
        free_text: impl Into<String>,
        user_id: UserId,
    ) -> FeedbackAck {
        let ack = self.feedback.submit(snippet_id, rating, free_text, user_id);
        if let FeedbackAck::Rejected(reason) = ack {
            tracing::warn!(snippet_id = %snippet_id, reason = reason.as_str(), "Feedback rejected");
            self.telemetry.log_event(
                "feedback.rejected",
                &TelemetryFields::new()
                    .with("snippet_id", snippet_id)
                    .with("reason", reason.as_str()),
            );
        }
        ack
    }

    pub async fn history(&self, project_id: &ProjectId, file_id: Option<&FileId>) -> Vec<Snippet> {
        self.context_store.history(project_id, file_id).await
    }

    /// The stored context of a session, if it has one.
    pub async fn context(&self, session_key: &SessionKey) -> Option<CommandContext> {
        self.context_store.current_context(session_key).await
    }

    pub async fn conversation(&self, session_key: &SessionKey) -> Vec<ConversationEntry> {
        self.context_store.conversation(session_key).await
    }

    async fn project_snapshot(&self, project_id: &ProjectId) -> ProjectConfig {
        match self.project_config.get(project_id).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(project = %project_id, error = %e, "Using default project configuration");
                self.telemetry.log_error(
                    "codegen.project_config_fallback",
                    &e,
                    &TelemetryFields::new().with("project", project_id),
                );
                ProjectConfig::default_for(project_id.clone())
            }
        }
    }

    async fn generate(
        &self,
        selection: &Selection,
        context: &CommandContext,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<(Snippet, Vec<Snippet>), EngineError> {
        let backend_id = selection.backend_id().clone();
        let deadline = Instant::now() + self.generation_timeout;
        let request = GenerateRequest::new(prompt, context.clone(), deadline);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackendError::Cancelled),
            result = timeout_at(deadline, selection.backend.generate(request, cancel.clone())) => {
                result.unwrap_or_else(|_| Err(BackendError::timeout(self.generation_timeout)))
            }
        };

        let result = match result {
            Ok(snippets) if cancel.is_cancelled() => {
                tracing::debug!(backend = %backend_id, discarded = snippets.len(), "Discarding late answer");
                Err(BackendError::Cancelled)
            }
            Ok(snippets) => {
                let mut snippets = snippets.into_iter();
                match snippets.next() {
                    Some(primary) => Ok((primary, snippets.collect())),
                    None => Err(BackendError::EmptyResponse),
                }
            }
            Err(e) => Err(e),
        };

        result.map_err(|e| self.generation_error(&backend_id, context, e))
    }

    /// Validates a recorded snippet and stores the results on it.
    async fn validate_and_annotate(
        &self,
        snippet: Snippet,
        project: &ProjectConfig,
        cancel: &CancellationToken,
    ) -> (Snippet, ValidationReport) {
        let report = self.pipeline.validate(&snippet, project, cancel).await;
        let stored = self
            .context_store
            .annotate_snippet(
                snippet.project_id(),
                snippet.id(),
                report.security_warnings(),
                report.quality_score(),
            )
            .await;
        let snippet = match stored {
            Some(stored) => stored,
            None => {
                let mut annotated = snippet;
                annotated.annotate(report.security_warnings(), report.quality_score());
                annotated
            }
        };
        (snippet, report)
    }

    fn generation_error(
        &self,
        backend_id: &BackendId,
        context: &CommandContext,
        err: BackendError,
    ) -> EngineError {
        let fields = TelemetryFields::new()
            .with("backend", backend_id)
            .with("session", context.session_key());

        if err == BackendError::Cancelled {
            tracing::debug!(backend = %backend_id, "Generation cancelled");
            self.telemetry.log_event("codegen.generation_cancelled", &fields);
            return EngineError::Cancelled;
        }

        tracing::warn!(backend = %backend_id, error = %err, "Generation failed");
        self.telemetry.log_error("codegen.generation_failed", &err, &fields);

        let backend = backend_id.clone();
        match err {
            BackendError::Timeout { timeout_ms } => EngineError::BackendTimeout { backend, timeout_ms },
            BackendError::RateLimited { retry_after_secs } => EngineError::RateLimited {
                backend,
                retry_after_secs,
            },
            other => EngineError::BackendFailed {
                backend,
                message: other.to_string(),
            },
        }
    }
}

/// Fills the framework from the project when the request names none.
fn apply_project_defaults(
    context: CommandContext,
    project: &ProjectConfig,
) -> Result<CommandContext, EngineError> {
    match &project.framework {
        Some(framework) if context.target_framework().is_empty() => {
            Ok(context.derive(ContextPatch::default().with_framework(framework.clone()))?)
        }
        _ => Ok(context),
    }
}

/// One-line summary of an answer for the conversation log.
fn summarize(snippet: &Snippet) -> String {
    let source = if snippet.description().is_empty() {
        snippet.content().lines().find(|l| !l.trim().is_empty()).unwrap_or("")
    } else {
        snippet.description()
    };
    source.trim().chars().take(SUMMARY_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::backends::{MockGeneration, MockHealth};
    use crate::adapters::{
        default_stages, InMemoryPersistenceStore, InMemoryProjectConfigProvider,
        InMemoryTelemetrySink, MockBackend,
    };
    use crate::application::context_store::ContextDefaults;
    use crate::application::model_selector::BackendRegistry;
    use crate::domain::codegen::{BackendKind, GenerationMode};
    use crate::ports::ProjectConfigError;

    struct Fixture {
        orchestrator: Orchestrator,
        registry: Arc<BackendRegistry>,
        telemetry: Arc<InMemoryTelemetrySink>,
        projects: Arc<InMemoryProjectConfigProvider>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(BackendRegistry::new());
        let telemetry = Arc::new(InMemoryTelemetrySink::new());
        let projects = Arc::new(InMemoryProjectConfigProvider::new());
        let orchestrator = Orchestrator::new(OrchestratorDeps {
            selector: Arc::new(
                ModelSelector::new(registry.clone(), telemetry.clone())
                    .with_health_check_timeout(Duration::from_millis(50)),
            ),
            context_store: Arc::new(
                ContextStore::new(ContextDefaults::default())
                    .with_persistence(Arc::new(InMemoryPersistenceStore::new())),
            ),
            pipeline: Arc::new(ValidationPipeline::new(default_stages(120))),
            feedback: Arc::new(FeedbackCollector::new(8)),
            project_config: projects.clone(),
            telemetry: telemetry.clone(),
            generation_timeout: Duration::from_millis(200),
        });
        Fixture {
            orchestrator,
            registry,
            telemetry,
            projects,
        }
    }

    fn context() -> CommandContext {
        CommandContext::builder(SessionKey::new("s1").unwrap(), ProjectId::new("p1").unwrap())
            .build()
            .unwrap()
    }

    fn project() -> ProjectId {
        ProjectId::new("p1").unwrap()
    }

    #[tokio::test]
    async fn generate_code_records_validates_and_logs_conversation() {
        let f = fixture();
        f.registry
            .register(Arc::new(
                MockBackend::new("gpt", BackendKind::OpenAi)
                    .with_content("def add(a, b):\n    return a + b\n"),
            ))
            .await;

        let outcome = f
            .orchestrator
            .generate_code(context(), "add two numbers", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.backend_id.as_str(), "gpt");
        assert_eq!(outcome.snippet.quality_score(), outcome.report.quality_score());
        let history = f.orchestrator.history(&project(), None).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id(), outcome.snippet.id());
        assert_eq!(history[0].content(), outcome.snippet.content());

        let conversation = f.orchestrator.conversation(&SessionKey::new("s1").unwrap()).await;
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation[0].prompt, "add two numbers");
        assert_eq!(conversation[0].snippet_id, Some(outcome.snippet.id()));

        assert!(f.telemetry.has_event("codegen.backend_selected"));
        assert!(f.telemetry.has_event("codegen.snippet_generated"));
        assert!(f.telemetry.has_event("codegen.validation_completed"));
    }

    #[tokio::test]
    async fn empty_prompt_is_invalid() {
        let f = fixture();

        let result = f
            .orchestrator
            .generate_code(context(), "   ", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn backend_errors_map_to_engine_errors() {
        let f = fixture();
        f.registry
            .register(Arc::new(
                MockBackend::new("gpt", BackendKind::OpenAi)
                    .with_generation(MockGeneration::Error(BackendError::RateLimited {
                        retry_after_secs: Some(30),
                    }))
                    .with_generation(MockGeneration::Error(BackendError::generation("boom"))),
            ))
            .await;

        let first = f
            .orchestrator
            .generate_code(context(), "x", &CancellationToken::new())
            .await;
        let second = f
            .orchestrator
            .generate_code(context(), "x", &CancellationToken::new())
            .await;

        assert!(matches!(
            first,
            Err(EngineError::RateLimited { retry_after_secs: Some(30), .. })
        ));
        assert!(matches!(second, Err(EngineError::BackendFailed { .. })));
        assert!(f.orchestrator.history(&project(), None).await.is_empty());
        assert_eq!(f.telemetry.events_named("codegen.generation_failed").len(), 2);
    }

    #[tokio::test]
    async fn slow_backend_times_out_without_recording() {
        let f = fixture();
        f.registry
            .register(Arc::new(
                MockBackend::new("slow", BackendKind::Ollama)
                    .with_generate_delay(Duration::from_secs(5)),
            ))
            .await;

        let result = f
            .orchestrator
            .generate_code(context(), "x", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(EngineError::BackendTimeout { .. })));
        assert!(f.orchestrator.history(&project(), None).await.is_empty());
        assert!(f.orchestrator.conversation(&SessionKey::new("s1").unwrap()).await.is_empty());
    }

    #[tokio::test]
    async fn cancellation_during_generation_records_nothing() {
        let f = fixture();
        f.registry
            .register(Arc::new(
                MockBackend::new("slow", BackendKind::Ollama)
                    .with_generate_delay(Duration::from_millis(150)),
            ))
            .await;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = f.orchestrator.generate_code(context(), "x", &cancel).await;

        assert_eq!(result.unwrap_err(), EngineError::Cancelled);
        assert!(f.orchestrator.history(&project(), None).await.is_empty());
        assert!(f.telemetry.has_event("codegen.generation_cancelled"));
    }

    #[tokio::test]
    async fn project_config_failure_falls_back_to_defaults() {
        let f = fixture();
        f.registry
            .register(Arc::new(MockBackend::new("gpt", BackendKind::OpenAi).with_content("x = 1\n")))
            .await;
        f.projects
            .set_failure(Some(ProjectConfigError::Unavailable("down".to_string())))
            .await;

        let outcome = f
            .orchestrator
            .generate_code(context(), "x", &CancellationToken::new())
            .await;

        assert!(outcome.is_ok());
        assert!(f.telemetry.has_event("codegen.project_config_fallback"));
    }

    #[tokio::test]
    async fn project_framework_fills_missing_framework() {
        let f = fixture();
        f.registry
            .register(Arc::new(MockBackend::new("gpt", BackendKind::OpenAi).with_content("x = 1\n")))
            .await;
        let mut config = ProjectConfig::default_for(project());
        config.framework = Some("django".to_string());
        f.projects.set(config).await;

        let outcome = f
            .orchestrator
            .generate_code(context(), "x", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.snippet.framework(), "django");
        let stored = f.orchestrator.context(&SessionKey::new("s1").unwrap()).await.unwrap();
        assert_eq!(stored.target_framework(), "django");
    }

    #[tokio::test]
    async fn select_backend_skips_unhealthy() {
        let f = fixture();
        f.registry
            .register(Arc::new(
                MockBackend::new("down", BackendKind::Anthropic).with_health(MockHealth::Unhealthy),
            ))
            .await;
        f.registry
            .register(Arc::new(MockBackend::new("up", BackendKind::Ollama)))
            .await;
        let context = CommandContext::builder(SessionKey::new("s1").unwrap(), project())
            .with_mode(GenerationMode::Debug)
            .build()
            .unwrap();

        let selection = f.orchestrator.select_backend(&context).await.unwrap();

        assert_eq!(selection.backend_id().as_str(), "up");
        assert_eq!(selection.attempts.len(), 2);
    }

    #[tokio::test]
    async fn rejected_feedback_is_reported() {
        let f = fixture();

        let ack = f
            .orchestrator
            .record_feedback(SnippetId::new(), 9, "", UserId::new("u").unwrap());

        assert!(!ack.is_queued());
        assert_eq!(f.telemetry.events_named("feedback.rejected").len(), 1);
        assert_eq!(f.orchestrator.feedback().pending_count(), 0);
    }

    #[test]
    fn summary_prefers_description_then_first_line() {
        let context = context();
        let described = crate::domain::codegen::SnippetDraft::for_context(
            &context,
            BackendId::new("b").unwrap(),
            "\n\nfn main() {}\n",
        );

        assert_eq!(summarize(&described.clone().build()), "fn main() {}");
        assert_eq!(summarize(&described.with_description("entry point").build()), "entry point");
    }
}
