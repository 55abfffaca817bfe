//! Integration tests for the generation request path.
//!
//! These tests drive the Orchestrator end to end:
//! 1. Backend selection over a registry of scripted backends
//! 2. Generation under deadline and cancellation
//! 3. History, conversation and validation results after each request
//! 4. Feedback intake under concurrency
//!
//! Uses in-memory adapters so no external services are needed.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use codegen_engine::adapters::backends::MockHealth;
use codegen_engine::adapters::{
    default_stages, InMemoryPersistenceStore, InMemoryProjectConfigProvider, InMemoryTelemetrySink,
    MockBackend, MockModelClient, ProviderBackend,
};
use codegen_engine::application::{
    BackendRegistry, CandidateSource, ContextDefaults, ContextStore, FeedbackCollector, ModelSelector,
    Orchestrator, OrchestratorDeps, ProbeResult, ValidationPipeline,
};
use codegen_engine::domain::codegen::{
    BackendKind, CommandContext, EngineError, GenerationMode, Language, ProjectConfig, StageKind,
};
use codegen_engine::domain::foundation::{BackendId, ProjectId, SessionKey, SnippetId, UserId};
use codegen_engine::ports::BackendDescriptor;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct Engine {
    orchestrator: Orchestrator,
    registry: Arc<BackendRegistry>,
    projects: Arc<InMemoryProjectConfigProvider>,
    telemetry: Arc<InMemoryTelemetrySink>,
}

fn engine_with(defaults: ContextDefaults, feedback_capacity: usize) -> Engine {
    let registry = Arc::new(BackendRegistry::new());
    let projects = Arc::new(InMemoryProjectConfigProvider::new());
    let telemetry = Arc::new(InMemoryTelemetrySink::new());

    let orchestrator = Orchestrator::new(OrchestratorDeps {
        selector: Arc::new(
            ModelSelector::new(registry.clone(), telemetry.clone())
                .with_health_check_timeout(Duration::from_millis(100)),
        ),
        context_store: Arc::new(
            ContextStore::new(defaults).with_persistence(Arc::new(InMemoryPersistenceStore::new())),
        ),
        pipeline: Arc::new(ValidationPipeline::new(default_stages(120))),
        feedback: Arc::new(FeedbackCollector::new(feedback_capacity)),
        project_config: projects.clone(),
        telemetry: telemetry.clone(),
        generation_timeout: Duration::from_secs(2),
    });

    Engine {
        orchestrator,
        registry,
        projects,
        telemetry,
    }
}

fn engine() -> Engine {
    engine_with(ContextDefaults::default(), 1024)
}

fn session() -> SessionKey {
    SessionKey::new("s1").unwrap()
}

fn project() -> ProjectId {
    ProjectId::new("p1").unwrap()
}

fn context(mode: GenerationMode) -> CommandContext {
    CommandContext::builder(session(), project())
        .with_mode(mode)
        .build()
        .unwrap()
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn unhealthy_first_backend_is_skipped_for_healthy_second() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(
            MockBackend::new("a", BackendKind::Mistral).with_health(MockHealth::Unhealthy),
        ))
        .await;
    engine
        .registry
        .register(Arc::new(MockBackend::new("b", BackendKind::Ollama)))
        .await;

    let selection = engine
        .orchestrator
        .select_backend(&context(GenerationMode::New))
        .await
        .unwrap();

    assert_eq!(selection.backend_id().as_str(), "b");
    assert_eq!(selection.attempts[0].backend_id.as_str(), "a");
    assert_eq!(selection.attempts[0].result, ProbeResult::Unhealthy);
    assert!(engine.telemetry.has_event("codegen.backend_probe_failed"));
}

#[tokio::test]
async fn only_healthy_backend_wins_regardless_of_rank() {
    let engine = engine();
    for id in ["first", "second", "third"] {
        engine
            .registry
            .register(Arc::new(
                MockBackend::new(id, BackendKind::OpenAi).with_health(MockHealth::Unhealthy),
            ))
            .await;
    }
    engine
        .registry
        .register(Arc::new(MockBackend::new("last", BackendKind::Ollama)))
        .await;
    let context = CommandContext::builder(session(), project())
        .with_preferred_backend(BackendId::new("first").unwrap())
        .build()
        .unwrap();

    let selection = engine.orchestrator.select_backend(&context).await.unwrap();

    assert_eq!(selection.backend_id().as_str(), "last");
    assert_eq!(selection.source, CandidateSource::Fallback);
    assert_eq!(selection.attempts.len(), 4);
}

#[tokio::test]
async fn project_preferred_backend_is_tried_before_task_family() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(MockBackend::new("reasoning", BackendKind::Anthropic)))
        .await;
    engine
        .registry
        .register(Arc::new(MockBackend::new("local", BackendKind::Ollama)))
        .await;
    engine
        .projects
        .set(ProjectConfig::default_for(project()).with_preferred_backend(BackendId::new("local").unwrap()))
        .await;

    let selection = engine
        .orchestrator
        .select_backend(&context(GenerationMode::Debug))
        .await
        .unwrap();

    assert_eq!(selection.backend_id().as_str(), "local");
    assert_eq!(selection.source, CandidateSource::ProjectPreference);
}

#[tokio::test]
async fn empty_registry_returns_unavailable_and_leaves_history_unchanged() {
    let engine = engine();

    let result = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "write a parser", &CancellationToken::new())
        .await;

    assert_eq!(result.unwrap_err(), EngineError::BackendUnavailable { attempted: 0 });
    assert!(engine.orchestrator.history(&project(), None).await.is_empty());
}

#[tokio::test]
async fn all_unhealthy_backends_return_unavailable() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(
            MockBackend::new("a", BackendKind::OpenAi).with_health(MockHealth::Unhealthy),
        ))
        .await;
    engine
        .registry
        .register(Arc::new(
            MockBackend::new("b", BackendKind::Gemini).with_health_delay(Duration::from_secs(1)),
        ))
        .await;

    let result = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "x", &CancellationToken::new())
        .await;

    assert_eq!(result.unwrap_err(), EngineError::BackendUnavailable { attempted: 2 });
    assert!(engine.orchestrator.history(&project(), None).await.is_empty());
}

// =============================================================================
// Generation and history
// =============================================================================

#[tokio::test]
async fn history_round_trip_matches_returned_snippet() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(
            MockBackend::new("a", BackendKind::OpenAi).with_content("def square(x):\n    return x * x\n"),
        ))
        .await;

    let outcome = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "square a number", &CancellationToken::new())
        .await
        .unwrap();

    let history = engine.orchestrator.history(&project(), None).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id(), outcome.snippet.id());
    assert_eq!(history[0].content(), outcome.snippet.content());
    assert_eq!(history[0].quality_score(), outcome.report.quality_score());
}

#[tokio::test]
async fn eval_in_generated_code_yields_one_security_finding() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(
            MockBackend::new("a", BackendKind::OpenAi).with_content("result = eval(user_input)\n"),
        ))
        .await;
    engine
        .projects
        .set(ProjectConfig::default_for(project()).with_security_scanning(true))
        .await;

    let outcome = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "evaluate input", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.report.findings_for(StageKind::Security).count(), 1);
    assert_eq!(outcome.report.security_warnings().len(), 1);
    assert!(outcome.report.quality_score().value() <= 93);
    assert_eq!(outcome.snippet.security_warnings(), outcome.report.security_warnings());
}

#[tokio::test]
async fn security_stage_is_skipped_when_scanning_is_off() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(
            MockBackend::new("a", BackendKind::OpenAi).with_content("result = eval(user_input)\n"),
        ))
        .await;
    engine
        .projects
        .set(ProjectConfig::default_for(project()).with_security_scanning(false))
        .await;

    let outcome = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "evaluate input", &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.report.security_warnings().is_empty());
    assert_eq!(outcome.report.skipped_stages(), &[StageKind::Security]);
}

#[tokio::test]
async fn twelve_prompts_keep_the_last_ten_in_order() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(MockBackend::new("a", BackendKind::Mistral).with_content("x = 1\n")))
        .await;

    for i in 1..=12 {
        engine
            .orchestrator
            .generate_code(
                context(GenerationMode::New),
                &format!("prompt {i}"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
    }

    let prompts: Vec<String> = engine
        .orchestrator
        .conversation(&session())
        .await
        .into_iter()
        .map(|entry| entry.prompt)
        .collect();
    let expected: Vec<String> = (3..=12).map(|i| format!("prompt {i}")).collect();
    assert_eq!(prompts, expected);
    assert_eq!(engine.orchestrator.history(&project(), None).await.len(), 12);
}

#[tokio::test]
async fn conversation_cap_follows_context_defaults() {
    let defaults = ContextDefaults {
        conversation_cap: 3,
        ..ContextDefaults::default()
    };
    let engine = engine_with(defaults, 1024);
    engine
        .registry
        .register(Arc::new(MockBackend::new("a", BackendKind::Mistral).with_content("x = 1\n")))
        .await;

    for i in 0..5 {
        engine
            .orchestrator
            .generate_code(context(GenerationMode::New), &format!("p{i}"), &CancellationToken::new())
            .await
            .unwrap();
    }

    let conversation = engine.orchestrator.conversation(&session()).await;
    assert_eq!(conversation.len(), 3);
    assert_eq!(conversation[0].prompt, "p2");
}

#[tokio::test]
async fn cancelled_call_leaves_history_length_unchanged() {
    let engine = engine();
    engine
        .registry
        .register(Arc::new(
            MockBackend::new("a", BackendKind::Ollama)
                .with_content("x = 1\n")
                .with_generate_delay(Duration::from_millis(100)),
        ))
        .await;
    engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "first", &CancellationToken::new())
        .await
        .unwrap();
    let before = engine.orchestrator.history(&project(), None).await.len();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let result = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "second", &cancel)
        .await;

    assert_eq!(result.unwrap_err(), EngineError::Cancelled);
    assert_eq!(engine.orchestrator.history(&project(), None).await.len(), before);
    assert_eq!(engine.orchestrator.conversation(&session()).await.len(), 1);
}

#[tokio::test]
async fn already_cancelled_token_never_reaches_a_backend() {
    let engine = engine();
    let backend = Arc::new(MockBackend::new("a", BackendKind::Ollama));
    engine.registry.register(backend.clone()).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "x", &cancel)
        .await;

    assert_eq!(result.unwrap_err(), EngineError::Cancelled);
    assert_eq!(backend.health_check_count(), 0);
    assert_eq!(backend.generate_count(), 0);
}

#[tokio::test]
async fn model_client_backend_generates_through_the_stream() {
    let engine = engine();
    let client = MockModelClient::new()
        .with_response("Adds two numbers.\n```rust\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n```\n");
    let descriptor = BackendDescriptor::new(BackendId::new("provider").unwrap(), BackendKind::Anthropic, "mock-model");
    engine
        .registry
        .register(Arc::new(ProviderBackend::new(descriptor, client)))
        .await;
    let context = CommandContext::builder(session(), project())
        .with_language(Language::Rust)
        .build()
        .unwrap();

    let outcome = engine
        .orchestrator
        .generate_code(context, "add two numbers", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.backend_id.as_str(), "provider");
    assert!(outcome.snippet.content().contains("a + b"));
    assert_eq!(outcome.snippet.language(), &Language::Rust);
    assert!(outcome.report.findings_for(StageKind::Syntax).next().is_none());
}

#[tokio::test]
async fn every_block_of_a_multi_block_answer_is_recorded() {
    let engine = engine();
    let client = MockModelClient::new()
        .with_response("Two values.\n```python\na = 1\n```\n```python\nresult = eval(user_input)\n```\n");
    let descriptor = BackendDescriptor::new(BackendId::new("provider").unwrap(), BackendKind::Anthropic, "mock-model");
    engine
        .registry
        .register(Arc::new(ProviderBackend::new(descriptor, client)))
        .await;

    let outcome = engine
        .orchestrator
        .generate_code(context(GenerationMode::New), "two values", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.snippet.content(), "a = 1\n");
    assert_eq!(outcome.related.len(), 1);
    assert_eq!(outcome.related[0].parent_id(), Some(outcome.snippet.id()));
    assert_eq!(outcome.related[0].security_warnings().len(), 1);

    let history = engine.orchestrator.history(&project(), None).await;
    let contents: Vec<&str> = history.iter().map(|s| s.content()).collect();
    assert_eq!(contents, vec!["a = 1\n", "result = eval(user_input)\n"]);
    assert_eq!(history[1].id(), outcome.related[0].id());
    assert_eq!(history[1].security_warnings(), outcome.related[0].security_warnings());
}

// =============================================================================
// Feedback
// =============================================================================

#[tokio::test]
async fn concurrent_feedback_for_distinct_snippets_is_all_queued() {
    let engine = Arc::new(engine());
    let mut handles = Vec::new();
    for task in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..20 {
                let id = SnippetId::new();
                let ack = engine.orchestrator.record_feedback(
                    id,
                    (task % 5 + 1) as u8,
                    "",
                    UserId::new("dev").unwrap(),
                );
                assert!(ack.is_queued());
                ids.push(id);
            }
            ids
        }));
    }

    let mut submitted = Vec::new();
    for handle in handles {
        submitted.extend(handle.await.unwrap());
    }

    let queued = engine.orchestrator.feedback().drain(usize::MAX);
    assert_eq!(queued.len(), 200);
    for id in submitted {
        assert!(queued.iter().any(|r| r.snippet_id() == id));
    }
}

#[tokio::test]
async fn feedback_beyond_capacity_is_rejected_not_raised() {
    let engine = engine_with(ContextDefaults::default(), 2);

    let acks: Vec<_> = (0..3)
        .map(|_| {
            engine
                .orchestrator
                .record_feedback(SnippetId::new(), 5, "", UserId::new("dev").unwrap())
        })
        .collect();

    assert!(acks[0].is_queued());
    assert!(acks[1].is_queued());
    assert!(!acks[2].is_queued());
    assert_eq!(engine.telemetry.events_named("feedback.rejected").len(), 1);
}
