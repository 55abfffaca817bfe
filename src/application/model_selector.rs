//! ModelSelector - picks one healthy backend per request.
//!
//! Candidates are ranked, then probed in order; the first backend whose
//! bounded health check reports healthy wins. Ranking:
//!
//! 1. The backend the request context prefers
//! 2. The project's preferred backend
//! 3. Backends whose family matches the generation mode, in registration order
//! 4. Every other backend, in registration order
//!
//! A backend appears once, at its best rank. Probe errors and timeouts count
//! as unhealthy, so worst-case selection latency is the number of candidates
//! times the probe timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::domain::codegen::{BackendFamily, CommandContext, EngineError, ProjectConfig};
use crate::domain::foundation::BackendId;
use crate::ports::{BackendHandle, TelemetryFields, TelemetrySink};

/// Default bound on a single health probe.
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

// ════════════════════════════════════════════════════════════════════════════════
// Registry
// ════════════════════════════════════════════════════════════════════════════════

/// Read-mostly set of registered backends, in registration order.
///
/// Selection works on a [`snapshot`](Self::snapshot), so a registration is
/// either fully visible to a selection or not at all.
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<Vec<Arc<dyn BackendHandle>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend. A backend with the same id is replaced in place and
    /// keeps its registration order.
    pub async fn register(&self, backend: Arc<dyn BackendHandle>) {
        let mut backends = self.backends.write().await;
        let id = backend.descriptor().id.clone();
        match backends.iter_mut().find(|b| b.descriptor().id == id) {
            Some(slot) => {
                tracing::info!(backend = %id, "Replacing registered backend");
                *slot = backend;
            }
            None => {
                tracing::info!(backend = %id, kind = %backend.descriptor().kind, "Registered backend");
                backends.push(backend);
            }
        }
    }

    /// Removes a backend. Returns false if it was not registered.
    pub async fn deregister(&self, id: &BackendId) -> bool {
        let mut backends = self.backends.write().await;
        let before = backends.len();
        backends.retain(|b| &b.descriptor().id != id);
        before != backends.len()
    }

    pub async fn get(&self, id: &BackendId) -> Option<Arc<dyn BackendHandle>> {
        self.backends
            .read()
            .await
            .iter()
            .find(|b| &b.descriptor().id == id)
            .cloned()
    }

    /// Every registered backend, in registration order.
    pub async fn snapshot(&self) -> Vec<Arc<dyn BackendHandle>> {
        self.backends.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.backends.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.backends.read().await.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Candidates and outcomes
// ════════════════════════════════════════════════════════════════════════════════

/// Why a backend was considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    RequestPreference,
    ProjectPreference,
    TaskFamily(BackendFamily),
    Fallback,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::RequestPreference => "request_preference",
            CandidateSource::ProjectPreference => "project_preference",
            CandidateSource::TaskFamily(_) => "task_family",
            CandidateSource::Fallback => "fallback",
        }
    }
}

/// A ranked backend.
#[derive(Clone)]
pub struct Candidate {
    pub backend: Arc<dyn BackendHandle>,
    pub source: CandidateSource,
}

impl Candidate {
    pub fn id(&self) -> &BackendId {
        &self.backend.descriptor().id
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("backend", self.id())
            .field("source", &self.source)
            .finish()
    }
}

/// Result of probing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Healthy,
    Unhealthy,
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub backend_id: BackendId,
    pub source: CandidateSource,
    pub result: ProbeResult,
}

/// The chosen backend plus the probes that led to it.
#[derive(Clone)]
pub struct Selection {
    pub backend: Arc<dyn BackendHandle>,
    pub source: CandidateSource,
    /// Every probe in order, the winning one last.
    pub attempts: Vec<ProbeOutcome>,
}

impl Selection {
    pub fn backend_id(&self) -> &BackendId {
        &self.backend.descriptor().id
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("backend", self.backend_id())
            .field("source", &self.source)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Orders `backends` for a request. Pure; does not probe anything.
pub fn rank_candidates(
    backends: &[Arc<dyn BackendHandle>],
    context: &CommandContext,
    project: &ProjectConfig,
) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = Vec::with_capacity(backends.len());
    let mut push = |backend: &Arc<dyn BackendHandle>, source: CandidateSource| {
        if !ranked.iter().any(|c| c.id() == &backend.descriptor().id) {
            ranked.push(Candidate {
                backend: Arc::clone(backend),
                source,
            });
        }
    };
    let find = |id: &BackendId| backends.iter().find(|b| &b.descriptor().id == id);

    if let Some(backend) = context.preferred_backend().and_then(find) {
        push(backend, CandidateSource::RequestPreference);
    }
    if let Some(backend) = project.preferred_backend.as_ref().and_then(find) {
        push(backend, CandidateSource::ProjectPreference);
    }

    let family = context.generation_mode().preferred_family();
    for backend in backends.iter().filter(|b| b.descriptor().kind.family() == family) {
        push(backend, CandidateSource::TaskFamily(family));
    }
    for backend in backends {
        push(backend, CandidateSource::Fallback);
    }

    ranked
}

// ════════════════════════════════════════════════════════════════════════════════
// Selector
// ════════════════════════════════════════════════════════════════════════════════

pub struct ModelSelector {
    registry: Arc<BackendRegistry>,
    telemetry: Arc<dyn TelemetrySink>,
    health_check_timeout: Duration,
}

impl ModelSelector {
    pub fn new(registry: Arc<BackendRegistry>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            registry,
            telemetry,
            health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
        }
    }

    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Returns the first healthy candidate for the request.
    ///
    /// # Errors
    ///
    /// - `EngineError::Cancelled` if `cancel` fires before a backend is chosen
    /// - `EngineError::BackendUnavailable` if no candidate is healthy
    pub async fn select(
        &self,
        context: &CommandContext,
        project: &ProjectConfig,
        cancel: &CancellationToken,
    ) -> Result<Selection, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let snapshot = self.registry.snapshot().await;
        let candidates = rank_candidates(&snapshot, context, project);
        let mut attempts = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                result = self.probe(&candidate) => result,
            };

            let healthy = result == ProbeResult::Healthy;
            attempts.push(ProbeOutcome {
                backend_id: candidate.id().clone(),
                source: candidate.source,
                result: result.clone(),
            });

            if healthy {
                tracing::debug!(
                    backend = %candidate.id(),
                    source = candidate.source.as_str(),
                    probes = attempts.len(),
                    "Selected backend"
                );
                return Ok(Selection {
                    backend: candidate.backend,
                    source: candidate.source,
                    attempts,
                });
            }

            tracing::debug!(backend = %candidate.id(), result = ?result, "Skipping backend");
            self.telemetry.log_event(
                "codegen.backend_probe_failed",
                &TelemetryFields::new()
                    .with("backend", candidate.id())
                    .with("session", context.session_key())
                    .with("result", probe_label(&result)),
            );
        }

        tracing::warn!(
            session = %context.session_key(),
            attempted = attempts.len(),
            "No healthy backend available"
        );
        Err(EngineError::BackendUnavailable {
            attempted: attempts.len(),
        })
    }

    async fn probe(&self, candidate: &Candidate) -> ProbeResult {
        let timeout = self.health_check_timeout;
        match tokio::time::timeout(timeout, candidate.backend.health_check(timeout)).await {
            Ok(Ok(true)) => ProbeResult::Healthy,
            Ok(Ok(false)) => ProbeResult::Unhealthy,
            Ok(Err(e)) => ProbeResult::Failed(e.to_string()),
            Err(_) => ProbeResult::TimedOut,
        }
    }
}

fn probe_label(result: &ProbeResult) -> &'static str {
    match result {
        ProbeResult::Healthy => "healthy",
        ProbeResult::Unhealthy => "unhealthy",
        ProbeResult::TimedOut => "timed_out",
        ProbeResult::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::backends::{MockBackend, MockHealth};
    use crate::adapters::telemetry::InMemoryTelemetrySink;
    use crate::domain::codegen::{BackendKind, GenerationMode};
    use crate::domain::foundation::{ProjectId, SessionKey};
    use crate::ports::BackendError;
    use proptest::prelude::*;

    fn context(mode: GenerationMode, preferred: Option<&str>) -> CommandContext {
        let mut builder =
            CommandContext::builder(SessionKey::new("s1").unwrap(), ProjectId::new("p1").unwrap())
                .with_mode(mode);
        if let Some(id) = preferred {
            builder = builder.with_preferred_backend(BackendId::new(id).unwrap());
        }
        builder.build().unwrap()
    }

    fn project() -> ProjectConfig {
        ProjectConfig::default_for(ProjectId::new("p1").unwrap())
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id().as_str()).collect()
    }

    async fn selector_with(backends: Vec<MockBackend>) -> (ModelSelector, Arc<InMemoryTelemetrySink>) {
        let registry = Arc::new(BackendRegistry::new());
        for backend in backends {
            registry.register(Arc::new(backend)).await;
        }
        let telemetry = Arc::new(InMemoryTelemetrySink::new());
        let selector = ModelSelector::new(registry, telemetry.clone())
            .with_health_check_timeout(Duration::from_millis(50));
        (selector, telemetry)
    }

    // ───────────────────────────────────────────────────────────────
    // Registry
    // ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn registering_same_id_replaces_in_place() {
        let registry = BackendRegistry::new();
        registry.register(Arc::new(MockBackend::new("a", BackendKind::OpenAi))).await;
        registry.register(Arc::new(MockBackend::new("b", BackendKind::Ollama))).await;
        registry.register(Arc::new(MockBackend::new("a", BackendKind::Gemini))).await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].descriptor().id.as_str(), "a");
        assert_eq!(snapshot[0].descriptor().kind, BackendKind::Gemini);
    }

    #[tokio::test]
    async fn deregister_removes_backend() {
        let registry = BackendRegistry::new();
        registry.register(Arc::new(MockBackend::new("a", BackendKind::OpenAi))).await;

        assert!(registry.deregister(&BackendId::new("a").unwrap()).await);
        assert!(!registry.deregister(&BackendId::new("a").unwrap()).await);
        assert!(registry.is_empty().await);
        assert!(registry.get(&BackendId::new("a").unwrap()).await.is_none());
    }

    // ───────────────────────────────────────────────────────────────
    // Ranking
    // ───────────────────────────────────────────────────────────────

    #[test]
    fn ranking_follows_preferences_then_family_then_rest() {
        let backends: Vec<Arc<dyn BackendHandle>> = vec![
            Arc::new(MockBackend::new("local", BackendKind::Ollama)),
            Arc::new(MockBackend::new("reasoner", BackendKind::OpenAi)),
            Arc::new(MockBackend::new("fast", BackendKind::Mistral)),
            Arc::new(MockBackend::new("claude", BackendKind::Anthropic)),
        ];
        let project = project().with_preferred_backend(BackendId::new("local").unwrap());

        let ranked = rank_candidates(&backends, &context(GenerationMode::Debug, Some("fast")), &project);

        assert_eq!(ids(&ranked), vec!["fast", "local", "reasoner", "claude"]);
        assert_eq!(ranked[0].source, CandidateSource::RequestPreference);
        assert_eq!(ranked[1].source, CandidateSource::ProjectPreference);
        assert_eq!(ranked[2].source, CandidateSource::TaskFamily(BackendFamily::HighReasoning));
    }

    #[test]
    fn unregistered_preference_is_ignored() {
        let backends: Vec<Arc<dyn BackendHandle>> =
            vec![Arc::new(MockBackend::new("local", BackendKind::Ollama))];

        let ranked = rank_candidates(&backends, &context(GenerationMode::New, Some("ghost")), &project());

        assert_eq!(ids(&ranked), vec!["local"]);
        assert_eq!(ranked[0].source, CandidateSource::Fallback);
    }

    // ───────────────────────────────────────────────────────────────
    // Selection
    // ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn falls_through_unhealthy_and_failing_backends() {
        let (selector, telemetry) = selector_with(vec![
            MockBackend::new("down", BackendKind::Mistral).with_health(MockHealth::Unhealthy),
            MockBackend::new("broken", BackendKind::Mistral)
                .with_health(MockHealth::Failing(BackendError::unavailable("503"))),
            MockBackend::new("slow", BackendKind::Mistral).with_health_delay(Duration::from_secs(5)),
            MockBackend::new("ok", BackendKind::Ollama),
        ])
        .await;

        let selection = selector
            .select(&context(GenerationMode::New, None), &project(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(selection.backend_id().as_str(), "ok");
        assert_eq!(selection.source, CandidateSource::Fallback);
        let results: Vec<ProbeResult> = selection.attempts.iter().map(|a| a.result.clone()).collect();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0], ProbeResult::Unhealthy);
        assert_eq!(results[1], ProbeResult::Failed("unavailable: 503".to_string()));
        // The slow probe and the selector's bound expire together.
        assert!(matches!(results[2], ProbeResult::TimedOut | ProbeResult::Unhealthy));
        assert_eq!(results[3], ProbeResult::Healthy);
        assert_eq!(telemetry.events_named("codegen.backend_probe_failed").len(), 3);
    }

    #[tokio::test]
    async fn no_healthy_backend_is_unavailable() {
        let (selector, _) = selector_with(vec![
            MockBackend::new("a", BackendKind::OpenAi).with_health(MockHealth::Unhealthy),
            MockBackend::new("b", BackendKind::Ollama).with_health(MockHealth::Unhealthy),
        ])
        .await;

        let err = selector
            .select(&context(GenerationMode::New, None), &project(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, EngineError::BackendUnavailable { attempted: 2 });
    }

    #[tokio::test]
    async fn empty_registry_is_unavailable() {
        let (selector, _) = selector_with(vec![]).await;

        let err = selector
            .select(&context(GenerationMode::New, None), &project(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, EngineError::BackendUnavailable { attempted: 0 });
    }

    #[tokio::test]
    async fn cancellation_stops_probing() {
        let slow = MockBackend::new("slow", BackendKind::OpenAi).with_health_delay(Duration::from_secs(5));
        let (selector, _) = selector_with(vec![slow]).await;
        let selector = selector.with_health_check_timeout(Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = selector
            .select(&context(GenerationMode::New, None), &project(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Cancelled);
    }

    proptest! {
        #[test]
        fn ranking_is_a_permutation_with_preference_first(
            kinds in proptest::collection::vec(0usize..6, 1..8),
            preferred in proptest::option::of(0usize..8),
            mode in 0usize..8,
        ) {
            let all_kinds = [
                BackendKind::OpenAi,
                BackendKind::Anthropic,
                BackendKind::Gemini,
                BackendKind::Mistral,
                BackendKind::Ollama,
                BackendKind::Scripted,
            ];
            let backends: Vec<Arc<dyn BackendHandle>> = kinds
                .iter()
                .enumerate()
                .map(|(i, k)| Arc::new(MockBackend::new(&format!("b{i}"), all_kinds[*k])) as Arc<dyn BackendHandle>)
                .collect();
            let preferred_id = preferred.map(|i| format!("b{i}"));
            let context = context(GenerationMode::ALL[mode], preferred_id.as_deref());

            let ranked = rank_candidates(&backends, &context, &project());

            prop_assert_eq!(ranked.len(), backends.len());
            let mut seen: Vec<&str> = ids(&ranked);
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), backends.len());
            if let Some(i) = preferred.filter(|i| *i < backends.len()) {
                let expected = format!("b{i}");
                prop_assert_eq!(ranked[0].id().as_str(), expected.as_str());
            }
        }
    }
}
