//! ValidationPipeline - runs every stage over a snippet and scores it.
//!
//! Stages run concurrently on the blocking pool. Each one is bounded by the
//! per-stage timeout and all of them by the pipeline deadline. A stage that
//! fails, panics, times out or is cut off by cancellation is listed as
//! incomplete; the others still count. A report is always returned.
//!
//! Findings are applied in stage order, so the report does not depend on
//! which stage finished first.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinError;
use tokio::time::{error::Elapsed, sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::domain::codegen::{ProjectConfig, Snippet, StageKind, ValidationFinding, ValidationReport};
use crate::ports::{StageError, ValidationStage};

/// Timing bounds of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Wall clock budget for the whole run.
    pub pipeline_timeout: Duration,
    /// Budget for one stage.
    pub stage_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline_timeout: Duration::from_millis(5000),
            stage_timeout: Duration::from_millis(2000),
        }
    }
}

impl PipelineConfig {
    pub fn with_pipeline_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_timeout = timeout;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }
}

type StageOutcome = Result<Result<Result<Vec<ValidationFinding>, StageError>, JoinError>, Elapsed>;

pub struct ValidationPipeline {
    stages: Vec<Arc<dyn ValidationStage>>,
    config: PipelineConfig,
}

impl ValidationPipeline {
    pub fn new(stages: Vec<Arc<dyn ValidationStage>>) -> Self {
        Self::with_config(stages, PipelineConfig::default())
    }

    pub fn with_config(stages: Vec<Arc<dyn ValidationStage>>, config: PipelineConfig) -> Self {
        Self { stages, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validates a snippet against the project's stage settings.
    pub async fn validate(
        &self,
        snippet: &Snippet,
        project: &ProjectConfig,
        cancel: &CancellationToken,
    ) -> ValidationReport {
        let started = Instant::now();
        let deadline = started + self.config.pipeline_timeout;
        let mut report = ValidationReport::new();

        let snippet = Arc::new(snippet.clone());
        let project_config = Arc::new(project.clone());

        let mut order: Vec<StageKind> = Vec::new();
        let mut running = FuturesUnordered::new();
        for stage in &self.stages {
            let kind = stage.kind();
            if !project.runs_stage(kind) {
                report.mark_skipped(kind);
                continue;
            }
            let index = order.len();
            order.push(kind);

            let stage = Arc::clone(stage);
            let snippet = Arc::clone(&snippet);
            let project_config = Arc::clone(&project_config);
            let stage_timeout = self.config.stage_timeout;
            running.push(async move {
                let task = tokio::task::spawn_blocking(move || stage.check(&snippet, &project_config));
                (index, timeout(stage_timeout, task).await)
            });
        }

        let mut outcomes: Vec<Option<StageOutcome>> = order.iter().map(|_| None).collect();
        let mut interrupted: Option<&'static str> = None;
        while !running.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = Some("cancelled");
                    break;
                }
                _ = sleep_until(deadline) => {
                    interrupted = Some("pipeline deadline exceeded");
                    break;
                }
                Some((index, outcome)) = running.next() => {
                    outcomes[index] = Some(outcome);
                }
            }
        }

        for (kind, outcome) in order.into_iter().zip(outcomes) {
            match outcome {
                Some(Ok(Ok(Ok(findings)))) => {
                    tracing::debug!(stage = %kind, findings = findings.len(), "Stage completed");
                    for finding in findings {
                        report.apply(finding);
                    }
                }
                Some(Ok(Ok(Err(e)))) => {
                    tracing::debug!(stage = %kind, error = %e, "Stage did not complete");
                    report.mark_incomplete(kind, e.to_string());
                }
                Some(Ok(Err(join_error))) => {
                    tracing::warn!(stage = %kind, error = %join_error, "Stage panicked");
                    report.mark_incomplete(kind, "stage panicked");
                }
                Some(Err(_)) => {
                    report.mark_incomplete(
                        kind,
                        format!("timed out after {}ms", self.config.stage_timeout.as_millis()),
                    );
                }
                None => {
                    report.mark_incomplete(kind, interrupted.unwrap_or("not finished"));
                }
            }
        }

        tracing::info!(
            snippet_id = %snippet.id(),
            score = report.quality_score().value(),
            issues = report.issues().len(),
            incomplete = report.incomplete_stages().len(),
            skipped = report.skipped_stages().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Validation finished"
        );
        report
    }
}
