//! Validation findings and the aggregated report.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::QualityScore;

/// The independent analysis passes run over a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Syntax,
    Lint,
    Semantic,
    Security,
    BestPractices,
}

impl StageKind {
    /// Every stage in pipeline order.
    pub const ALL: [StageKind; 5] = [
        StageKind::Syntax,
        StageKind::Lint,
        StageKind::Semantic,
        StageKind::Security,
        StageKind::BestPractices,
    ];

    /// Points deducted from the quality score per finding.
    pub fn weight(&self) -> u32 {
        match self {
            StageKind::Syntax => 10,
            StageKind::Lint => 2,
            StageKind::Semantic => 5,
            StageKind::Security => 7,
            StageKind::BestPractices => 3,
        }
    }

    /// Severity assigned to findings of this stage.
    pub fn severity(&self) -> Severity {
        match self {
            StageKind::Syntax => Severity::Error,
            StageKind::Lint => Severity::Warning,
            StageKind::Semantic => Severity::Warning,
            StageKind::Security => Severity::Critical,
            StageKind::BestPractices => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Syntax => "syntax",
            StageKind::Lint => "lint",
            StageKind::Semantic => "semantic",
            StageKind::Security => "security",
            StageKind::BestPractices => "best_practices",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Vulnerability classes the security stage reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityClass {
    CodeInjection,
    CommandInjection,
    SqlInjection,
    HardcodedSecret,
    InsecureDeserialization,
    WeakCryptography,
    CrossSiteScripting,
}

impl SecurityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityClass::CodeInjection => "code-injection",
            SecurityClass::CommandInjection => "command-injection",
            SecurityClass::SqlInjection => "sql-injection",
            SecurityClass::HardcodedSecret => "hardcoded-secret",
            SecurityClass::InsecureDeserialization => "insecure-deserialization",
            SecurityClass::WeakCryptography => "weak-cryptography",
            SecurityClass::CrossSiteScripting => "cross-site-scripting",
        }
    }
}

impl fmt::Display for SecurityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single issue reported by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub stage: StageKind,
    pub severity: Severity,
    pub message: String,
    /// 1-based line number, when the stage can point at one.
    pub line: Option<usize>,
}

impl ValidationFinding {
    /// Creates a finding with the stage's default severity.
    pub fn new(stage: StageKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            severity: stage.severity(),
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// A stage that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteStage {
    pub stage: StageKind,
    pub reason: String,
}

/// Aggregated outcome of the validation pipeline.
///
/// The score starts at 100 and each applied finding lowers it by its stage
/// weight, floored at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    issues: Vec<ValidationFinding>,
    security_warnings: Vec<String>,
    quality_score: QualityScore,
    incomplete_stages: Vec<IncompleteStage>,
    skipped_stages: Vec<StageKind>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            issues: Vec::new(),
            security_warnings: Vec::new(),
            quality_score: QualityScore::MAX,
            incomplete_stages: Vec::new(),
            skipped_stages: Vec::new(),
        }
    }

    /// Records a finding and lowers the score by its stage weight.
    pub fn apply(&mut self, finding: ValidationFinding) {
        self.quality_score = self.quality_score.penalize(finding.stage.weight());
        if finding.stage == StageKind::Security {
            self.security_warnings.push(finding.message.clone());
        }
        self.issues.push(finding);
    }

    pub fn mark_incomplete(&mut self, stage: StageKind, reason: impl Into<String>) {
        self.incomplete_stages.push(IncompleteStage {
            stage,
            reason: reason.into(),
        });
    }

    pub fn mark_skipped(&mut self, stage: StageKind) {
        self.skipped_stages.push(stage);
    }

    pub fn issues(&self) -> &[ValidationFinding] {
        &self.issues
    }

    pub fn security_warnings(&self) -> &[String] {
        &self.security_warnings
    }

    pub fn quality_score(&self) -> QualityScore {
        self.quality_score
    }

    pub fn incomplete_stages(&self) -> &[IncompleteStage] {
        &self.incomplete_stages
    }

    pub fn skipped_stages(&self) -> &[StageKind] {
        &self.skipped_stages
    }

    /// Findings reported by one stage.
    pub fn findings_for(&self, stage: StageKind) -> impl Iterator<Item = &ValidationFinding> {
        self.issues.iter().filter(move |f| f.stage == stage)
    }

    pub fn is_incomplete(&self, stage: StageKind) -> bool {
        self.incomplete_stages.iter().any(|s| s.stage == stage)
    }

    /// True when every stage that ran completed.
    pub fn is_complete(&self) -> bool {
        self.incomplete_stages.is_empty()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
