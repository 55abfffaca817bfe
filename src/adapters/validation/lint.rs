//! Lint stage: style violations against a fixed ruleset.
//!
//! Layout rules (line length, trailing whitespace, mixed indentation) apply
//! to every language; the pattern rules are per language. Each rule yields
//! at most one finding, with the number of occurrences in its message.

use crate::domain::codegen::{ProjectConfig, Snippet, StageKind, ValidationFinding};
use crate::ports::{StageError, ValidationStage};

use super::rules::{apply_rules, summarize, PatternRule, Scope, Target};
use super::source::{scan, ScannedSource};

pattern!(RE_NONE_COMPARISON, r"[=!]=\s*None\b");
pattern!(RE_BARE_EXCEPT, r"^\s*except\s*:");
pattern!(RE_WILDCARD_IMPORT, r"^\s*from\s+\S+\s+import\s+\*");
pattern!(RE_VAR_DECLARATION, r"(^|[^\w$.])var\s+[\w$]");
pattern!(RE_LOOSE_EQUALITY, r"[^=!<>]==[^=]|!=[^=]");
pattern!(RE_CONSOLE_LOG, r"\bconsole\.log\(");
pattern!(RE_REF_OWNED_PARAM, r"&(String|Vec<[^>]+>)\s*[,)]");
pattern!(RE_DOUBLE_CLONE, r"\.clone\(\)\.clone\(\)");
pattern!(RE_SNAKE_SHORT_DECL, r"\b[a-z][a-z0-9]*_[a-z0-9_]+\s*:=");
pattern!(RE_SYSTEM_OUT, r"\bSystem\.(out|err)\.print");
pattern!(RE_CONSOLE_WRITE, r"\bConsole\.Write(Line)?\(");

static LINT_RULES: &[PatternRule] = &[
    PatternRule::new(
        Scope::Python,
        Target::Code,
        &RE_NONE_COMPARISON,
        "comparison to None should use 'is' or 'is not'",
    ),
    PatternRule::new(Scope::Python, Target::Code, &RE_BARE_EXCEPT, "bare 'except:' clause"),
    PatternRule::new(Scope::Python, Target::Code, &RE_WILDCARD_IMPORT, "wildcard import"),
    PatternRule::new(
        Scope::EcmaScript,
        Target::Code,
        &RE_VAR_DECLARATION,
        "'var' declaration; use 'let' or 'const'",
    ),
    PatternRule::new(
        Scope::EcmaScript,
        Target::Code,
        &RE_LOOSE_EQUALITY,
        "loose equality; use '===' or '!=='",
    ),
    PatternRule::new(Scope::EcmaScript, Target::Code, &RE_CONSOLE_LOG, "leftover console.log call"),
    PatternRule::new(
        Scope::Rust,
        Target::Code,
        &RE_REF_OWNED_PARAM,
        "parameter takes &String or &Vec; take &str or a slice",
    ),
    PatternRule::new(Scope::Rust, Target::Code, &RE_DOUBLE_CLONE, "redundant double clone"),
    PatternRule::new(
        Scope::Go,
        Target::Code,
        &RE_SNAKE_SHORT_DECL,
        "Go names use mixedCaps, not underscores",
    ),
    PatternRule::new(Scope::Java, Target::Code, &RE_SYSTEM_OUT, "printing to System.out; use a logger"),
    PatternRule::new(Scope::CSharp, Target::Code, &RE_CONSOLE_WRITE, "writing to Console; use a logger"),
];

#[derive(Debug, Clone, Copy)]
pub struct LintStage {
    max_line_length: usize,
}

impl LintStage {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }
}

impl Default for LintStage {
    fn default() -> Self {
        Self::new(120)
    }
}

impl ValidationStage for LintStage {
    fn kind(&self) -> StageKind {
        StageKind::Lint
    }

    fn check(
        &self,
        snippet: &Snippet,
        _config: &ProjectConfig,
    ) -> Result<Vec<ValidationFinding>, StageError> {
        let scanned = scan(snippet.content(), snippet.language());

        let mut findings = self.layout_findings(&scanned);
        findings.extend(apply_rules(
            StageKind::Lint,
            LINT_RULES,
            snippet.language(),
            snippet.framework(),
            &scanned,
        ));
        Ok(findings)
    }
}

impl LintStage {
    fn layout_findings(&self, scanned: &ScannedSource<'_>) -> Vec<ValidationFinding> {
        let mut findings = Vec::new();

        let long: Vec<usize> = scanned
            .lines
            .iter()
            .filter(|l| l.raw.chars().count() > self.max_line_length)
            .map(|l| l.number)
            .collect();
        if let Some(&first) = long.first() {
            findings.push(summarize(
                StageKind::Lint,
                &format!("line exceeds {} characters", self.max_line_length),
                first,
                long.len(),
            ));
        }

        let trailing: Vec<usize> = scanned
            .lines
            .iter()
            .filter(|l| l.raw.ends_with([' ', '\t']))
            .map(|l| l.number)
            .collect();
        if let Some(&first) = trailing.first() {
            findings.push(summarize(StageKind::Lint, "trailing whitespace", first, trailing.len()));
        }

        let tab_indented = scanned.lines.iter().find(|l| l.raw.starts_with('\t'));
        let space_indented = scanned.lines.iter().any(|l| l.raw.starts_with(' ') && l.has_code());
        if let (Some(line), true) = (tab_indented, space_indented) {
            findings.push(
                ValidationFinding::new(StageKind::Lint, "indentation mixes tabs and spaces")
                    .at_line(line.number),
            );
        }

        findings
    }
}
