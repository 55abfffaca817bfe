//! Best-practices stage: idiom and framework advice.
//!
//! Findings here are informational. Framework rules only apply when the
//! snippet targets that framework.

use crate::domain::codegen::{ProjectConfig, Snippet, StageKind, ValidationFinding};
use crate::ports::{StageError, ValidationStage};

use super::rules::{apply_rules, PatternRule, Scope, Target};
use super::source::scan;

pattern!(RE_TODO_MARKER, r"\b(TODO|FIXME|XXX|HACK)\b");
pattern!(RE_RUST_UNWRAP, r"\.unwrap\(\)");
pattern!(RE_RUST_UNSAFE, r"\bunsafe\s*\{");
pattern!(
    RE_PY_MUTABLE_DEFAULT,
    r"\bdef\s+\w+\s*\([^)]*=\s*(\[\s*\]|\{\s*\}|(list|dict|set)\(\))"
);
pattern!(RE_PY_GLOBAL, r"^\s*global\s+\w");
pattern!(RE_PY_OPEN, r"(^|[^\w.])open\s*\(");
pattern!(RE_TS_ANY, r":\s*any\b|\bas\s+any\b|<any>");
pattern!(RE_TS_IGNORE, r"@ts-ignore");
pattern!(RE_GO_DISCARDED_ERROR, r"\b\w+\s*,\s*_\s*:?=");
pattern!(RE_GO_PANIC, r"\bpanic\s*\(");
pattern!(RE_JAVA_BROAD_CATCH, r"\bcatch\s*\(\s*(Exception|Throwable)\b");
pattern!(RE_JAVA_EXIT, r"\bSystem\.exit\s*\(");
pattern!(RE_CS_ASYNC_VOID, r"\basync\s+void\b");
pattern!(RE_CS_BROAD_CATCH, r"\bcatch\s*\(\s*(System\.)?Exception\b");
pattern!(RE_REACT_CLASS, r"\bextends\s+(React\.)?(Pure)?Component\b");
pattern!(
    RE_REACT_LEGACY_LIFECYCLE,
    r"\b(componentWillMount|componentWillReceiveProps|componentWillUpdate)\b"
);
pattern!(RE_DJANGO_DEBUG, r"^\s*DEBUG\s*=\s*True\b");
pattern!(RE_FLASK_DEBUG, r"\.run\(.*\bdebug\s*=\s*True");

static PRACTICE_RULES: &[PatternRule] = &[
    PatternRule::new(Scope::Any, Target::AnyLine, &RE_TODO_MARKER, "unresolved TODO or FIXME marker"),
    PatternRule::new(
        Scope::Rust,
        Target::Code,
        &RE_RUST_UNWRAP,
        "unwrap() panics on failure; propagate the error with ?",
    ),
    PatternRule::new(Scope::Rust, Target::Code, &RE_RUST_UNSAFE, "unsafe block needs a safety argument"),
    PatternRule::new(
        Scope::Python,
        Target::Code,
        &RE_PY_MUTABLE_DEFAULT,
        "mutable default argument is shared between calls",
    ),
    PatternRule::new(Scope::Python, Target::Code, &RE_PY_GLOBAL, "global statement"),
    PatternRule::new(
        Scope::Python,
        Target::Code,
        &RE_PY_OPEN,
        "file opened without a 'with' block",
    )
    .unless("with "),
    PatternRule::new(Scope::TypeScript, Target::Code, &RE_TS_ANY, "'any' disables type checking"),
    PatternRule::new(Scope::TypeScript, Target::AnyLine, &RE_TS_IGNORE, "@ts-ignore hides type errors"),
    PatternRule::new(Scope::Go, Target::Code, &RE_GO_DISCARDED_ERROR, "returned error discarded with '_'"),
    PatternRule::new(Scope::Go, Target::Code, &RE_GO_PANIC, "panic instead of returning an error"),
    PatternRule::new(
        Scope::Java,
        Target::Code,
        &RE_JAVA_BROAD_CATCH,
        "catching Exception hides specific failures",
    ),
    PatternRule::new(Scope::Java, Target::Code, &RE_JAVA_EXIT, "System.exit stops the whole JVM"),
    PatternRule::new(Scope::CSharp, Target::Code, &RE_CS_ASYNC_VOID, "async void cannot be awaited"),
    PatternRule::new(
        Scope::CSharp,
        Target::Code,
        &RE_CS_BROAD_CATCH,
        "catching Exception hides specific failures",
    ),
    PatternRule::new(
        Scope::EcmaScript,
        Target::Code,
        &RE_REACT_CLASS,
        "class component; prefer a function component with hooks",
    )
    .for_framework("react"),
    PatternRule::new(
        Scope::EcmaScript,
        Target::Code,
        &RE_REACT_LEGACY_LIFECYCLE,
        "deprecated lifecycle method",
    )
    .for_framework("react"),
    PatternRule::new(Scope::Python, Target::Code, &RE_DJANGO_DEBUG, "DEBUG enabled in settings")
        .for_framework("django"),
    PatternRule::new(Scope::Python, Target::Raw, &RE_FLASK_DEBUG, "app runs in debug mode")
        .for_framework("flask"),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct BestPracticesStage;

impl BestPracticesStage {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationStage for BestPracticesStage {
    fn kind(&self) -> StageKind {
        StageKind::BestPractices
    }

    fn check(
        &self,
        snippet: &Snippet,
        _config: &ProjectConfig,
    ) -> Result<Vec<ValidationFinding>, StageError> {
        let scanned = scan(snippet.content(), snippet.language());
        let mut findings = apply_rules(
            StageKind::BestPractices,
            PRACTICE_RULES,
            snippet.language(),
            snippet.framework(),
            &scanned,
        );
        findings.sort_by_key(|f| f.line);
        Ok(findings)
    }
}
