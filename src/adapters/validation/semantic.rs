//! Semantic stage: likely logic errors.
//!
//! Looks for code that cannot run, async calls whose result is dropped,
//! error handlers that swallow failures, loops with no way out, variables
//! assigned to themselves and unfinished placeholders. Languages outside
//! the known set are not analysed and report the stage as unsupported.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::domain::codegen::{Language, ProjectConfig, Snippet, StageKind, ValidationFinding};
use crate::ports::{StageError, ValidationStage};

use super::rules::{summarize, Scope};
use super::source::{scan, Line, ScannedSource};

pattern!(RE_PY_ASYNC_DEF, r"^\s*async\s+def\s+(\w+)");
pattern!(RE_JS_ASYNC_FUNCTION, r"\basync\s+function\s*\*?\s*([\w$]+)");
pattern!(RE_JS_ASYNC_ARROW, r"([\w$]+)\s*=\s*async\b");
pattern!(RE_JS_ASYNC_METHOD, r"^\s*(?:static\s+)?async\s+([\w$]+)\s*\(");
pattern!(RE_RUST_ASYNC_FN, r"\basync\s+fn\s+(\w+)");
pattern!(RE_CS_ASYNC_METHOD, r"\basync\s+(?:Task|ValueTask)(?:<[^(]*>)?\s+(\w+)\s*\(");

pattern!(RE_EMPTY_CATCH_INLINE, r"\bcatch\s*(\([^)]*\))?\s*\{\s*\}");
pattern!(RE_CATCH_OPEN, r"\bcatch\s*(\([^)]*\))?\s*\{\s*$");
pattern!(RE_PY_EXCEPT, r"^\s*except\b[^:]*:\s*(pass)?\s*$");

pattern!(RE_PY_FOREVER, r"^\s*while\s+(True|1)\s*:");
pattern!(RE_C_WHILE_TRUE, r"\bwhile\s*\(\s*(true|1)\s*\)\s*\{");
pattern!(RE_C_FOR_EVER, r"\bfor\s*\(\s*;\s*;\s*\)\s*\{");
pattern!(RE_GO_FOR_EVER, r"^\s*for\s*\{");
pattern!(RE_RUST_LOOP, r"^\s*(?:'\w+\s*:\s*)?loop\s*\{");
pattern!(RE_LOOP_EXIT, r"\b(break|return|raise|throw|[eE]xit|panic)\b");

pattern!(RE_SELF_ASSIGN, r"^\s*([A-Za-z_$][\w$.]*)\s*=\s*([A-Za-z_$][\w$.]*)\s*;?\s*$");
pattern!(RE_RUST_PLACEHOLDER, r"\b(todo|unimplemented)!\s*\(");
pattern!(RE_PY_NOT_IMPLEMENTED, r"^\s*raise\s+NotImplementedError\b");

/// Statements after which nothing in the same block runs.
const TERMINATORS: &[&str] = &["return", "break", "continue", "raise", "throw"];

/// Line starts that close or continue a block rather than follow a
/// terminator inside it.
const BLOCK_BOUNDARIES: &[&str] = &[
    "}", ")", "]", "else", "elif", "except", "finally", "catch", "case", "default",
];

/// Async function declarations, per language.
static ASYNC_DECLARATIONS: &[(Scope, &Lazy<Option<Regex>>)] = &[
    (Scope::Python, &RE_PY_ASYNC_DEF),
    (Scope::EcmaScript, &RE_JS_ASYNC_FUNCTION),
    (Scope::EcmaScript, &RE_JS_ASYNC_ARROW),
    (Scope::EcmaScript, &RE_JS_ASYNC_METHOD),
    (Scope::Rust, &RE_RUST_ASYNC_FN),
    (Scope::CSharp, &RE_CS_ASYNC_METHOD),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticStage;

impl SemanticStage {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationStage for SemanticStage {
    fn kind(&self) -> StageKind {
        StageKind::Semantic
    }

    fn check(
        &self,
        snippet: &Snippet,
        _config: &ProjectConfig,
    ) -> Result<Vec<ValidationFinding>, StageError> {
        let language = snippet.language();
        if let Language::Other(name) = language {
            return Err(StageError::UnsupportedLanguage(name.clone()));
        }

        let scanned = scan(snippet.content(), language);

        let mut findings = Vec::new();
        findings.extend(unreachable_code(&scanned));
        findings.extend(unawaited_calls(&scanned, language));
        findings.extend(empty_handlers(&scanned, language));
        findings.extend(endless_loops(&scanned, language));
        findings.extend(self_assignments(&scanned));
        findings.extend(placeholders(&scanned, language));
        findings.sort_by_key(|f| f.line);
        Ok(findings)
    }
}

fn regex(lazy: &Lazy<Option<Regex>>) -> Option<&Regex> {
    Lazy::force(lazy).as_ref()
}

fn starts_with_word(code: &str, word: &str) -> bool {
    match code.strip_prefix(word) {
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}

fn depth_before(scanned: &ScannedSource<'_>, index: usize) -> usize {
    index
        .checked_sub(1)
        .and_then(|i| scanned.lines.get(i))
        .map_or(0, |line| line.depth)
}

fn unreachable_code(scanned: &ScannedSource<'_>) -> Vec<ValidationFinding> {
    let mut lines = Vec::new();

    for (index, line) in scanned.lines.iter().enumerate() {
        let code = line.code.trim();
        if !TERMINATORS.iter().any(|kw| starts_with_word(code, kw)) {
            continue;
        }
        // Multi-line statements end somewhere below; skip them.
        if line.depth != depth_before(scanned, index) {
            continue;
        }
        let Some(next) = scanned.next_code_line(index) else {
            continue;
        };
        let next_code = next.code.trim();
        if next.indent() == line.indent()
            && !BLOCK_BOUNDARIES.iter().any(|b| next_code.starts_with(b))
        {
            lines.push(next.number);
        }
    }

    group(StageKind::Semantic, "unreachable code after return, break or throw", lines)
}

fn unawaited_calls(scanned: &ScannedSource<'_>, language: &Language) -> Vec<ValidationFinding> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    for (scope, lazy) in ASYNC_DECLARATIONS {
        let Some(re) = scope.covers(language).then(|| regex(*lazy)).flatten() else {
            continue;
        };
        for line in scanned.code_lines() {
            for captures in re.captures_iter(&line.code) {
                if let Some(name) = captures.get(1) {
                    names.insert(name.as_str().to_string());
                }
            }
        }
    }
    if language.is_ecmascript() {
        names.insert("fetch".to_string());
    }

    let mut findings = Vec::new();
    for name in names {
        // Only bare expression statements drop the result outright.
        let Ok(call) = Regex::new(&format!(
            r"^\s*(?:(?:self|this)\.)?{}\s*\(.*\)\s*;?\s*$",
            regex::escape(&name)
        )) else {
            continue;
        };
        let lines: Vec<usize> = scanned
            .code_lines()
            .filter(|line| call.is_match(&line.code))
            .map(|line| line.number)
            .collect();
        if let Some(&first) = lines.first() {
            findings.push(summarize(
                StageKind::Semantic,
                &format!("result of async call '{}' is never awaited", name),
                first,
                lines.len(),
            ));
        }
    }
    findings
}

fn empty_handlers(scanned: &ScannedSource<'_>, language: &Language) -> Vec<ValidationFinding> {
    let mut lines = Vec::new();

    if *language == Language::Python {
        let Some(except) = regex(&RE_PY_EXCEPT) else {
            return Vec::new();
        };
        for (index, line) in scanned.lines.iter().enumerate() {
            let Some(captures) = except.captures(&line.code) else {
                continue;
            };
            let inline_pass = captures.get(1).is_some();
            let next_is_pass = scanned
                .next_code_line(index)
                .is_some_and(|next| next.code.trim() == "pass" && next.indent() > line.indent());
            if inline_pass || next_is_pass {
                lines.push(line.number);
            }
        }
    } else {
        let (Some(inline), Some(open)) = (regex(&RE_EMPTY_CATCH_INLINE), regex(&RE_CATCH_OPEN)) else {
            return Vec::new();
        };
        for (index, line) in scanned.lines.iter().enumerate() {
            let closes_next = || {
                scanned
                    .next_code_line(index)
                    .is_some_and(|next| next.code.trim_start().starts_with('}'))
            };
            if inline.is_match(&line.code) || (open.is_match(&line.code) && closes_next()) {
                lines.push(line.number);
            }
        }
    }

    group(StageKind::Semantic, "empty error handler swallows failures", lines)
}

fn endless_loops(scanned: &ScannedSource<'_>, language: &Language) -> Vec<ValidationFinding> {
    let Some(exit) = regex(&RE_LOOP_EXIT) else {
        return Vec::new();
    };
    let headers: Vec<&Lazy<Option<Regex>>> = match language {
        Language::Python => vec![&RE_PY_FOREVER],
        Language::Rust => vec![&RE_RUST_LOOP, &RE_C_WHILE_TRUE],
        Language::Go => vec![&RE_GO_FOR_EVER],
        _ => vec![&RE_C_WHILE_TRUE, &RE_C_FOR_EVER],
    };

    let mut lines = Vec::new();
    for (index, line) in scanned.lines.iter().enumerate() {
        if !headers.iter().filter_map(|h| regex(*h)).any(|re| re.is_match(&line.code)) {
            continue;
        }
        let body = if *language == Language::Python {
            indented_body(scanned, index)
        } else {
            braced_body(scanned, index)
        };
        let exits = body.iter().any(|l| {
            exit.is_match(&l.code) || (*language == Language::Rust && l.code.contains('?'))
        });
        if !exits {
            lines.push(line.number);
        }
    }

    group(StageKind::Semantic, "loop never exits: no break or return in its body", lines)
}

/// Lines indented deeper than the header at `index`.
fn indented_body<'s, 'a>(scanned: &'s ScannedSource<'a>, index: usize) -> Vec<&'s Line<'a>> {
    let header = &scanned.lines[index];
    scanned
        .lines
        .iter()
        .skip(index + 1)
        .filter(|l| l.has_code())
        .take_while(|l| l.indent() > header.indent())
        .collect()
}

/// The header at `index` and every line until its braces close.
fn braced_body<'s, 'a>(scanned: &'s ScannedSource<'a>, index: usize) -> Vec<&'s Line<'a>> {
    let start_depth = depth_before(scanned, index);
    let mut body = Vec::new();
    for line in scanned.lines.iter().skip(index) {
        body.push(line);
        if line.depth <= start_depth {
            break;
        }
    }
    body
}

fn self_assignments(scanned: &ScannedSource<'_>) -> Vec<ValidationFinding> {
    let Some(assign) = regex(&RE_SELF_ASSIGN) else {
        return Vec::new();
    };
    scanned
        .code_lines()
        .filter_map(|line| {
            let captures = assign.captures(&line.code)?;
            let (target, value) = (captures.get(1)?.as_str(), captures.get(2)?.as_str());
            (target == value).then(|| {
                ValidationFinding::new(
                    StageKind::Semantic,
                    format!("'{}' is assigned to itself", target),
                )
                .at_line(line.number)
            })
        })
        .collect()
}

fn placeholders(scanned: &ScannedSource<'_>, language: &Language) -> Vec<ValidationFinding> {
    let placeholder = match language {
        Language::Rust => regex(&RE_RUST_PLACEHOLDER),
        Language::Python => regex(&RE_PY_NOT_IMPLEMENTED),
        _ => None,
    };
    let Some(re) = placeholder else {
        return Vec::new();
    };
    let lines = scanned
        .code_lines()
        .filter(|line| re.is_match(&line.code))
        .map(|line| line.number)
        .collect();
    group(StageKind::Semantic, "unfinished placeholder fails at runtime", lines)
}

fn group(stage: StageKind, message: &str, lines: Vec<usize>) -> Vec<ValidationFinding> {
    lines
        .first()
        .map(|&first| summarize(stage, message, first, lines.len()))
        .into_iter()
        .collect()
}
