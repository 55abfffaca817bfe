//! Syntax stage: gross structural errors.
//!
//! Reports what the lexical scan finds (unbalanced delimiters,
//! unterminated strings and comments) plus, for Python, block headers that
//! are missing their colon. Findings are capped so one early error does
//! not cascade into a zero score.

use crate::domain::codegen::{Language, ProjectConfig, Snippet, StageKind, ValidationFinding};
use crate::ports::{StageError, ValidationStage};

use super::source::{scan, ScannedSource};

/// Most findings reported for one snippet.
const MAX_FINDINGS: usize = 3;

const PYTHON_BLOCK_KEYWORDS: &[&str] = &[
    "def", "class", "if", "elif", "else", "for", "while", "try", "except", "finally", "with",
    "async def", "async for", "async with",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxStage;

impl SyntaxStage {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationStage for SyntaxStage {
    fn kind(&self) -> StageKind {
        StageKind::Syntax
    }

    fn check(
        &self,
        snippet: &Snippet,
        _config: &ProjectConfig,
    ) -> Result<Vec<ValidationFinding>, StageError> {
        let scanned = scan(snippet.content(), snippet.language());

        let mut findings: Vec<ValidationFinding> = scanned
            .issues
            .iter()
            .map(|issue| ValidationFinding::new(StageKind::Syntax, issue.describe()).at_line(issue.line()))
            .collect();

        if *snippet.language() == Language::Python {
            findings.extend(missing_colons(&scanned));
        }

        findings.sort_by_key(|f| f.line);
        findings.truncate(MAX_FINDINGS);
        Ok(findings)
    }
}

fn missing_colons(scanned: &ScannedSource<'_>) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    let mut previous_depth = 0;

    for line in &scanned.lines {
        let starts_statement = previous_depth == 0;
        previous_depth = line.depth;
        if !starts_statement || line.depth > 0 {
            continue;
        }

        let code = line.code.trim();
        let Some(keyword) = PYTHON_BLOCK_KEYWORDS.iter().find(|kw| opens_block(code, kw)) else {
            continue;
        };
        // One-line bodies (`if x: return`) still contain the colon.
        if !code.contains(':') && !code.ends_with('\\') {
            findings.push(
                ValidationFinding::new(
                    StageKind::Syntax,
                    format!("'{}' statement is missing a trailing ':'", keyword),
                )
                .at_line(line.number),
            );
        }
    }
    findings
}

/// True when `code` starts with `keyword` as a whole word.
fn opens_block(code: &str, keyword: &str) -> bool {
    match code.strip_prefix(keyword) {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '(', ':']),
        None => false,
    }
}
