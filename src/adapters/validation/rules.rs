//! Pattern rules shared by the heuristic stages.
//!
//! A rule is a regex plus where it applies: which languages, optionally
//! which framework, and which text of a line it looks at. Regexes are
//! compiled lazily once per process; a pattern that fails to compile
//! simply never matches.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::codegen::{Language, StageKind, ValidationFinding};

use super::source::ScannedSource;

/// Declares a lazily compiled regex static.
macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: once_cell::sync::Lazy<Option<regex::Regex>> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($re).ok());
    };
}

/// Languages a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    Python,
    Rust,
    /// JavaScript and TypeScript.
    EcmaScript,
    TypeScript,
    Go,
    Java,
    CSharp,
}

impl Scope {
    pub fn covers(&self, language: &Language) -> bool {
        match self {
            Scope::Any => true,
            Scope::Python => *language == Language::Python,
            Scope::Rust => *language == Language::Rust,
            Scope::EcmaScript => language.is_ecmascript(),
            Scope::TypeScript => *language == Language::TypeScript,
            Scope::Go => *language == Language::Go,
            Scope::Java => *language == Language::Java,
            Scope::CSharp => *language == Language::CSharp,
        }
    }
}

/// Which text of a line a rule is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Code with strings and comments blanked.
    Code,
    /// Original text of lines that contain code.
    Raw,
    /// Original text of every line, comments included.
    AnyLine,
}

pub struct PatternRule {
    pub scope: Scope,
    pub target: Target,
    pub regex: &'static Lazy<Option<Regex>>,
    pub message: &'static str,
    /// Lowercase framework name the rule is limited to.
    pub framework: Option<&'static str>,
    /// Lines containing this text never match.
    pub unless: Option<&'static str>,
}

impl PatternRule {
    pub const fn new(
        scope: Scope,
        target: Target,
        regex: &'static Lazy<Option<Regex>>,
        message: &'static str,
    ) -> Self {
        Self {
            scope,
            target,
            regex,
            message,
            framework: None,
            unless: None,
        }
    }

    pub const fn for_framework(mut self, framework: &'static str) -> Self {
        self.framework = Some(framework);
        self
    }

    pub const fn unless(mut self, text: &'static str) -> Self {
        self.unless = Some(text);
        self
    }

    pub fn applies_to(&self, language: &Language, framework: &str) -> bool {
        self.scope.covers(language)
            && self
                .framework
                .map_or(true, |f| framework.eq_ignore_ascii_case(f))
    }

    /// 1-based numbers of the lines this rule matches.
    pub fn matching_lines(&self, scanned: &ScannedSource<'_>) -> Vec<usize> {
        let Some(regex) = Lazy::force(self.regex).as_ref() else {
            return Vec::new();
        };

        scanned
            .lines
            .iter()
            .filter(|line| match self.target {
                Target::Code => regex.is_match(&line.code),
                Target::Raw => line.has_code() && regex.is_match(line.raw),
                Target::AnyLine => regex.is_match(line.raw),
            })
            .filter(|line| self.unless.map_or(true, |text| !line.raw.contains(text)))
            .map(|line| line.number)
            .collect()
    }
}

/// Runs `rules` and returns one finding per rule that matched, placed at
/// its first match.
pub fn apply_rules(
    stage: StageKind,
    rules: &[PatternRule],
    language: &Language,
    framework: &str,
    scanned: &ScannedSource<'_>,
) -> Vec<ValidationFinding> {
    rules
        .iter()
        .filter(|rule| rule.applies_to(language, framework))
        .filter_map(|rule| {
            let lines = rule.matching_lines(scanned);
            let first = *lines.first()?;
            Some(summarize(stage, rule.message, first, lines.len()))
        })
        .collect()
}

/// Single finding for a problem seen `count` times, first at `first_line`.
pub fn summarize(
    stage: StageKind,
    message: &str,
    first_line: usize,
    count: usize,
) -> ValidationFinding {
    let message = if count > 1 {
        format!("{} ({} occurrences)", message, count)
    } else {
        message.to_string()
    };
    ValidationFinding::new(stage, message).at_line(first_line)
}
