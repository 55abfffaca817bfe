//! Lexical view of snippet source shared by the validation stages.
//!
//! The scanner walks the snippet once, per language, and produces:
//!
//! - every line with string contents and comments blanked out, so rules can
//!   match code without tripping over text in literals
//! - the open delimiter depth at the end of each line
//! - the structural problems it ran into (unbalanced delimiters,
//!   unterminated strings and block comments)
//!
//! It is a heuristic lexer, not a parser. Regex literals, raw strings with
//! hashes and nested template expressions are treated as plain code or text.

use crate::domain::codegen::Language;

/// One source line after scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number.
    pub number: usize,
    pub raw: &'a str,
    /// `raw` with string contents and comments replaced by spaces.
    pub code: String,
    /// Open delimiters after this line.
    pub depth: usize,
}

impl Line<'_> {
    /// True when the line holds anything besides whitespace, comments and
    /// string continuation.
    pub fn has_code(&self) -> bool {
        !self.code.trim().is_empty()
    }

    /// Leading whitespace width, tabs counted as four columns.
    pub fn indent(&self) -> usize {
        self.raw
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(|c| if c == '\t' { 4 } else { 1 })
            .sum()
    }
}

/// Structural problems found while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexIssue {
    UnmatchedCloser { found: char, line: usize },
    MismatchedCloser { expected: char, found: char, line: usize },
    Unclosed { open: char, line: usize },
    UnterminatedString { line: usize },
    UnterminatedComment { line: usize },
}

impl LexIssue {
    pub fn line(&self) -> usize {
        match *self {
            LexIssue::UnmatchedCloser { line, .. }
            | LexIssue::MismatchedCloser { line, .. }
            | LexIssue::Unclosed { line, .. }
            | LexIssue::UnterminatedString { line }
            | LexIssue::UnterminatedComment { line } => line,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            LexIssue::UnmatchedCloser { found, .. } => {
                format!("unexpected closing '{}' with nothing open", found)
            }
            LexIssue::MismatchedCloser { expected, found, .. } => {
                format!("expected '{}' but found '{}'", expected, found)
            }
            LexIssue::Unclosed { open, .. } => format!("'{}' is never closed", open),
            LexIssue::UnterminatedString { .. } => "unterminated string literal".to_string(),
            LexIssue::UnterminatedComment { .. } => "unterminated block comment".to_string(),
        }
    }
}

/// Result of scanning a snippet.
#[derive(Debug, Clone)]
pub struct ScannedSource<'a> {
    pub lines: Vec<Line<'a>>,
    pub issues: Vec<LexIssue>,
}

impl<'a> ScannedSource<'a> {
    /// Lines that contain code.
    pub fn code_lines(&self) -> impl Iterator<Item = &Line<'a>> {
        self.lines.iter().filter(|l| l.has_code())
    }

    /// Next line with code after the 0-based index `index`.
    pub fn next_code_line(&self, index: usize) -> Option<&Line<'a>> {
        self.lines.iter().skip(index + 1).find(|l| l.has_code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment { depth: u32 },
    Str {
        quote: char,
        triple: bool,
        multiline: bool,
        escapes: bool,
    },
}

impl State {
    fn string(quote: char, triple: bool, multiline: bool, escapes: bool) -> Self {
        State::Str {
            quote,
            triple,
            multiline,
            escapes,
        }
    }
}

struct CommentStyle {
    hash: bool,
    slash: bool,
    nested: bool,
}

fn comment_style(language: &Language) -> CommentStyle {
    match language {
        Language::Python => CommentStyle {
            hash: true,
            slash: false,
            nested: false,
        },
        Language::Rust => CommentStyle {
            hash: false,
            slash: true,
            nested: true,
        },
        Language::Other(_) => CommentStyle {
            hash: true,
            slash: true,
            nested: false,
        },
        _ => CommentStyle {
            hash: false,
            slash: true,
            nested: false,
        },
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Recognizes a string opener at `i`, returning the new state and how many
/// characters the opener spans.
fn open_string(language: &Language, chars: &[char], i: usize) -> Option<(State, usize)> {
    let c = chars[i];
    let at = |k: usize| chars.get(i + k).copied();
    let prev_is_ident = i > 0 && is_ident(chars[i - 1]);
    let single = |q: char| Some((State::string(q, false, false, true), 1));

    match language {
        Language::Python => match c {
            '"' | '\'' if at(1) == Some(c) && at(2) == Some(c) => {
                Some((State::string(c, true, true, true), 3))
            }
            '"' | '\'' => single(c),
            _ => None,
        },
        Language::Rust => match c {
            '"' => Some((State::string('"', false, true, true), 1)),
            'r' if at(1) == Some('"') && !prev_is_ident => {
                Some((State::string('"', false, true, false), 2))
            }
            // `'a'` and `'\n'` are chars, `'a` alone is a lifetime.
            '\'' if at(1) == Some('\\') || at(2) == Some('\'') => single('\''),
            _ => None,
        },
        Language::JavaScript | Language::TypeScript => match c {
            '`' => Some((State::string('`', false, true, true), 1)),
            '"' | '\'' => single(c),
            _ => None,
        },
        Language::Go => match c {
            '`' => Some((State::string('`', false, true, false), 1)),
            '"' | '\'' => single(c),
            _ => None,
        },
        Language::Java => match c {
            '"' if at(1) == Some('"') && at(2) == Some('"') => {
                Some((State::string('"', true, true, true), 3))
            }
            '"' | '\'' => single(c),
            _ => None,
        },
        Language::CSharp => match c {
            '@' if at(1) == Some('"') => Some((State::string('"', false, true, false), 2)),
            '"' | '\'' => single(c),
            _ => None,
        },
        Language::Other(_) => match c {
            '"' | '\'' => single(c),
            _ => None,
        },
    }
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Scans `content` as `language` source.
pub fn scan<'a>(content: &'a str, language: &Language) -> ScannedSource<'a> {
    let comments = comment_style(language);
    let mut state = State::Code;
    let mut opened_at = 0usize;
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut lines = Vec::new();
    let mut issues = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let number = index + 1;
        let chars: Vec<char> = raw.chars().collect();
        let mut code = String::with_capacity(raw.len());
        let mut continued = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            match state {
                State::LineComment => {
                    code.push(' ');
                    i += 1;
                }
                State::BlockComment { depth } => {
                    if c == '*' && next == Some('/') {
                        code.push_str("  ");
                        i += 2;
                        state = if depth > 1 {
                            State::BlockComment { depth: depth - 1 }
                        } else {
                            State::Code
                        };
                    } else if comments.nested && c == '/' && next == Some('*') {
                        code.push_str("  ");
                        i += 2;
                        state = State::BlockComment { depth: depth + 1 };
                    } else {
                        code.push(' ');
                        i += 1;
                    }
                }
                State::Str {
                    quote,
                    triple,
                    escapes,
                    ..
                } => {
                    if escapes && c == '\\' {
                        if next.is_none() {
                            continued = true;
                            code.push(' ');
                            i += 1;
                        } else {
                            code.push_str("  ");
                            i += 2;
                        }
                    } else if c == quote && !triple {
                        code.push(quote);
                        i += 1;
                        state = State::Code;
                    } else if c == quote && next == Some(quote) && chars.get(i + 2) == Some(&quote) {
                        code.extend([quote, quote, quote]);
                        i += 3;
                        state = State::Code;
                    } else {
                        code.push(' ');
                        i += 1;
                    }
                }
                State::Code => {
                    if comments.hash && c == '#' {
                        state = State::LineComment;
                        continue;
                    }
                    if comments.slash && c == '/' && next == Some('/') {
                        state = State::LineComment;
                        continue;
                    }
                    if comments.slash && c == '/' && next == Some('*') {
                        state = State::BlockComment { depth: 1 };
                        opened_at = number;
                        code.push_str("  ");
                        i += 2;
                        continue;
                    }
                    if let Some((string_state, width)) = open_string(language, &chars, i) {
                        code.extend(&chars[i..i + width]);
                        i += width;
                        state = string_state;
                        opened_at = number;
                        continue;
                    }

                    match c {
                        '(' | '[' | '{' => stack.push((c, number)),
                        ')' | ']' | '}' => match stack.pop() {
                            Some((open, _)) if closer_for(open) == c => {}
                            Some((open, line)) => {
                                if stack.iter().any(|(o, _)| closer_for(*o) == c) {
                                    // The closer ends an outer opener; everything
                                    // in between was left open.
                                    issues.push(LexIssue::Unclosed { open, line });
                                    while let Some((o, l)) = stack.pop() {
                                        if closer_for(o) == c {
                                            break;
                                        }
                                        issues.push(LexIssue::Unclosed { open: o, line: l });
                                    }
                                } else {
                                    issues.push(LexIssue::MismatchedCloser {
                                        expected: closer_for(open),
                                        found: c,
                                        line: number,
                                    });
                                    stack.push((open, line));
                                }
                            }
                            None => issues.push(LexIssue::UnmatchedCloser {
                                found: c,
                                line: number,
                            }),
                        },
                        _ => {}
                    }
                    code.push(c);
                    i += 1;
                }
            }
        }

        match state {
            State::LineComment => state = State::Code,
            State::Str {
                multiline: false, ..
            } if !continued => {
                issues.push(LexIssue::UnterminatedString { line: number });
                state = State::Code;
            }
            _ => {}
        }

        lines.push(Line {
            number,
            raw,
            code,
            depth: stack.len(),
        });
    }

    match state {
        State::Str { .. } => issues.push(LexIssue::UnterminatedString { line: opened_at }),
        State::BlockComment { .. } => issues.push(LexIssue::UnterminatedComment { line: opened_at }),
        _ => {}
    }
    for (open, line) in stack {
        issues.push(LexIssue::Unclosed { open, line });
    }

    ScannedSource { lines, issues }
}
