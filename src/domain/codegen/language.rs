//! Target language of a generation request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Programming language a snippet is written in.
///
/// Parsing is lenient: common aliases (`js`, `py`, `golang`, `c#`) map onto
/// the known variants and anything else is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    CSharp,
    Other(String),
}

impl Language {
    /// Parses a language name or alias, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rust" | "rs" => Language::Rust,
            "python" | "py" | "python3" => Language::Python,
            "javascript" | "js" | "node" | "jsx" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "go" | "golang" => Language::Go,
            "java" => Language::Java,
            "csharp" | "c#" | "cs" => Language::CSharp,
            other => Language::Other(other.to_string()),
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::CSharp => "csharp",
            Language::Other(name) => name,
        }
    }

    /// True for languages whose blocks are delimited by braces and whose
    /// comments use `//` and `/* */`.
    pub fn is_c_family(&self) -> bool {
        matches!(
            self,
            Language::Rust
                | Language::JavaScript
                | Language::TypeScript
                | Language::Go
                | Language::Java
                | Language::CSharp
        )
    }

    /// True for JavaScript and TypeScript.
    pub fn is_ecmascript(&self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }

    /// Marker that starts a line comment.
    pub fn line_comment(&self) -> &'static str {
        match self {
            Language::Python => "#",
            _ => "//",
        }
    }
}

impl From<String> for Language {
    fn from(name: String) -> Self {
        Language::from_name(&name)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.as_str().to_string()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_known_languages() {
        assert_eq!(Language::from_name("JS"), Language::JavaScript);
        assert_eq!(Language::from_name("py"), Language::Python);
        assert_eq!(Language::from_name("golang"), Language::Go);
        assert_eq!(Language::from_name("C#"), Language::CSharp);
        assert_eq!(Language::from_name(" Rust "), Language::Rust);
    }

    #[test]
    fn unknown_names_are_preserved() {
        let lang = Language::from_name("Elixir");
        assert_eq!(lang, Language::Other("elixir".to_string()));
        assert_eq!(lang.as_str(), "elixir");
        assert!(!lang.is_c_family());
    }

    #[test]
    fn comment_markers_follow_language() {
        assert_eq!(Language::Python.line_comment(), "#");
        assert_eq!(Language::TypeScript.line_comment(), "//");
    }

    #[test]
    fn language_serializes_as_canonical_name() {
        assert_eq!(serde_json::to_string(&Language::TypeScript).unwrap(), "\"typescript\"");
        let parsed: Language = serde_json::from_str("\"ts\"").unwrap();
        assert_eq!(parsed, Language::TypeScript);
    }
}
