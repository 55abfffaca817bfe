//! Backend kinds and the static routing table from task to backend family.
//!
//! Routing is an exhaustive match on enums, so adding a backend kind or a
//! generation mode fails to compile until it is routed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::GenerationMode;

/// Model provider a backend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    OpenAi,
    Anthropic,
    Gemini,
    Mistral,
    Ollama,
    /// Deterministic in-process backend (tests, offline demos).
    Scripted,
}

/// Capability family a backend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendFamily {
    /// Slower models with strong multi-step reasoning.
    HighReasoning,
    /// Models with large context windows, suited to whole-file work.
    LongContext,
    /// Low-latency completion models.
    FastCompletion,
    /// Models served on the developer's machine.
    Local,
}

impl BackendKind {
    /// Family used by the task routing table.
    pub fn family(&self) -> BackendFamily {
        match self {
            BackendKind::OpenAi => BackendFamily::HighReasoning,
            BackendKind::Anthropic => BackendFamily::HighReasoning,
            BackendKind::Gemini => BackendFamily::LongContext,
            BackendKind::Mistral => BackendFamily::FastCompletion,
            BackendKind::Ollama => BackendFamily::Local,
            BackendKind::Scripted => BackendFamily::FastCompletion,
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Gemini => "gemini",
            BackendKind::Mistral => "mistral",
            BackendKind::Ollama => "ollama",
            BackendKind::Scripted => "scripted",
        }
    }
}

impl GenerationMode {
    /// Backend family preferred for this kind of task.
    pub fn preferred_family(&self) -> BackendFamily {
        match self {
            GenerationMode::Debug | GenerationMode::Optimize | GenerationMode::Review => {
                BackendFamily::HighReasoning
            }
            GenerationMode::Refactor | GenerationMode::Document | GenerationMode::Explain => {
                BackendFamily::LongContext
            }
            GenerationMode::New | GenerationMode::Test => BackendFamily::FastCompletion,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendFamily::HighReasoning => "high-reasoning",
            BackendFamily::LongContext => "long-context",
            BackendFamily::FastCompletion => "fast-completion",
            BackendFamily::Local => "local",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_tasks_prefer_high_reasoning() {
        assert_eq!(GenerationMode::Debug.preferred_family(), BackendFamily::HighReasoning);
        assert_eq!(BackendKind::Anthropic.family(), BackendFamily::HighReasoning);
    }

    #[test]
    fn every_mode_routes_to_a_family_served_by_some_kind() {
        let kinds = [
            BackendKind::OpenAi,
            BackendKind::Anthropic,
            BackendKind::Gemini,
            BackendKind::Mistral,
            BackendKind::Ollama,
            BackendKind::Scripted,
        ];
        for mode in GenerationMode::ALL {
            let family = mode.preferred_family();
            assert!(
                kinds.iter().any(|k| k.family() == family),
                "no backend kind serves {family} for {mode:?}"
            );
        }
    }

    #[test]
    fn family_displays_as_tag() {
        assert_eq!(BackendFamily::HighReasoning.to_string(), "high-reasoning");
        let json = serde_json::to_string(&BackendFamily::FastCompletion).unwrap();
        assert_eq!(json, "\"fast-completion\"");
    }
}
