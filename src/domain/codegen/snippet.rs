//! Snippet - one unit of generated output plus its validation annotations.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BackendId, FileId, ProjectId, QualityScore, SnippetId, Timestamp};

use super::{CommandContext, Language};

/// Generated code, recorded append-only in the project history.
///
/// Everything except `security_warnings` and `quality_score` is fixed at
/// creation; those two are set through [`Snippet::annotate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    id: SnippetId,
    project_id: ProjectId,
    file_id: Option<FileId>,
    backend_id: BackendId,
    content: String,
    language: Language,
    framework: String,
    description: String,
    created_at: Timestamp,
    parent_id: Option<SnippetId>,
    tags: Vec<String>,
    security_warnings: Vec<String>,
    quality_score: QualityScore,
}

impl Snippet {
    pub fn id(&self) -> SnippetId {
        self.id
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn file_id(&self) -> Option<&FileId> {
        self.file_id.as_ref()
    }

    pub fn backend_id(&self) -> &BackendId {
        &self.backend_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn framework(&self) -> &str {
        &self.framework
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn parent_id(&self) -> Option<SnippetId> {
        self.parent_id
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn security_warnings(&self) -> &[String] {
        &self.security_warnings
    }

    pub fn quality_score(&self) -> QualityScore {
        self.quality_score
    }

    /// Applies validation results.
    ///
    /// Warnings are merged without duplicates and the score can only go down,
    /// so annotating twice never improves a snippet.
    pub fn annotate(&mut self, warnings: &[String], score: QualityScore) {
        for warning in warnings {
            if !self.security_warnings.contains(warning) {
                self.security_warnings.push(warning.clone());
            }
        }
        self.quality_score = self.quality_score.min(score);
    }
}

/// Content produced by a backend, not yet turned into a [`Snippet`].
#[derive(Debug, Clone)]
pub struct SnippetDraft {
    project_id: ProjectId,
    file_id: Option<FileId>,
    backend_id: BackendId,
    content: String,
    language: Language,
    framework: String,
    description: String,
    parent_id: Option<SnippetId>,
    tags: Vec<String>,
}

impl SnippetDraft {
    /// Starts a draft that inherits project, file, language and framework
    /// from the request context.
    pub fn for_context(
        context: &CommandContext,
        backend_id: BackendId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            project_id: context.project_id().clone(),
            file_id: context.file_id().cloned(),
            backend_id,
            content: content.into(),
            language: context.target_language().clone(),
            framework: context.target_framework().to_string(),
            description: String::new(),
            parent_id: None,
            tags: context.keywords().to_vec(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_parent(mut self, parent_id: SnippetId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Finalizes the draft, assigning a fresh id and creation time.
    pub fn build(self) -> Snippet {
        Snippet {
            id: SnippetId::new(),
            project_id: self.project_id,
            file_id: self.file_id,
            backend_id: self.backend_id,
            content: self.content,
            language: self.language,
            framework: self.framework,
            description: self.description,
            created_at: Timestamp::now(),
            parent_id: self.parent_id,
            tags: self.tags,
            security_warnings: Vec::new(),
            quality_score: QualityScore::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::SessionKey;

    fn context() -> CommandContext {
        CommandContext::builder(SessionKey::new("s1").unwrap(), ProjectId::new("p1").unwrap())
            .with_file(FileId::new("src/app.ts").unwrap())
            .with_language(Language::TypeScript)
            .with_framework("express")
            .with_keywords(vec!["api".to_string()])
            .build()
            .unwrap()
    }

    fn snippet() -> Snippet {
        SnippetDraft::for_context(&context(), BackendId::new("b1").unwrap(), "const x = 1;")
            .with_description("constant")
            .build()
    }

    #[test]
    fn draft_inherits_context_fields() {
        let s = snippet();
        assert_eq!(s.project_id().as_str(), "p1");
        assert_eq!(s.file_id().map(FileId::as_str), Some("src/app.ts"));
        assert_eq!(s.language(), &Language::TypeScript);
        assert_eq!(s.framework(), "express");
        assert_eq!(s.tags(), &["api".to_string()]);
        assert_eq!(s.quality_score(), QualityScore::MAX);
        assert!(s.security_warnings().is_empty());
    }

    #[test]
    fn build_assigns_unique_ids() {
        assert_ne!(snippet().id(), snippet().id());
    }

    #[test]
    fn annotate_merges_warnings_and_never_raises_score() {
        let mut s = snippet();
        s.annotate(&["code-injection: eval".to_string()], QualityScore::new(80));
        s.annotate(&["code-injection: eval".to_string()], QualityScore::new(95));

        assert_eq!(s.security_warnings().len(), 1);
        assert_eq!(s.quality_score().value(), 80);
    }

    #[test]
    fn snippet_roundtrips_through_json() {
        let s = snippet();
        let json = serde_json::to_string(&s).unwrap();
        let back: Snippet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
