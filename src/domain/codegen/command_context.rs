//! CommandContext - the per-request generation configuration.
//!
//! A context is immutable once built. Changes go through [`CommandContext::derive`],
//! which copies the context, applies a [`ContextPatch`] and re-checks every
//! invariant, so an invalid context can never exist.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BackendId, FileId, ProjectId, SessionKey, ValidationError};

use super::Language;

/// What the caller wants the backend to do with the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationMode {
    #[default]
    New,
    Refactor,
    Debug,
    Optimize,
    Document,
    Test,
    Explain,
    Review,
}

impl GenerationMode {
    /// Every mode, in declaration order.
    pub const ALL: [GenerationMode; 8] = [
        GenerationMode::New,
        GenerationMode::Refactor,
        GenerationMode::Debug,
        GenerationMode::Optimize,
        GenerationMode::Document,
        GenerationMode::Test,
        GenerationMode::Explain,
        GenerationMode::Review,
    ];

    /// Imperative instruction used when building the backend prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            GenerationMode::New => "Write new code that satisfies the request.",
            GenerationMode::Refactor => "Refactor the existing code without changing its behavior.",
            GenerationMode::Debug => "Find and fix the defect in the existing code.",
            GenerationMode::Optimize => "Improve the performance of the existing code.",
            GenerationMode::Document => "Add documentation comments to the existing code.",
            GenerationMode::Test => "Write unit tests for the existing code.",
            GenerationMode::Explain => "Explain the existing code and return an annotated version.",
            GenerationMode::Review => "Review the existing code and return a corrected version.",
        }
    }
}

/// Role of the person issuing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Developer,
    Reviewer,
    Learner,
    Admin,
}

/// Immutable configuration of a single generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandContext {
    session_key: SessionKey,
    project_id: ProjectId,
    file_id: Option<FileId>,
    target_language: Language,
    target_framework: String,
    generation_mode: GenerationMode,
    existing_code: Option<String>,
    preferred_backend: Option<BackendId>,
    temperature: f32,
    max_tokens: u32,
    keywords: Vec<String>,
    role: Role,
}

impl CommandContext {
    /// Starts building a context for a session within a project.
    pub fn builder(session_key: SessionKey, project_id: ProjectId) -> CommandContextBuilder {
        CommandContextBuilder {
            context: CommandContext {
                session_key,
                project_id,
                file_id: None,
                target_language: Language::Python,
                target_framework: String::new(),
                generation_mode: GenerationMode::New,
                existing_code: None,
                preferred_backend: None,
                temperature: 0.2,
                max_tokens: 2048,
                keywords: Vec::new(),
                role: Role::Developer,
            },
        }
    }

    /// Returns a copy of this context with the patch applied.
    ///
    /// The original is left untouched; the copy is validated like a freshly
    /// built context.
    pub fn derive(&self, patch: ContextPatch) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        if let Some(file_id) = patch.file_id {
            next.file_id = file_id;
        }
        if let Some(language) = patch.target_language {
            next.target_language = language;
        }
        if let Some(framework) = patch.target_framework {
            next.target_framework = framework;
        }
        if let Some(mode) = patch.generation_mode {
            next.generation_mode = mode;
        }
        if let Some(code) = patch.existing_code {
            next.existing_code = code;
        }
        if let Some(backend) = patch.preferred_backend {
            next.preferred_backend = backend;
        }
        if let Some(temperature) = patch.temperature {
            next.temperature = temperature;
        }
        if let Some(max_tokens) = patch.max_tokens {
            next.max_tokens = max_tokens;
        }
        if let Some(keywords) = patch.keywords {
            next.keywords = keywords;
        }
        if let Some(role) = patch.role {
            next.role = role;
        }
        next.validate()?;
        Ok(next)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::out_of_range(
                "temperature",
                0.0,
                1.0,
                self.temperature,
            ));
        }
        if self.max_tokens == 0 {
            return Err(ValidationError::out_of_range(
                "max_tokens",
                1,
                u32::MAX,
                self.max_tokens,
            ));
        }
        Ok(())
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn file_id(&self) -> Option<&FileId> {
        self.file_id.as_ref()
    }

    pub fn target_language(&self) -> &Language {
        &self.target_language
    }

    pub fn target_framework(&self) -> &str {
        &self.target_framework
    }

    pub fn generation_mode(&self) -> GenerationMode {
        self.generation_mode
    }

    pub fn existing_code(&self) -> Option<&str> {
        self.existing_code.as_deref()
    }

    pub fn preferred_backend(&self) -> Option<&BackendId> {
        self.preferred_backend.as_ref()
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

/// Builder for [`CommandContext`].
#[derive(Debug, Clone)]
pub struct CommandContextBuilder {
    context: CommandContext,
}

impl CommandContextBuilder {
    pub fn with_file(mut self, file_id: FileId) -> Self {
        self.context.file_id = Some(file_id);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.context.target_language = language;
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.context.target_framework = framework.into();
        self
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.context.generation_mode = mode;
        self
    }

    pub fn with_existing_code(mut self, code: impl Into<String>) -> Self {
        self.context.existing_code = Some(code.into());
        self
    }

    pub fn with_preferred_backend(mut self, backend: BackendId) -> Self {
        self.context.preferred_backend = Some(backend);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.context.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.context.max_tokens = max_tokens;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.context.keywords = keywords;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.context.role = role;
        self
    }

    /// Validates and returns the context.
    pub fn build(self) -> Result<CommandContext, ValidationError> {
        self.context.validate()?;
        Ok(self.context)
    }
}

/// Partial update applied by [`CommandContext::derive`].
///
/// `None` leaves a field unchanged. Optional fields take `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    pub file_id: Option<Option<FileId>>,
    pub target_language: Option<Language>,
    pub target_framework: Option<String>,
    pub generation_mode: Option<GenerationMode>,
    pub existing_code: Option<Option<String>>,
    pub preferred_backend: Option<Option<BackendId>>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub keywords: Option<Vec<String>>,
    pub role: Option<Role>,
}

impl ContextPatch {
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.generation_mode = Some(mode);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.target_language = Some(language);
        self
    }

    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.target_framework = Some(framework.into());
        self
    }

    pub fn with_file(mut self, file_id: Option<FileId>) -> Self {
        self.file_id = Some(file_id);
        self
    }

    pub fn with_existing_code(mut self, code: Option<String>) -> Self {
        self.existing_code = Some(code);
        self
    }

    pub fn with_preferred_backend(mut self, backend: Option<BackendId>) -> Self {
        self.preferred_backend = Some(backend);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = Some(keywords);
        self
    }
}
