//! Validation Adapters - Heuristic stage implementations.
//!
//! Each stage implements the ValidationStage port over a shared lexical
//! scan of the snippet:
//! - `SyntaxStage` - Unbalanced delimiters, unterminated literals
//! - `LintStage` - Layout and per-language style rules
//! - `SemanticStage` - Unreachable code, dropped async results, endless loops
//! - `SecurityStage` - Vulnerability classes such as code injection and secrets
//! - `BestPracticesStage` - Idiom and framework advice

#[macro_use]
mod rules;

mod best_practices;
mod lint;
mod security;
mod semantic;
mod source;
mod syntax;

use std::sync::Arc;

use crate::ports::ValidationStage;

pub use best_practices::BestPracticesStage;
pub use lint::LintStage;
pub use security::SecurityStage;
pub use semantic::SemanticStage;
pub use syntax::SyntaxStage;

/// The five built-in stages in pipeline order.
pub fn default_stages(max_line_length: usize) -> Vec<Arc<dyn ValidationStage>> {
    vec![
        Arc::new(SyntaxStage::new()),
        Arc::new(LintStage::new(max_line_length)),
        Arc::new(SemanticStage::new()),
        Arc::new(SecurityStage::new()),
        Arc::new(BestPracticesStage::new()),
    ]
}
