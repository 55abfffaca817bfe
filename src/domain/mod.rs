//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (identifiers, value objects, errors)
//! - `codegen` - Request contexts, snippets, validation reports and feedback

pub mod codegen;
pub mod foundation;
