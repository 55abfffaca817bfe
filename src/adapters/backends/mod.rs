//! Backend Adapters.
//!
//! Implementations of the BackendHandle and ModelClient ports.
//!
//! ## Available Adapters
//!
//! - `ProviderBackend` - Backend over any streaming `ModelClient`
//! - `MockModelClient` - Scripted streaming client for testing
//! - `MockBackend` - Scripted backend with switchable health for testing

mod mock_backend;
mod mock_model_client;
mod prompt;
mod provider_backend;

pub use mock_backend::{MockBackend, MockGeneration, MockHealth};
pub use mock_model_client::{MockModelClient, MockResponse};
pub use prompt::{parse_answer, system_prompt, user_message, CodeBlock, ParsedAnswer};
pub use provider_backend::ProviderBackend;
