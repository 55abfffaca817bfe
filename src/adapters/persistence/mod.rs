//! Persistence Adapters.
//!
//! Implementations of the PersistenceStore port.
//!
//! - `InMemoryPersistenceStore` - Process-local store for tests
//! - `JsonFilePersistenceStore` - JSON-lines files on disk

mod in_memory;
mod json_file;

pub use in_memory::InMemoryPersistenceStore;
pub use json_file::JsonFilePersistenceStore;
