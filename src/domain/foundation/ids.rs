//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Unique identifier for a generated snippet.
///
/// Assigned once when the snippet is created and never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(Uuid);

impl SnippetId {
    /// Creates a new random SnippetId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a SnippetId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SnippetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnippetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Declares a non-empty, string-backed identifier.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, returning error if empty or blank.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Key of a conversational session (one editor tab, one chat thread).
    SessionKey,
    "session_key"
);

string_id!(
    /// Identifier of the project that owns snippet history.
    ProjectId,
    "project_id"
);

string_id!(
    /// Identifier of a file within a project.
    FileId,
    "file_id"
);

string_id!(
    /// Identifier of the user submitting requests or feedback.
    UserId,
    "user_id"
);

string_id!(
    /// Registry identifier of a model backend.
    BackendId,
    "backend_id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_id_generates_unique_values() {
        let id1 = SnippetId::new();
        let id2 = SnippetId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn snippet_id_parses_from_string() {
        let id = SnippetId::new();
        let parsed: SnippetId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn snippet_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<SnippetId>().is_err());
    }

    #[test]
    fn string_ids_accept_non_empty_values() {
        let key = SessionKey::new("s1").unwrap();
        assert_eq!(key.as_str(), "s1");
        assert_eq!(ProjectId::new("proj").unwrap().to_string(), "proj");
    }

    #[test]
    fn string_ids_reject_blank_values() {
        match ProjectId::new("   ") {
            Err(ValidationError::EmptyField { field }) => assert_eq!(field, "project_id"),
            other => panic!("Expected EmptyField error, got {:?}", other),
        }
        assert!(UserId::new("").is_err());
        assert!("".parse::<BackendId>().is_err());
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let id = BackendId::new("fast-local").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"fast-local\"");
    }
}
