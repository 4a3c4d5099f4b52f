//! Error types for the document store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while parsing a key path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("key path is empty")]
    Empty,

    #[error("empty segment in key path {path:?} at position {position}")]
    EmptySegment { path: String, position: usize },

    #[error("unclosed bracket in key path {path:?} starting at position {position}")]
    UnclosedBracket { path: String, position: usize },

    #[error("unexpected character {found:?} in key path {path:?} at position {position}")]
    UnexpectedChar {
        path: String,
        found: char,
        position: usize,
    },

    #[error("index {index} in key path {path:?} is too far past the end of an array of length {len}")]
    IndexTooFar { path: String, index: usize, len: usize },
}

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{store}: IO error on {}: {source}", .file.display())]
    Io {
        store: String,
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{store}: malformed JSON in {} at line {line}, column {column}: {source}", .file.display())]
    Parse {
        store: String,
        file: PathBuf,
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{store}: document root in {} is {found}, expected an object", .file.display())]
    InvalidDocument {
        store: String,
        file: PathBuf,
        found: &'static str,
    },

    #[error("{store}, {key_path} is not an array (found {found})")]
    InvalidContainer {
        store: String,
        key_path: String,
        found: &'static str,
    },

    #[error("Invalid key path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Deserialization error at {key_path}: {message}")]
    Deserialization { key_path: String, message: String },
}

impl StoreError {
    /// Whether the failure comes from the environment (disk or file content)
    /// and may be absorbed by a retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Io { .. } | StoreError::Parse { .. } | StoreError::InvalidDocument { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Human-readable name of a JSON value's variant, used in error messages.
pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transient_classification() {
        let io = StoreError::Io {
            store: "db".into(),
            file: PathBuf::from("db.fdb"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(io.is_transient());

        let usage = StoreError::InvalidContainer {
            store: "db".into(),
            key_path: "list".into(),
            found: "a string",
        };
        assert!(!usage.is_transient());
        assert!(!StoreError::from(PathError::Empty).is_transient());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = StoreError::InvalidContainer {
            store: "users".into(),
            key_path: "tags".into(),
            found: kind_name(&json!(5)),
        };
        assert_eq!(err.to_string(), "users, tags is not an array (found a number)");

        let err = StoreError::Io {
            store: "users".into(),
            file: PathBuf::from("/tmp/users.fdb"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("users"));
        assert!(msg.contains("/tmp/users.fdb"));
        assert!(msg.contains("denied"));
    }
}
