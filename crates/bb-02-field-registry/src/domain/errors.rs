//! Registry error types.

use serde::{Deserialize, Serialize};
use shared_types::RemoteError;
use std::fmt;
use thiserror::Error;

/// Which dependency link an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// `value_field`: the parent filters the choice set.
    Value,
    /// `visibility_field`: the parent decides visibility.
    Visibility,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => f.write_str("value_field"),
            Self::Visibility => f.write_str("visibility_field"),
        }
    }
}

/// Invalid descriptor table. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Alias {alias} of field {field} collides with field {other}")]
    AliasCollision {
        alias: String,
        field: String,
        other: String,
    },

    #[error("Field {field} has {kind} referencing unknown field {target}")]
    DanglingReference {
        field: String,
        kind: DependencyKind,
        target: String,
    },

    #[error("Field {field} has {kind} referencing itself")]
    SelfReference { field: String, kind: DependencyKind },

    #[error("Dependency cycle: {}", .path.join(" -> "))]
    DependencyCycle { path: Vec<String> },
}

/// Lookup of a name that is neither a field nor an alias.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown field: {name}")]
pub struct UnknownFieldError {
    pub name: String,
}

impl UnknownFieldError {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Schema loading failures.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{method} failed: {error}")]
    Remote {
        method: String,
        #[source]
        error: RemoteError,
    },

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Malformed {method} response: {reason}")]
    Decode { method: String, reason: String },
}

impl LoadError {
    pub(crate) fn decode(method: &str, reason: impl fmt::Display) -> Self {
        Self::Decode {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_shows_path() {
        let err = SchemaError::DependencyCycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle: a -> b -> a");
    }

    #[test]
    fn test_dangling_message_names_link() {
        let err = SchemaError::DanglingReference {
            field: "component".into(),
            kind: DependencyKind::Value,
            target: "prodcut".into(),
        };
        assert_eq!(
            err.to_string(),
            "Field component has value_field referencing unknown field prodcut"
        );
    }

    #[test]
    fn test_remote_error_is_source() {
        use std::error::Error as _;
        let err = LoadError::Remote {
            method: "Bug.fields".into(),
            error: RemoteError::network(),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Bug.fields failed"));
    }
}
