//! Bug error types.

use crate::config::ConfigError;
use bb_02_field_registry::UnknownFieldError;
use shared_types::{BugId, RemoteError};
use thiserror::Error;

/// Errors from bug operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BugError {
    #[error(transparent)]
    UnknownField(#[from] UnknownFieldError),

    /// A value that cannot be coerced to the field's type.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Update or fetch of a bug that has no id yet.
    #[error("Bug has not been created yet")]
    NotCreated,

    #[error("{method} failed: {error}")]
    Remote {
        method: String,
        #[source]
        error: RemoteError,
    },

    #[error("Malformed {method} response: {reason}")]
    Decode { method: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BugError {
    pub(crate) fn invalid(field: &str, value: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// A failed save or fetch. Pending edits are untouched.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Persisting bug {} failed: {error}", .bug_id.map_or_else(|| "(new)".to_string(), |id| id.to_string()))]
pub struct PersistError {
    pub bug_id: Option<BugId>,
    #[source]
    pub error: RemoteError,
}
