//! # Error Types
//!
//! Remote (JSON-RPC) errors as surfaced to callers after normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Message used when the transport failed without a structured error.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error or other unexpected problem";

/// Normalized RPC failure.
///
/// Structured errors from the service are kept verbatim: `code` and
/// `message` are lifted out, every other member lands in `extra`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct RemoteError {
    /// Error code (JSON-RPC or service specific).
    #[serde(default = "default_code")]
    pub code: i64,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// Any further members of the error object.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_code() -> i64 {
    codes::INTERNAL_ERROR
}

impl RemoteError {
    /// Create a new remote error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// The synthesized error for transport-level failures.
    #[must_use]
    pub fn network() -> Self {
        Self::new(codes::INTERNAL_ERROR, NETWORK_ERROR_MESSAGE)
    }

    /// Build from a structured error object, keeping unknown members.
    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut extra = object.clone();
        let code = extra
            .remove("code")
            .and_then(|c| c.as_i64())
            .unwrap_or(codes::INTERNAL_ERROR);
        let message = match extra.remove("message") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Self {
            code,
            message,
            extra,
        }
    }

    /// True if this is the synthesized transport failure.
    #[must_use]
    pub fn is_network(&self) -> bool {
        self.code == codes::INTERNAL_ERROR && self.message == NETWORK_ERROR_MESSAGE
    }
}
