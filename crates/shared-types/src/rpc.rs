//! # RPC Messages
//!
//! Request and transport-reply shapes exchanged with the injected transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One remote procedure invocation: `{namespace, method, params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Service namespace, e.g. `Bug`.
    pub namespace: String,
    /// Method within the namespace, e.g. `update`.
    pub method: String,
    /// Single params object.
    pub params: Value,
}

impl RpcRequest {
    /// Create a request with the given params object.
    pub fn new(namespace: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            namespace: namespace.into(),
            method: method.into(),
            params,
        }
    }

    /// Create a request with an empty params object.
    pub fn without_params(namespace: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(namespace, method, Value::Object(Map::new()))
    }

    /// `Namespace.method` as used on the wire.
    #[must_use]
    pub fn qualified_method(&self) -> String {
        format!("{}.{}", self.namespace, self.method)
    }

    /// JSON-RPC body for this request; params are wrapped in a one-element array.
    #[must_use]
    pub fn to_jsonrpc_body(&self, id: u64) -> Value {
        json!({
            "method": self.qualified_method(),
            "params": [self.params],
            "id": id,
        })
    }
}

/// How a transport reports a failed round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    /// The `error` member of a response.
    Structured(Value),
    /// No error object at all: connection failure, bad status, raw text body.
    Unstructured(String),
}

/// Outcome of one round trip as seen by the transport.
pub type TransportReply = Result<Value, TransportFailure>;
