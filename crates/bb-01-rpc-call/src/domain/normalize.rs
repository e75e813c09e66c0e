//! Error normalization.
//!
//! Every failure reaching a `fail` subscriber is a [`RemoteError`]. A
//! structured error object from the service is kept as is; anything else
//! means the request never produced an application answer and is reported
//! as the generic network error (`-32603`).

use serde_json::Value;
use shared_types::{RemoteError, TransportFailure, TransportReply};
use tracing::debug;

/// Turn a transport failure into the error handed to `fail` subscribers.
#[must_use]
pub fn normalize_failure(failure: TransportFailure) -> RemoteError {
    match failure {
        TransportFailure::Structured(Value::Object(object)) => RemoteError::from_object(&object),
        TransportFailure::Structured(other) => {
            debug!(error = %other, "Non-object error member, treating as transport failure");
            RemoteError::network()
        }
        TransportFailure::Unstructured(detail) => {
            debug!(detail = %detail, "Unstructured transport failure");
            RemoteError::network()
        }
    }
}

/// Normalize a complete transport reply.
pub fn normalize_reply(reply: TransportReply) -> Result<Value, RemoteError> {
    reply.map_err(normalize_failure)
}

/// Split a decoded JSON-RPC response body into a transport reply.
///
/// A non-null `error` member wins over `result`; a body with neither is an
/// unstructured failure.
#[must_use]
pub fn reply_from_response_body(body: Value) -> TransportReply {
    let Value::Object(mut object) = body else {
        return Err(TransportFailure::Unstructured(body.to_string()));
    };
    match object.remove("error") {
        Some(error) if !error.is_null() => return Err(TransportFailure::Structured(error)),
        _ => {}
    }
    match object.remove("result") {
        Some(result) => Ok(result),
        None => Err(TransportFailure::Unstructured(
            "response carries neither result nor error".to_string(),
        )),
    }
}
