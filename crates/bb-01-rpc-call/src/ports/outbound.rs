//! Outbound Ports (Driven Ports)
//!
//! The transport is an external collaborator: a generic JSON-RPC client that
//! knows the endpoint and the wire envelope. The call only needs a way to
//! hand it a request and be told how the round trip ended.

use shared_types::{RpcRequest, TransportReply};
use std::sync::Arc;

/// Receives the outcome of one round trip.
pub type ReplySink = Box<dyn FnOnce(TransportReply) + Send>;

/// Transport for RPC calls (Driven Port).
///
/// `dispatch` must eventually invoke `reply` exactly once. It may do so
/// before returning (synchronous transports, tests) or later from any thread.
pub trait RpcTransport: Send + Sync {
    /// Send `request`; report the outcome through `reply`.
    fn dispatch(&self, request: RpcRequest, reply: ReplySink);
}

impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    fn dispatch(&self, request: RpcRequest, reply: ReplySink) {
        (**self).dispatch(request, reply);
    }
}

impl<T: RpcTransport + ?Sized> RpcTransport for Box<T> {
    fn dispatch(&self, request: RpcRequest, reply: ReplySink) {
        (**self).dispatch(request, reply);
    }
}
