//! Service Layer
//!
//! `RpcCall` orchestrates the domain state machine over an injected transport.

pub mod rpc_call;

pub use rpc_call::RpcCall;
