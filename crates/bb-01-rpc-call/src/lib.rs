//! # BB-01 RPC Call
//!
//! Wraps one remote procedure invocation and the completion-callback contract
//! every higher layer depends on.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): call states, call ids, error normalization
//! - **Ports Layer** (`ports/`): `RpcTransport`, the driven port a real
//!   JSON-RPC client implements
//! - **Service Layer** (`service/`): `RpcCall`, the state machine and its
//!   subscriber lists
//! - **Adapters Layer** (`adapters/`): `InMemoryTransport` (scripted replies)
//!   and `TrackedTransport` (in-flight accounting)
//!
//! ## State Machine
//!
//! ```text
//! created ──start()──▶ started ──reply Ok──▶ succeeded   (done, then complete)
//!                          └────reply Err──▶ failed      (fail, then complete)
//! ```
//!
//! Subscribing after the call reached a terminal state replays the recorded
//! outcome to the new subscriber.
//!
//! ## Usage Example
//!
//! ```ignore
//! use bb_01_rpc_call::{InMemoryTransport, RpcCall};
//! use shared_types::RpcRequest;
//!
//! let transport = Arc::new(InMemoryTransport::new());
//! let call = RpcCall::new(transport.clone(), RpcRequest::without_params("Bug", "fields"));
//! call.done(|result| println!("{result}"))
//!     .fail(|error| eprintln!("{error}"));
//! ```

#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::{ActivitySnapshot, InMemoryTransport, RpcActivity, TrackedTransport};
pub use domain::{normalize_failure, normalize_reply, reply_from_response_body, CallId, CallState};
pub use ports::{ReplySink, RpcTransport};
pub use service::RpcCall;
