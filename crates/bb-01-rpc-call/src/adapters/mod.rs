//! Adapters Layer
//!
//! - `InMemoryTransport` - records requests, replies from a handler or on demand
//! - `TrackedTransport` / `RpcActivity` - counts calls in flight around any transport

pub mod activity;
pub mod memory;

pub use activity::{ActivitySnapshot, RpcActivity, TrackedTransport};
pub use memory::InMemoryTransport;
