//! Ports Layer
//!
//! - `outbound`: the transport the call hands requests to

pub mod outbound;

pub use outbound::{ReplySink, RpcTransport};
