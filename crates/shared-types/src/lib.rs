//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the bug entry engine.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: field values, RPC requests and remote errors
//!   are defined once here.
//! - **Wire Agnostic**: nothing in this crate performs I/O; the shapes mirror
//!   what the remote service sends and accepts.

pub mod entities;
pub mod errors;
pub mod rpc;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use rpc::*;
pub use wire::*;
