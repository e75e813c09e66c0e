//! Ports Layer
//!
//! - `outbound`: entity queries the registry depends on

pub mod outbound;

pub use outbound::EntityContext;
