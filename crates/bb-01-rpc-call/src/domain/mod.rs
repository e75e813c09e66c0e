//! Domain Layer - call state and error normalization
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod correlation;
pub mod normalize;
pub mod state;

pub use correlation::CallId;
pub use normalize::{normalize_failure, normalize_reply, reply_from_response_body};
pub use state::CallState;
