//! Domain Layer - pure bug state
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - No subscriber calls: operations return the events they produced

pub mod diff;
pub mod errors;
pub mod state;
pub mod values;

#[cfg(test)]
pub(crate) mod fixtures;

pub use diff::{CreatePlan, UpdatePlan};
pub use errors::{BugError, PersistError};
pub use state::BugState;
pub use values::normalize;
