//! Service Layer
//!
//! Shared `Bug` handles, subscriber lists, and the save/fetch round trips.

pub mod bug;
pub mod context;
pub mod notices;
pub mod persist;

pub use bug::Bug;
pub use context::BugContext;
pub use notices::{FieldChanged, FieldChoicesUpdated, FieldVisibilityUpdated};
pub use persist::{Persist, PersistKind};
