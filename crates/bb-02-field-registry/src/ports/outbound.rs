//! Outbound Ports (Driven Ports)
//!
//! Whether a field is mandatory right now depends on the entity being
//! edited. The registry asks through this trait instead of knowing the
//! entity type.

use crate::domain::UnknownFieldError;

/// Entity-specific answers the registry needs.
pub trait EntityContext {
    /// Is `field` currently shown?
    fn is_visible(&self, field: &str) -> Result<bool, UnknownFieldError>;

    /// Legal values of `field` given the entity's current values.
    fn choices(&self, field: &str) -> Result<Vec<String>, UnknownFieldError>;
}
