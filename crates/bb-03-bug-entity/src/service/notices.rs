//! Arguments passed to per-entity subscribers.

use super::bug::Bug;
use shared_types::FieldValue;

/// The effective value of `field` changed.
#[derive(Debug, Clone)]
pub struct FieldChanged {
    pub bug: Bug,
    pub field: String,
    pub value: FieldValue,
}

/// The choices of `field` were recomputed after `source` changed.
#[derive(Debug, Clone)]
pub struct FieldChoicesUpdated {
    pub bug: Bug,
    pub source: String,
    pub field: String,
    pub choices: Vec<String>,
}

/// The visibility of `field` was recomputed after `source` changed.
#[derive(Debug, Clone)]
pub struct FieldVisibilityUpdated {
    pub bug: Bug,
    pub source: String,
    pub field: String,
    pub visible: bool,
}
