//! # Remote Response Shapes
//!
//! Results of the `Bug.create`, `Bug.update` and `Bug.get` calls.

use crate::entities::{BugId, FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of `Bug.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResult {
    /// Id assigned by the service.
    pub id: BugId,
}

/// Result of `Bug.update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// One entry per updated bug.
    #[serde(default)]
    pub bugs: Vec<BugChanges>,
}

/// Changes the service applied to one bug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugChanges {
    #[serde(default)]
    pub id: Option<BugId>,
    /// Field name → applied delta.
    #[serde(default)]
    pub changes: BTreeMap<String, ChangeDelta>,
}

/// Applied delta for one field; both sides are comma-joined strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDelta {
    #[serde(default)]
    pub added: String,
    #[serde(default)]
    pub removed: String,
}

impl ChangeDelta {
    /// Added values, split.
    #[must_use]
    pub fn added_items(&self) -> Vec<String> {
        FieldValue::split_csv(&self.added)
    }

    /// Removed values, split.
    #[must_use]
    pub fn removed_items(&self) -> Vec<String> {
        FieldValue::split_csv(&self.removed)
    }
}

/// Result of `Bug.get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResult {
    #[serde(default)]
    pub bugs: Vec<Record>,
}
