//! # BB-03 Bug Entity
//!
//! One bug being viewed or edited: the values the service confirmed, the
//! edits made locally since, and everything derived from the two.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `BugState`, a plain value with the full
//!   mutation contract (`set`/`add`/`remove`, choices, visibility, defaults,
//!   propagation) and the create/update diff. Operations return the events
//!   they produced instead of calling anyone.
//! - **Service Layer** (`service/`): `Bug`, a shareable handle that owns a
//!   `BugState` behind a mutex, delivers events to subscribers and the event
//!   bus, and runs save/fetch round trips over `bb-01-rpc-call`.
//!
//! ## Value Model
//!
//! ```text
//! value(f) = pending[f]  ?? confirmed[f]  ?? empty(f)
//!
//! set(f, v) ──▶ normalize ──▶ pending/confirmed compare ──▶ changed
//!                                        │
//!                                        ▼
//!                              propagate(f)
//!                              ├─ choice dependents: recompute, reset, choices-updated
//!                              └─ visibility dependents: recompute, clear hidden, visibility-updated
//! ```
//!
//! ## Persistence
//!
//! | Call         | Request                          | On success                    |
//! |--------------|----------------------------------|-------------------------------|
//! | `save()` new | `Bug.create {field: value}`      | id assigned, values confirmed |
//! | `save()`     | `Bug.update {ids, field: delta}` | change report merged          |
//! | `update()`   | `Bug.get {ids}`                  | confirmed values replaced     |
//!
//! At most one save and one fetch are in flight per bug; repeated calls
//! return the outstanding handle.
//!
//! ## Usage Example
//!
//! ```ignore
//! use bb_03_bug_entity::BugContext;
//!
//! let context = BugContext::new(registry, transport);
//! let bug = context.draft()?;
//! bug.on_choices_updated(|n| println!("{} now offers {:?}", n.field, n.choices));
//! bug.set("product", "Core")?;
//! bug.save().wait().await?;
//! ```

#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod domain;
pub mod service;

// Re-exports for convenience
pub use config::{BugConfig, ConfigError};
pub use domain::{normalize, BugError, BugState, CreatePlan, PersistError, UpdatePlan};
pub use service::{
    Bug, BugContext, FieldChanged, FieldChoicesUpdated, FieldVisibilityUpdated, Persist,
    PersistKind,
};
