//! # Shared Bus - Notification Plumbing
//!
//! Two delivery mechanisms for the same events:
//!
//! - [`CallbackList`]: synchronous subscriber lists. Used by RPC calls
//!   (`started`/`done`/`fail`/`complete`) and by bug entities
//!   (`changed`/`choices-updated`/`visibility-updated`). A panicking
//!   subscriber is logged and does not stop the others.
//! - [`InMemoryEventBus`]: a broadcast channel that mirrors entity events
//!   for async consumers.
//!
//! ```text
//! ┌──────────────┐   fire()    ┌──────────────┐
//! │  Bug / Call  │ ──────────▶ │ CallbackList │ ──▶ subscribers (in order)
//! │              │             └──────────────┘
//! │              │  publish()  ┌──────────────┐
//! │              │ ──────────▶ │  Event Bus   │ ──▶ Subscription (filtered)
//! └──────────────┘             └──────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod callbacks;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use callbacks::{Callback, CallbackId, CallbackList};
pub use events::{BugEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
