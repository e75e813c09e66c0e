//! Cross-crate flows over the fake tracker.

pub mod flows;
