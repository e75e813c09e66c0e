//! # BB Telemetry
//!
//! Structured logging for processes embedding the bug entry engine.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! left to the binary or test harness, through [`init_logging`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bb_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() -> Result<(), bb_telemetry::TelemetryError> {
//!     init_logging(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | unset | Filter directive, wins over `BB_LOG_LEVEL` |
//! | `BB_LOG_LEVEL` | `info` | Fallback filter directive |
//! | `BB_JSON_LOGS` | `false` | JSON lines instead of human output |
//! | `BB_SERVICE_NAME` | `bug-entry` | Service name in the startup line |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience macro for a span scoped to one bug.
///
/// # Example
///
/// ```rust,ignore
/// let _span = bb_telemetry::bug_span!("save", bug_id = 42).entered();
/// ```
#[macro_export]
macro_rules! bug_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
