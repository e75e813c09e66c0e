//! Telemetry configuration from environment variables.

use crate::TelemetryError;
use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,

    /// Filter directive used when `RUST_LOG` is unset (e.g. `info`,
    /// `bb_03_bug_entity=debug,info`)
    pub log_level: String,

    /// Emit one JSON object per line instead of human readable output
    pub json_logs: bool,

    /// Colored output for the human readable format
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "bug-entry".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BB_SERVICE_NAME`: Service name (default: bug-entry)
    /// - `BB_LOG_LEVEL`: Fallback filter directive (default: info). `RUST_LOG`
    ///   takes precedence when the subscriber is built.
    /// - `BB_JSON_LOGS`: JSON output (default: false)
    /// - `NO_COLOR`: Disables ANSI colors when set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] over an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: lookup("BB_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("BB_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: lookup("BB_JSON_LOGS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.json_logs),
            ansi: lookup("NO_COLOR").is_none(),
        }
    }

    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.service_name.trim().is_empty() {
            return Err(TelemetryError::Config("service_name must not be empty".into()));
        }
        if self.log_level.trim().is_empty() {
            return Err(TelemetryError::Config("log_level must not be empty".into()));
        }
        Ok(())
    }
}
