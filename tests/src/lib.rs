//! # Bug Entry Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (propagation, diff)
//! └── src/
//!     ├── fake.rs       # In-process tracker answering the remote methods
//!     └── integration/  # Loader → entity → save/fetch flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bb-tests
//! cargo bench -p bb-tests
//! ```

pub mod fake;
pub mod integration;

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Route test logs through the same subscriber setup the engine uses.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let config = bb_telemetry::TelemetryConfig::from_lookup(|key| match key {
            "BB_SERVICE_NAME" => Some("bb-tests".to_string()),
            "BB_LOG_LEVEL" => Some("warn".to_string()),
            _ => std::env::var(key).ok(),
        });
        if let Err(e) = bb_telemetry::init_logging(&config) {
            eprintln!("test logging unavailable: {e}");
        }
    });
}
