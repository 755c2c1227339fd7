//! Test utilities for VDPro
//!
//! Helpers shared by the unit tests and the integration test suite (enabled
//! there through the `test-utils` feature).
//!
//! - [`init_test_logging`] routes `tracing` output through the test harness
//! - [`http::TestServer`] serves canned manifest and binary responses on a
//!   local port

pub mod http;

pub use http::{CannedResponse, TestServer};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for a test run, once per process.
///
/// With `Some(level)` that level is used; with `None` logging is only enabled
/// when `RUST_LOG` is set.
///
/// ```rust,no_run
/// use tracing::Level;
///
/// vdpro::test_utils::init_test_logging(Some(Level::DEBUG));
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
