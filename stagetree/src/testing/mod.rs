//! Testing utilities for stage trees.
//!
//! This module provides:
//! - A shared log that hooks append to, for asserting run order
//! - Ready-made recording, failing and sleeping hooks
//! - Tracing setup for tests

mod hooks;

pub use hooks::{failing_hook, record_hook, sleep_hook, RecordingLog};

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG` and falls back to `warn`. Safe to call from every test;
/// only the first call installs anything.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
