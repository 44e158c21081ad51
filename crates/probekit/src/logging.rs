//! Logging setup for test binaries

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install a fmt subscriber writing through the test writer
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Only the first
/// call installs anything.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init();
}
