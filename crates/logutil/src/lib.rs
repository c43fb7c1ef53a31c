//! Utilities for logging.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize a logger for tests.
///
/// Output is captured by the test harness. Defaults to TRACE, `RUST_LOG` can
/// be used to narrow it. Calling this more than once is a no-op.
pub fn init_test() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::TRACE.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_test_writer()
        .with_file(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
