//! Log output setup for the binaries.

use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Stdout is left alone because the RPC server speaks its protocol there.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
