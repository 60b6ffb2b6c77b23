use tracing_subscriber::{fmt, EnvFilter};

use crate::Result;

/// Initialize logging for the CLI.
///
/// Logs go to stderr so stdout carries only command output.
pub fn init(service_name: &str) -> Result<()> {
    // Default: warn everywhere. Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .try_init();

    tracing::debug!(service = service_name, "logging initialized");
    Ok(())
}
