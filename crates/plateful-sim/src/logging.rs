//! Tracing subscriber setup

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_directive` applies. Logs go
/// to stderr so reports on stdout stay machine-readable.
///
/// # Errors
/// Fails if a global subscriber is already installed or the directive is
/// malformed.
pub fn init(default_directive: &str, json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))?;
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("installing subscriber: {e}"))
    } else {
        builder
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("installing subscriber: {e}"))
    }
}
