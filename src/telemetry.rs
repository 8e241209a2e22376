use anyhow::{Context, anyhow};
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber on stderr. `RUST_LOG` wins over the
/// filter passed on the command line.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid log filter `{default_filter}`"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))
}
