//! Tracing subscriber setup. Called once by the binary.

use tracing_subscriber::EnvFilter;

use crate::config::Environment;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// environment's default level; `prod` logs JSON lines.
pub fn init(env: Environment) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(env.default_log_level()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if env.json_logs() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
