//! stderr diagnostics for the CLI

use tracing_subscriber::{fmt, EnvFilter};

/// Variable holding an `EnvFilter` directive, e.g. `toolcache=debug`.
pub const LOG_ENV: &str = "TOOLCACHE_LOG";

/// Install the global subscriber. `verbose` raises the default level from
/// `warn` to `info`; an explicit `TOOLCACHE_LOG` always wins.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
