use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable that overrides the `-v` derived filter
pub const LOG_ENV: &str = "DBOPS_LOG";

/// Filter directive for a `-v` count
#[must_use]
pub fn directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("{}={level}", env!("CARGO_PKG_NAME"))
}

/// Install the stderr subscriber
///
/// # Errors
///
/// Returns an error if `DBOPS_LOG` is not a valid filter or a global
/// subscriber is already set
pub fn init(verbosity: u8) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(&directives).map_err(|e| anyhow!("invalid {LOG_ENV} '{directives}': {e}"))?
        }
        _ => EnvFilter::new(directive(verbosity)),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
