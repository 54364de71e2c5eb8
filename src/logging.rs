use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::AppError;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "gh_bridge=info";

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("gh_bridge=debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the global subscriber, writing to stderr so stdout stays free
/// for command output.
///
/// The level is controlled via `RUST_LOG`, e.g. `RUST_LOG=gh_bridge=debug`.
/// `verbose` forces debug regardless of the environment.
pub fn init(verbose: bool) -> Result<(), AppError> {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| AppError::Config {
            message: format!("Failed to initialize tracing subscriber: {e}"),
        })
}
