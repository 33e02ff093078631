//! Tracing/logging initialization.
//!
//! `RUST_LOG` (standard `EnvFilter` syntax) selects per-module levels
//! independent of `NODE_ENV`/`BUN_ENV`, which instead gate the
//! development-vs-production error rendering in [`crate::error`].

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::Result;

/// Initializes the global `tracing` subscriber. Development mode gets
/// human-readable output; production gets one-JSON-object-per-line, which
/// is what a log aggregator expects.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(environment = %config.environment, "tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic() {
        let config = Config::default();
        let _ = init_tracing(&config);
    }
}
