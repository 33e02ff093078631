//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (names are irregular by field — see each field's
//!    own doc comment below)
//! 2. Current working directory: `./config.toml`
//! 3. Compiled-in defaults
//!
//! Handlers never see this module: by the time a request is dispatched,
//! configuration is an immutable, already-typed `Config` held by `AppState`,
//! an opaque key/value map produced once at startup from the handlers'
//! point of view.

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_dev_token() -> String {
    "dev-token-default".to_string()
}

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3002
}

fn default_idle_timeout_secs() -> u64 {
    120
}

fn default_shadow_ws_port() -> u16 {
    3003
}

fn default_worker_api_port() -> u16 {
    3000
}

fn default_spline_api_port() -> u16 {
    3001
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_worker_api_check_timeout_ms() -> u64 {
    500
}

fn default_initial_worker_count() -> usize {
    4
}

fn default_presets_dir() -> String {
    "presets".to_string()
}

/// Process-wide startup configuration. Every environment variable this
/// service reads at startup is a typed field here, with its documented
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `TES_DEV_TOKEN` — required bearer value for `/api/dev/workers/*` and
    /// `/api/workers/*`. Default `"dev-token-default"`.
    #[serde(default = "default_dev_token")]
    pub dev_token: String,

    /// `HOSTNAME` — interface to bind. Default `0.0.0.0`.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Resolved listen port: `--port` CLI flag > `BUN_PORT` > `PORT` >
    /// `NODE_PORT` > default `3002`. A value of `0` means "pick a random
    /// free port" and is passed through unchanged to the listener.
    #[serde(default = "default_port")]
    pub port: u16,

    /// `IDLE_TIMEOUT` seconds. Default `120`.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// `NODE_ENV`/`BUN_ENV`. `"production"` disables HMR/detailed error
    /// pages. Default `"development"`.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// `SHADOW_WS_PORT`. Default `3003`.
    #[serde(default = "default_shadow_ws_port")]
    pub shadow_ws_port: u16,

    /// `WORKER_API_PORT` — local port of the sibling telemetry service
    /// consulted by the worker registry lookup order. Default `3000`.
    #[serde(default = "default_worker_api_port")]
    pub worker_api_port: u16,

    /// `SPLINE_API_PORT`. `3001` is used as a default distinct from the
    /// other two fixed ports.
    #[serde(default = "default_spline_api_port")]
    pub spline_api_port: u16,

    /// `LOG_REQUESTS` — when true, every request is logged at `info` in
    /// addition to the structured span tracing already emits.
    #[serde(default)]
    pub log_requests: bool,

    /// `TES_PRIMARY_REGION` — informational, surfaced in `/api/dev/status`.
    #[serde(default)]
    pub primary_region: Option<String>,

    /// `TES_API_DOMAIN` — value used to populate the `X-API-Domain` response
    /// header.
    #[serde(default)]
    pub api_domain: Option<String>,

    /// Timeout for the sibling telemetry-service HTTP probe
    /// (`WORKER_API_CHECK_TIMEOUT`), in milliseconds.
    #[serde(default = "default_worker_api_check_timeout_ms")]
    pub worker_api_check_timeout_ms: u64,

    /// Number of workers spawned by `initializeWorkerPool` at startup.
    #[serde(default = "default_initial_worker_count")]
    pub initial_worker_count: usize,

    /// `TES_PRESETS_DIR` — directory `POST /api/spline/preset/store` writes
    /// `<name>.yaml` files to, and that `AppState` loads existing presets
    /// back from at startup. Default `"presets"`.
    #[serde(default = "default_presets_dir")]
    pub presets_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dev_token: default_dev_token(),
            hostname: default_hostname(),
            port: default_port(),
            idle_timeout_secs: default_idle_timeout_secs(),
            environment: default_environment(),
            shadow_ws_port: default_shadow_ws_port(),
            worker_api_port: default_worker_api_port(),
            spline_api_port: default_spline_api_port(),
            log_requests: false,
            primary_region: None,
            api_domain: None,
            worker_api_check_timeout_ms: default_worker_api_check_timeout_ms(),
            initial_worker_count: default_initial_worker_count(),
            presets_dir: default_presets_dir(),
        }
    }
}

impl Config {
    /// Is `environment` the production environment (`NODE_ENV`/`BUN_ENV ==
    /// "production"`)? Gates detailed error pages and HMR-adjacent dev
    /// conveniences.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn worker_api_check_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.worker_api_check_timeout_ms)
    }

    /// Load configuration from `./config.toml` (if present), environment
    /// variables, and an optional CLI `--port` override, in that increasing
    /// order of precedence.
    ///
    /// The environment variables this service reads do not share a common
    /// prefix (`TES_DEV_TOKEN`, `BUN_PORT`, `HOSTNAME`, ...), so rather than
    /// a single `Env::prefixed(...)` provider this resolves each variable by
    /// its own documented name/priority chain and feeds the result back into
    /// the `Figment` stack as the final, highest-priority layer — keeping
    /// figment as the actual merge engine while preserving the irregular
    /// startup contract.
    pub fn load(cli_port: Option<u16>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let config_path = std::path::Path::new("config.toml");
        if config_path.exists() {
            tracing::info!(path = %config_path.display(), "loading configuration file");
            figment = figment.merge(Toml::file(config_path));
        }

        let env_overrides = EnvOverrides::from_process_env(cli_port);
        figment = figment.merge(Serialized::defaults(env_overrides));

        let config: Config = figment.extract()?;
        Ok(config)
    }
}

/// Partial view of [`Config`] populated strictly from environment variables
/// (plus an optional CLI `--port`), applying each field's documented
/// priority chain. Only fields actually present in the environment are
/// `Some`, so merging this on top of the base `Figment` stack never
/// clobbers a `config.toml`-provided value with a default.
#[derive(Debug, Default, Serialize)]
struct EnvOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    dev_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    idle_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shadow_ws_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    worker_api_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spline_api_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_requests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presets_dir: Option<String>,
}

impl EnvOverrides {
    fn from_process_env(cli_port: Option<u16>) -> Self {
        Self {
            dev_token: env_string("TES_DEV_TOKEN"),
            hostname: env_string("HOSTNAME"),
            port: cli_port
                .or_else(|| env_parsed("BUN_PORT"))
                .or_else(|| env_parsed("PORT"))
                .or_else(|| env_parsed("NODE_PORT")),
            idle_timeout_secs: env_parsed("IDLE_TIMEOUT"),
            environment: env_string("NODE_ENV").or_else(|| env_string("BUN_ENV")),
            shadow_ws_port: env_parsed("SHADOW_WS_PORT"),
            worker_api_port: env_parsed("WORKER_API_PORT"),
            spline_api_port: env_parsed("SPLINE_API_PORT"),
            log_requests: env_parsed("LOG_REQUESTS"),
            primary_region: env_string("TES_PRIMARY_REGION"),
            api_domain: env_string("TES_API_DOMAIN"),
            presets_dir: env_string("TES_PRESETS_DIR"),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_contract() {
        let config = Config::default();
        assert_eq!(config.dev_token, "dev-token-default");
        assert_eq!(config.hostname, "0.0.0.0");
        assert_eq!(config.port, 3002);
        assert_eq!(config.idle_timeout_secs, 120);
        assert!(!config.is_production());
    }

    #[test]
    fn cli_port_wins_over_env_port_priority_chain() {
        let overrides = EnvOverrides::from_process_env(Some(9999));
        assert_eq!(overrides.port, Some(9999));
    }

    #[test]
    fn production_environment_is_case_insensitive() {
        let mut config = Config::default();
        config.environment = "PRODUCTION".to_string();
        assert!(config.is_production());
    }
}
