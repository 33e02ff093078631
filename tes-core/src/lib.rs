//! # tes-core
//!
//! Developer-facing control plane: a single-process HTTP/WebSocket server
//! that aggregates live telemetry about itself and a fleet of worker
//! processes, routes typed requests to static, file-backed, and
//! computational endpoints with admission control, and orchestrates the
//! lifecycle of the worker processes those endpoints depend on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tes_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load(None)?;
//!     init_tracing(&config)?;
//!     headers::init_api_metadata(&config);
//!
//!     let state = AppState::builder().config(config.clone()).build();
//!     let app = routes::build_router(state.clone());
//!
//!     Server::new(config).serve(app, state).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod csrf;
pub mod endpoints;
pub mod entity_versions;
pub mod error;
pub mod etag;
pub mod event_loop;
pub mod headers;
pub mod ids;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod presets;
pub mod routes;
pub mod server;
pub mod spline;
pub mod state;
pub mod static_files;
pub mod validation;
pub mod warmup;
pub mod websocket;
pub mod workers;

/// Convenient single-import surface for the binary entrypoint and tests.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::headers;
    pub use crate::ids::{MakeTypedRequestId, RequestId, RequestIdError};
    pub use crate::observability::init_tracing;
    pub use crate::routes;
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder};

    pub use axum::{
        extract::{ConnectInfo, Path, Query, State},
        http::{HeaderMap, HeaderValue, StatusCode},
        response::{IntoResponse, Json, Response},
        routing::{get, post},
        Router,
    };

    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, warn};
    pub use tokio;
}
