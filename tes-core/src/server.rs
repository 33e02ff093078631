//! HTTP server: middleware stack assembly and graceful shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    error::Result,
    headers::response_headers_layer,
    middleware::{request_id_layer, request_id_propagation_layer, sensitive_headers_layer},
    state::AppState,
};

const REQUEST_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Owns the listen configuration and the worker pool this process spawned;
/// `serve` installs the full middleware stack and blocks until a shutdown
/// signal arrives.
pub struct Server {
    config: Config,
}

impl Server {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn serve(self, app: Router, state: AppState) -> Result<()> {
        let host: std::net::IpAddr = self.config.hostname.parse().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        let addr = SocketAddr::from((host, self.config.port));

        tracing::info!(%addr, "starting server");

        let app = app
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                axum::http::StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(self.config.idle_timeout_secs),
            ))
            .layer(RequestBodyLimitLayer::new(REQUEST_BODY_LIMIT_BYTES))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(sensitive_headers_layer())
            .layer(request_id_propagation_layer())
            .layer(request_id_layer())
            .layer(axum::middleware::from_fn(response_headers_layer))
            .layer(CatchPanicLayer::new());

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(%addr, "server listening");

        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal(state))
            .await?;

        tracing::info!("server shutdown complete");
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Waits for SIGTERM/SIGINT, then runs the LIFO teardown stack: stop
/// accepting connections (handled by `axum::serve` itself once this future
/// resolves) and terminate every worker this process spawned.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, starting graceful shutdown"),
    }

    tracing::info!("terminating worker pool");
    state.worker_pool.terminate_all().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_exposes_its_config() {
        let config = Config::default();
        let server = Server::new(config.clone());
        assert_eq!(server.config().port, config.port);
    }
}
