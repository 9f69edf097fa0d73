//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use charge_types::Ledger;

use super::handlers::{self, AppState};
use crate::ChargeService;

/// HTTP Server for the charge API.
pub struct HttpServer<L: Ledger> {
    state: Arc<AppState<L>>,
}

impl<L: Ledger> HttpServer<L> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: ChargeService<L>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    pub fn service(&self) -> &ChargeService<L> {
        &self.state.service
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(handlers::health))
            .route("/readyz", get(handlers::ready::<L>))
            .route("/metrics", get(handlers::metrics::<L>))
            .route("/api/charge", post(handlers::charge::<L>))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
