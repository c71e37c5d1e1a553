//! Axum server setup and router configuration.

use crate::api::webhooks;
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        // Health check endpoint
        .route("/health", get(health_check))
        .nest("/webhook", webhooks::router())
        // Add state to all routes
        .with_state(state)
}

#[derive(Serialize)]
struct IndexResponse {
    service: &'static str,
    version: &'static str,
    endpoints: &'static [&'static str],
}

/// Service description.
async fn index() -> impl IntoResponse {
    Json(IndexResponse {
        service: "hookrelay",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: &[
            "GET /health",
            "POST /webhook/git",
            "POST /webhook/generic",
            "POST /webhook/rss",
            "POST /webhook/netlify",
        ],
    })
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}
