//! HTTP server setup and management

use axum::{
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use super::handlers::{AppState, ai_response, health, index, sensors};

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/v1/sensors", get(sensors))
        .route("/api/v1/ai_response", get(ai_response))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled
pub async fn start(listen_addr: &str, state: AppState, shutdown: CancellationToken) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("HTTP API listening on http://{}/api/v1/sensors", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
