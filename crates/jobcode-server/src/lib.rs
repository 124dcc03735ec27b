pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use jobcode_core::reconcile::EventSink;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the axum Router for the webhook receiver.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(sink: Arc<dyn EventSink>) -> Router {
    let app_state = state::AppState::new(sink);

    Router::new()
        .route("/", post(routes::webhook::receive))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Bind `addr` and serve webhooks until the future is dropped.
pub async fn serve(sink: Arc<dyn EventSink>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(sink, listener).await
}

/// Serve on a pre-bound listener so the caller can read the actual port
/// first (useful when binding port 0).
pub async fn serve_on(
    sink: Arc<dyn EventSink>,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(sink);

    tracing::info!("jobcode webhook receiver listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
