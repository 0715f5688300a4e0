use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

/// Read-only JSON surface over the content store.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/content", get(handlers::list_content))
        .route("/api/content/by-link", get(handlers::get_by_link))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving content API");
    axum::serve(listener, create_app(state)).await
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use harvest_core::{ContentRecord, Error, Result};
}
