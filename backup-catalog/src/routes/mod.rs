pub mod files;
pub mod health;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/files", files::router(state.clone()))
        .nest("/api/files", files::router(state.clone()))
        .route("/health", get(health::health))
        .route("/version", get(health::version))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
