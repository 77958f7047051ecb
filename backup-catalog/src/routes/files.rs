use crate::error::CatalogError;
use crate::models::Tier;
use crate::services::catalog;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

pub fn router(_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new().route("/{tier}", get(get_catalog))
}

/// Lists every archive of one tier, newest first.
async fn get_catalog(
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
) -> Result<Response, CatalogError> {
    let tier: Tier = tier.parse()?;
    let dir = state.scanner.tier_dir(tier)?;

    tracing::debug!(tier = %tier, path = %dir.display(), "Listing tier");
    let records = state.scanner.scan_tier(&dir).await?;
    let listing = catalog::assemble(records);

    Ok(Json(listing.render(state.config.layout)).into_response())
}
