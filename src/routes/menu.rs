use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::RestaurantMenu,
    services::{AutoPairSummary, SaveReport},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    success: bool,
    report: SaveReport,
}

#[derive(Debug, Serialize)]
pub struct AutoPairResponse {
    summary: AutoPairSummary,
    menu: RestaurantMenu,
}

pub async fn load(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> AppResult<Json<RestaurantMenu>> {
    let menu = state.menus.load_menu(&tenant_id).await?;
    Ok(Json(menu))
}

/// Replaces the tenant's menu with the submitted document.
///
/// The body is taken as raw JSON so every schema problem is reported
/// together instead of failing on the first one.
pub async fn save(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(tenant_id): Path<String>,
    Json(document): Json<Value>,
) -> AppResult<Json<SaveResponse>> {
    tracing::info!(request_id = %request_id, tenant_id = %tenant_id, "Processing menu save");

    let report = state.menus.save_menu(&tenant_id, &document).await?;
    Ok(Json(SaveResponse {
        success: true,
        report,
    }))
}

/// Fills every tagged dish with the best wine per tier and saves the menu
pub async fn auto_pair(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(tenant_id): Path<String>,
) -> AppResult<Json<AutoPairResponse>> {
    tracing::info!(request_id = %request_id, tenant_id = %tenant_id, "Auto-pairing menu");

    let (menu, summary) = state.menus.auto_pair(&tenant_id, &state.pairings).await?;
    Ok(Json(AutoPairResponse { summary, menu }))
}
