use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{error::AppResult, models::Wine, state::AppState};

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> AppResult<Json<Vec<Wine>>> {
    let wines = state.inventory.list_wines(&tenant_id).await?;
    Ok(Json(wines))
}

/// Creates a wine, or updates it when the body carries an id
pub async fn save(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
    Json(wine): Json<Wine>,
) -> AppResult<Json<Wine>> {
    let saved = state.inventory.save_wine(&tenant_id, wine).await?;
    Ok(Json(saved))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, wine_id)): Path<(String, Uuid)>,
) -> AppResult<StatusCode> {
    state.inventory.delete_wine(&tenant_id, wine_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
