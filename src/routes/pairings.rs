use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::AppResult, services::TopPairings, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PairingRequest {
    #[serde(default)]
    tags: Vec<String>,
}

/// Best in-stock wine per price tier for a dish's tags
pub async fn top_for_dish(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
    Json(request): Json<PairingRequest>,
) -> AppResult<Json<TopPairings>> {
    let top = state
        .pairings
        .top_pairings_for_dish(&tenant_id, &request.tags)
        .await?;
    Ok(Json(top))
}
