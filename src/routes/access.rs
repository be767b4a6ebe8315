use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult, middleware::RequestId, services::AccessGrant, state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    #[serde(default)]
    code: String,
}

/// Opens a tenant's menu with its access code
pub async fn enter(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<AccessRequest>,
) -> AppResult<Json<AccessGrant>> {
    let grant = state.menus.open_by_access_code(&request.code).await?;

    tracing::info!(
        request_id = %request_id,
        tenant_id = %grant.tenant_id,
        dishes = grant.data.dish_count(),
        "Access granted"
    );

    Ok(Json(grant))
}
