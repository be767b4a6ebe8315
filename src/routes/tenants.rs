use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{NewTenant, Tenant},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenant {
    id: String,
    name: String,
    access_code: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTenant>,
) -> AppResult<(StatusCode, Json<Tenant>)> {
    let tenant = state
        .menus
        .create_tenant(NewTenant {
            id: body.id,
            name: body.name,
            access_code: body.access_code,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}
