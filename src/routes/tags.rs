use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::AppResult, models::Tag, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RenameTag {
    name: String,
}

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Tag>>> {
    let tags = state.inventory.list_tags().await?;
    Ok(Json(tags))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(tag): Json<Tag>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let created = state.inventory.create_tag(tag).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn rename(
    State(state): State<Arc<AppState>>,
    Path(tag_id): Path<String>,
    Json(body): Json<RenameTag>,
) -> AppResult<Json<Tag>> {
    let tag = state.inventory.rename_tag(&tag_id, &body.name).await?;
    Ok(Json(tag))
}
