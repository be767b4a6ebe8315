use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    services::{CacheScope, CacheTag},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RevalidateQuery {
    tag: Option<String>,
    tenant: Option<String>,
    secret: Option<String>,
}

/// Drops local cache entries on behalf of an external writer.
///
/// Rejected outright when no secret is configured.
pub async fn revalidate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RevalidateQuery>,
) -> AppResult<Json<Value>> {
    let authorized = match (&state.revalidate_secret, &query.secret) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    };
    if !authorized {
        return Err(AppError::Unauthorized("Invalid secret".to_string()));
    }

    let tag = query
        .tag
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("Missing tag param".to_string()))?;
    let tag = CacheTag::parse(tag)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown tag '{}'", tag)))?;

    let scope = match tag {
        CacheTag::Menu => {
            let tenant = query.tenant.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
                AppError::InvalidInput("Missing tenant param for menu tag".to_string())
            })?;
            CacheScope::menu(tenant)
        }
        CacheTag::Tags => CacheScope::tags(),
    };

    state.local_cache.invalidate(&scope).await?;
    tracing::info!(scope = %scope, "Cache revalidated on request");

    Ok(Json(json!({
        "revalidated": true,
        "scope": scope.to_string(),
        "now": Utc::now().timestamp_millis(),
    })))
}
