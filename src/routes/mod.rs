use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    state::AppState,
};

pub mod access;
pub mod menu;
pub mod pairings;
pub mod revalidate;
pub mod tags;
pub mod tenants;
pub mod wines;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/revalidate", get(revalidate::revalidate))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/access", post(access::enter))
        .route("/tags", get(tags::list).post(tags::create))
        .route("/tags/:tag_id", patch(tags::rename))
        .route("/tenants", post(tenants::create))
        .route("/tenants/:tenant_id/menu", get(menu::load).put(menu::save))
        .route("/tenants/:tenant_id/menu/auto-pair", post(menu::auto_pair))
        .route("/tenants/:tenant_id/wines", get(wines::list).post(wines::save))
        .route("/tenants/:tenant_id/wines/:wine_id", delete(wines::remove))
        .route("/tenants/:tenant_id/pairings", post(pairings::top_for_dish))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(Arc::new(AppState::in_memory(Arc::new(MemoryStore::new()))))
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_echoed() {
        let id = "6f1c0b0e-6a43-4a4e-9e59-0d7b3b0e3a11";
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", id)
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], id);
    }

    #[tokio::test]
    async fn test_malformed_request_id_is_replaced() {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let echoed = response.headers()["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(echoed).is_ok());
    }
}
