use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::{field_errors, FieldError};
use crate::services::menu_sync::SaveStage;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid data format: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("No tags provided for the dish.")]
    NoDishTags,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A multi-step menu save failed; earlier stages may already be applied.
    #[error("Menu save failed during {stage}: {message}")]
    SaveFailed { stage: SaveStage, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(field_errors(&errors))
    }
}

fn summarize(issues: &[FieldError]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Validation(issues) = &self {
            let body = Json(json!({
                "error": self.to_string(),
                "issues": issues,
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NoDishTags => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Storage(_)
            | AppError::SaveFailed { .. }
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
