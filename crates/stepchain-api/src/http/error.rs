//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stepchain_types::error::RepositoryError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Workflow definition not found.
    WorkflowNotFound,
    /// Workflow run not found.
    RunNotFound,
    /// Request body failed validation.
    Validation(String),
    /// No model backend configured on this server.
    ModelBackendUnconfigured,
    /// Storage failure.
    Repository(RepositoryError),
    /// Generic internal error.
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => AppError::WorkflowNotFound,
            other => AppError::Repository(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::WorkflowNotFound => (
                StatusCode::NOT_FOUND,
                "WORKFLOW_NOT_FOUND",
                "Workflow not found".to_string(),
            ),
            AppError::RunNotFound => (
                StatusCode::NOT_FOUND,
                "RUN_NOT_FOUND",
                "Run not found".to_string(),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::ModelBackendUnconfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODEL_BACKEND_UNCONFIGURED",
                "No model backend configured; set STEPCHAIN_API_KEY".to_string(),
            ),
            AppError::Repository(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                e.to_string(),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
