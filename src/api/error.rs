//! API error types with flat JSON bodies: `{"error": <message>, "code": <CODE>}`.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::{ScanError, ScanStep};
use crate::storage::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file part")]
    NoFilePart,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("Upload exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn from_multipart(err: MultipartError, limit: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(limit)
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NoFilePart => (
                StatusCode::BAD_REQUEST,
                "NO_FILE_PART",
                "No file part".to_string(),
            ),
            ApiError::NoSelectedFile => (
                StatusCode::BAD_REQUEST,
                "NO_SELECTED_FILE",
                "No selected file".to_string(),
            ),
            ApiError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("File exceeds the {limit} byte limit"),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::Scan(err) => {
                tracing::error!(step = %err.step, error = %err.source, "Scan request failed");
                let (code, message) = match err.step {
                    ScanStep::Upload => ("UPLOAD_FAILED", "Failed to upload image"),
                    ScanStep::Permission => ("PERMISSION_FAILED", "Failed to generate public link"),
                    ScanStep::Persist => ("PERSIST_FAILED", "Failed to save inventory record"),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, code, message.to_string())
            }
            ApiError::NotFound(detail) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message, code })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Inventory item {id} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}
