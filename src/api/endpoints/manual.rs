//! `POST /api/manual-add`: echo a hand-entered item. Nothing is stored.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::SuccessResponse;
use crate::models::ManualEntry;
use crate::pipeline::manual_add;

#[derive(Debug, Deserialize)]
pub struct ManualAddRequest {
    pub label: String,
}

pub async fn add(
    payload: Result<Json<ManualAddRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<ManualEntry>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let entry = manual_add(&request.label);
    Ok(Json(SuccessResponse::new(
        format!("Manually added {}", request.label),
        entry,
    )))
}
