//! `POST /api/scan`: multipart photo upload → classified, stored item.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, SuccessResponse};
use crate::models::StoredItem;

/// The photo travels in the `file` form field.
const FILE_FIELD: &str = "file";

struct UploadedPhoto {
    file_name: String,
    bytes: Vec<u8>,
}

pub async fn scan(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SuccessResponse<StoredItem>>, ApiError> {
    let limit = ctx.max_upload_bytes;

    // Not a multipart body at all: there is no `file` part to find.
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e.body_text(), "Scan request is not multipart");
        ApiError::NoFilePart
    })?;

    let mut photo: Option<UploadedPhoto> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::from_multipart(e, limit))?;
        photo = Some(UploadedPhoto {
            file_name,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let photo = photo.ok_or(ApiError::NoFilePart)?;
    if photo.file_name.is_empty() || photo.bytes.is_empty() {
        return Err(ApiError::NoSelectedFile);
    }
    if photo.bytes.len() > limit {
        return Err(ApiError::PayloadTooLarge(limit));
    }

    tracing::debug!(file_name = %photo.file_name, bytes = photo.bytes.len(), "Scan upload received");

    let workflow = ctx.core.scan_workflow();
    let outcome = tokio::task::spawn_blocking(move || workflow.run(&photo.bytes)).await??;

    let label = outcome.item.item.name;
    Ok(Json(SuccessResponse::new(
        format!("Successfully added {label}"),
        outcome.item,
    )))
}
