//! Inventory reads and status transitions.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{InventoryFilter, ItemStatus, StoredItem};
use crate::pipeline::list_inventory;

/// `GET /api/inventory?name=&status=`
pub async fn list(
    State(ctx): State<ApiContext>,
    filter: Result<Query<InventoryFilter>, QueryRejection>,
) -> Result<Json<Vec<StoredItem>>, ApiError> {
    let Query(filter) = filter.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let store = ctx.core.inventory();
    let items = tokio::task::spawn_blocking(move || list_inventory(store.as_ref(), &filter)).await??;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ItemStatus,
}

/// `POST /api/inventory/:id/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<StoredItem>, ApiError> {
    let Json(update) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let store = ctx.core.inventory();
    let item = tokio::task::spawn_blocking(move || store.update_status(&id, update.status)).await??;
    tracing::info!(id = %item.id, status = %item.item.status, "Inventory status updated");
    Ok(Json(item))
}
