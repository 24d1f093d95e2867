use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::inventory::{format_timestamp, parse_timestamp};
use crate::models::*;

// ═══════════════════════════════════════════
// Inventory Repository
// ═══════════════════════════════════════════

pub fn insert_item(conn: &Connection, id: &Uuid, item: &InventoryItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO inventory_items (id, name, image_url, image_file_id, date_placed,
         expiration_date, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id.to_string(),
            item.name.to_string(),
            item.image.as_ref().map(|i| i.url()),
            item.image.as_ref().map(|i| i.file_id()),
            format_timestamp(&item.date_placed),
            format_timestamp(&item.expiration_date),
            item.status.as_str(),
        ],
    )?;
    Ok(())
}

/// Items matching the filter, oldest first.
pub fn query_items(conn: &Connection, filter: &InventoryFilter) -> Result<Vec<StoredItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, image_url, image_file_id, date_placed, expiration_date, status
         FROM inventory_items
         WHERE (?1 IS NULL OR name = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY seq ASC",
    )?;

    let rows = stmt.query_map(
        params![filter.name, filter.status.map(|s| s.as_str())],
        read_row,
    )?;

    let mut items = Vec::new();
    for row in rows {
        items.push(item_from_row(row?)?);
    }
    Ok(items)
}

pub fn get_item(conn: &Connection, id: &str) -> Result<Option<StoredItem>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, image_url, image_file_id, date_placed, expiration_date, status
             FROM inventory_items WHERE id = ?1",
            params![id],
            read_row,
        )
        .optional()?;

    row.map(item_from_row).transpose()
}

pub fn update_item_status(
    conn: &Connection,
    id: &str,
    status: ItemStatus,
) -> Result<StoredItem, DatabaseError> {
    let changed = conn.execute(
        "UPDATE inventory_items SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "inventory_item".into(),
            id: id.into(),
        });
    }
    get_item(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "inventory_item".into(),
        id: id.into(),
    })
}

type ItemRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn item_from_row(row: ItemRow) -> Result<StoredItem, DatabaseError> {
    let (id, name, image_url, image_file_id, date_placed, expiration_date, status) = row;

    let image = match (image_url, image_file_id) {
        (None, None) => None,
        (Some(url), Some(file_id)) => Some(PhotoRef::new(url, file_id).ok_or_else(|| {
            DatabaseError::ConstraintViolation(format!("item {id}: empty image reference"))
        })?),
        _ => {
            return Err(DatabaseError::ConstraintViolation(format!(
                "item {id}: image url and file id must be set together"
            )))
        }
    };

    Ok(StoredItem {
        item: InventoryItem {
            name: Label::from_str(&name)?,
            image,
            date_placed: parse_timestamp(&date_placed)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            expiration_date: parse_timestamp(&expiration_date)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            status: ItemStatus::from_str(&status)?,
        },
        id,
    })
}
