//! Inventory stores: SQLite for the service, in-memory for tests.

#[cfg(test)]
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use uuid::Uuid;

#[cfg(test)]
use super::mock::MockFailure;
use super::types::InventoryStore;
use super::StoreError;
use crate::db::{self, DatabaseError};
use crate::models::{InventoryFilter, InventoryItem, ItemStatus, StoredItem};

// ═══════════════════════════════════════════════════════════
// SQLite
// ═══════════════════════════════════════════════════════════

pub struct SqliteInventoryStore {
    conn: Mutex<Connection>,
}

impl SqliteInventoryStore {
    /// Open (and migrate) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".into()))?;
        Ok(f(&conn)?)
    }
}

impl InventoryStore for SqliteInventoryStore {
    fn insert(&self, item: &InventoryItem) -> Result<StoredItem, StoreError> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| db::insert_item(conn, &id, item))?;
        Ok(StoredItem {
            id: id.to_string(),
            item: item.clone(),
        })
    }

    fn query(&self, filter: &InventoryFilter) -> Result<Vec<StoredItem>, StoreError> {
        self.with_conn(|conn| db::query_items(conn, filter))
    }

    fn update_status(&self, id: &str, status: ItemStatus) -> Result<StoredItem, StoreError> {
        self.with_conn(|conn| db::update_item_status(conn, id, status))
            .map_err(|e| match e {
                StoreError::Database(DatabaseError::NotFound { id, .. }) => StoreError::NotFound(id),
                other => other,
            })
    }
}

// ═══════════════════════════════════════════════════════════
// In-memory
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
#[derive(Default)]
struct MemoryState {
    items: Vec<StoredItem>,
    insert_calls: usize,
    insert_failures: VecDeque<MockFailure>,
}

/// Vec-backed store that counts insert attempts and can be scripted to fail.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryInventoryStore {
    state: Mutex<MemoryState>,
}

#[cfg(test)]
impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue failures for the next inserts, consumed in order.
    pub fn fail_inserts(self, failures: impl IntoIterator<Item = MockFailure>) -> Self {
        self.with_state(|s| s.insert_failures.extend(failures));
        self
    }

    /// Every call to `insert`, successful or not.
    pub fn insert_calls(&self) -> usize {
        self.with_state(|s| s.insert_calls)
    }

    pub fn len(&self) -> usize {
        self.with_state(|s| s.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[cfg(test)]
impl InventoryStore for MemoryInventoryStore {
    fn insert(&self, item: &InventoryItem) -> Result<StoredItem, StoreError> {
        self.with_state(|s| {
            s.insert_calls += 1;
            if let Some(failure) = s.insert_failures.pop_front() {
                return Err(match failure {
                    MockFailure::Unavailable => StoreError::Unavailable("insert unavailable".into()),
                    MockFailure::Rejected => {
                        StoreError::Database(DatabaseError::ConstraintViolation("insert rejected".into()))
                    }
                });
            }
            let stored = StoredItem {
                id: Uuid::new_v4().to_string(),
                item: item.clone(),
            };
            s.items.push(stored.clone());
            Ok(stored)
        })
    }

    fn query(&self, filter: &InventoryFilter) -> Result<Vec<StoredItem>, StoreError> {
        Ok(self.with_state(|s| {
            s.items
                .iter()
                .filter(|stored| filter.matches(&stored.item))
                .cloned()
                .collect()
        }))
    }

    fn update_status(&self, id: &str, status: ItemStatus) -> Result<StoredItem, StoreError> {
        self.with_state(|s| {
            let stored = s
                .items
                .iter_mut()
                .find(|stored| stored.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            stored.item.status = status;
            Ok(stored.clone())
        })
    }
}
