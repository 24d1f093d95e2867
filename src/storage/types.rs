use super::StoreError;
use crate::models::{InventoryFilter, InventoryItem, ItemStatus, StoredItem};

/// A photo accepted by a `PhotoStore`, not yet shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoHandle {
    pub file_id: String,
    pub name: String,
}

/// Object storage for scanned photos.
pub trait PhotoStore: Send + Sync {
    /// Store JPEG bytes under `file_name`.
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<PhotoHandle, StoreError>;

    /// Grant public read access and return the sharable URL.
    fn make_public(&self, handle: &PhotoHandle) -> Result<String, StoreError>;
}

/// Document store holding inventory records.
pub trait InventoryStore: Send + Sync {
    /// Persist a record and return it with its store-assigned id.
    fn insert(&self, item: &InventoryItem) -> Result<StoredItem, StoreError>;

    /// Records matching `filter`, in insertion order.
    fn query(&self, filter: &InventoryFilter) -> Result<Vec<StoredItem>, StoreError>;

    fn update_status(&self, id: &str, status: ItemStatus) -> Result<StoredItem, StoreError>;
}

/// Bearer token for an authenticated collaborator.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Source of a currently valid credential. Refresh, if any, happens inside.
pub trait CredentialProvider: Send + Sync {
    fn valid_credential(&self) -> Result<Credential, StoreError>;
}
