//! External collaborators of the scan workflow: photo storage, inventory
//! storage and the credential source the photo store authenticates with.
//!
//! Each collaborator is a trait with a production implementation and, in
//! test builds, a recording double next to it.

pub mod credentials;
pub mod drive;
pub mod inventory;
pub mod local;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use credentials::{StaticCredentials, TokenFileCredentials};
pub use drive::DrivePhotoStore;
#[cfg(test)]
pub use inventory::MemoryInventoryStore;
pub use inventory::SqliteInventoryStore;
pub use local::LocalPhotoStore;
#[cfg(test)]
pub use mock::{MockFailure, MockPhotoStore};
pub use types::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Cannot connect to {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    ResponseParsing(String),

    #[error("Response is missing {0}")]
    MissingField(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Simulated or otherwise temporary outage.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Worth another attempt: the same request may succeed a moment later.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connection(_) | StoreError::Timeout(_) | StoreError::Unavailable(_) => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::Database(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _))) => {
                matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
            }
            _ => false,
        }
    }

    /// Map a transport error the way every HTTP-backed store reports it.
    pub(crate) fn from_reqwest(e: reqwest::Error, endpoint: &str, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            StoreError::Timeout(timeout_secs)
        } else if e.is_connect() {
            StoreError::Connection(endpoint.to_string())
        } else {
            StoreError::Http(e.to_string())
        }
    }
}
