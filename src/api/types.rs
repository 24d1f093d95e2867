//! Shared types for the API layer.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{PhotoBackend, ServiceConfig};
use crate::core_state::ServiceContext;

// ═══════════════════════════════════════════════════════════
// API context: shared state for every route
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<ServiceContext>,
    /// Largest accepted photo, checked after the multipart body is read.
    pub max_upload_bytes: usize,
}

impl ApiContext {
    pub fn new(core: Arc<ServiceContext>, max_upload_bytes: usize) -> Self {
        Self {
            core,
            max_upload_bytes,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// HTTP settings
// ═══════════════════════════════════════════════════════════

/// Transport-level settings, separate from the service state.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
    /// Directory published under `/uploads` (local photo backend only).
    pub photo_dir: Option<PathBuf>,
}

impl HttpSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            cors_origins: config.cors_origin_list(),
            max_upload_bytes: config.max_upload_bytes,
            photo_dir: (config.photo_backend == PhotoBackend::Local)
                .then(|| config.upload_dir.clone()),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            cors_origins: vec!["http://localhost:3000".into()],
            max_upload_bytes: 10 * 1024 * 1024,
            photo_dir: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Success envelope
// ═══════════════════════════════════════════════════════════

/// `{status: "success", message, item}` returned by the write endpoints.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub item: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(message: String, item: T) -> Self {
        Self {
            status: "success",
            message,
            item,
        }
    }
}
