use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Application-level constants
pub const APP_NAME: &str = "Fridge Scan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "fridge_scan=info"
}

/// Where scanned photos are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhotoBackend {
    /// Files written to `upload_dir`, served from `public_base_url`.
    Local,
    /// Google Drive folder, shared as `anyone/reader`.
    Drive,
}

/// Service configuration. Every value can come from a flag or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "fridge-scan", version, about = "Fridge inventory scan service")]
pub struct ServiceConfig {
    /// Address the HTTP API binds to.
    #[arg(long, env = "FRIDGE_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// SQLite inventory database.
    #[arg(long, env = "FRIDGE_DB_PATH", default_value = "./fridge.db")]
    pub db_path: PathBuf,

    /// Trained classifier weights (SafeTensors state dict).
    #[arg(
        long,
        env = "FRIDGE_MODEL_PATH",
        default_value = "../model/fridge_model.safetensors"
    )]
    pub model_path: PathBuf,

    #[arg(long, env = "FRIDGE_PHOTO_BACKEND", value_enum, default_value = "local")]
    pub photo_backend: PhotoBackend,

    /// Directory for the local photo backend.
    #[arg(long, env = "FRIDGE_UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// URL prefix under which the local upload directory is published.
    #[arg(
        long,
        env = "FRIDGE_PUBLIC_BASE_URL",
        default_value = "http://127.0.0.1:5000/uploads"
    )]
    pub public_base_url: String,

    /// Destination folder for the Drive backend.
    #[arg(long, env = "DRIVE_FOLDER_ID")]
    pub drive_folder_id: Option<String>,

    /// Authorized-user token file for the Drive backend.
    #[arg(long, env = "DRIVE_TOKEN_PATH", default_value = "token.json")]
    pub drive_token_path: PathBuf,

    /// Comma-separated list of allowed CORS origins.
    #[arg(long, env = "FRIDGE_CORS_ORIGINS", default_value = "http://localhost:3000")]
    pub cors_origins: String,

    /// Timeout applied to each external I/O call.
    #[arg(long, env = "FRIDGE_IO_TIMEOUT_SECS", default_value_t = 30)]
    pub io_timeout_secs: u64,

    /// Attempts for retryable upload/persist steps (1 = no retry).
    #[arg(long, env = "FRIDGE_RETRY_ATTEMPTS", default_value_t = 3)]
    pub retry_attempts: u32,

    /// Largest accepted photo, in bytes.
    #[arg(long, env = "FRIDGE_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    /// Parsed CORS origins, empty entries dropped.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
