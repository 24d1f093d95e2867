//! Process-wide service state, built once at startup and shared by
//! reference with every request. Holds the loaded model and the store
//! clients; nothing in here is mutated after construction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::config::{PhotoBackend, ServiceConfig};
use crate::inference::{ImageClassifier, InferenceEngine, ModelLoadError};
use crate::pipeline::{Clock, RetryPolicy, ScanWorkflow, SystemClock};
use crate::storage::{
    DrivePhotoStore, InventoryStore, LocalPhotoStore, PhotoStore, SqliteInventoryStore,
    StoreError, TokenFileCredentials,
};

/// Pause between attempts of a retried store call.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Fatal startup faults. The service must not serve traffic after one.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Model load failed: {0}")]
    Model(#[from] ModelLoadError),

    #[error("Store setup failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

// ═══════════════════════════════════════════════════════════
// ServiceContext
// ═══════════════════════════════════════════════════════════

pub struct ServiceContext {
    classifier: Arc<dyn ImageClassifier>,
    photos: Arc<dyn PhotoStore>,
    inventory: Arc<dyn InventoryStore>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    started_at: Instant,
}

impl ServiceContext {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        photos: Arc<dyn PhotoStore>,
        inventory: Arc<dyn InventoryStore>,
    ) -> Self {
        Self {
            classifier,
            photos,
            inventory,
            retry: RetryPolicy::default(),
            clock: Arc::new(SystemClock),
            started_at: Instant::now(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Load the model, open the inventory database and construct the
    /// configured photo backend.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, StartupError> {
        let engine = InferenceEngine::load(&config.model_path)?;
        let inventory = SqliteInventoryStore::open(&config.db_path)?;
        info!(path = %config.db_path.display(), "Inventory database ready");

        let photos: Arc<dyn PhotoStore> = match config.photo_backend {
            PhotoBackend::Local => Arc::new(LocalPhotoStore::new(
                &config.upload_dir,
                &config.public_base_url,
            )?),
            PhotoBackend::Drive => {
                let folder_id = config.drive_folder_id.as_deref().ok_or_else(|| {
                    StartupError::Config("DRIVE_FOLDER_ID is required for the drive backend".into())
                })?;
                let credentials =
                    TokenFileCredentials::new(&config.drive_token_path, config.io_timeout())?;
                Arc::new(DrivePhotoStore::new(
                    folder_id,
                    Arc::new(credentials),
                    config.io_timeout(),
                )?)
            }
        };
        info!(backend = ?config.photo_backend, "Photo store ready");

        Ok(Self::new(Arc::new(engine), photos, Arc::new(inventory))
            .with_retry(RetryPolicy::new(config.retry_attempts, RETRY_BACKOFF)))
    }

    /// Fresh workflow over the shared collaborators.
    pub fn scan_workflow(&self) -> ScanWorkflow {
        ScanWorkflow::new(
            self.classifier.clone(),
            self.photos.clone(),
            self.inventory.clone(),
            self.retry,
            self.clock.clone(),
        )
    }

    pub fn inventory(&self) -> Arc<dyn InventoryStore> {
        self.inventory.clone()
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_ready()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
