//! One scan, end to end:
//!
//! ```text
//! Received → Classified → PhotoUploaded → PhotoLinked → RecordBuilt → Persisted → Completed
//!                              │               │                          │
//!                              └── Failed(upload)   Failed(permission)    Failed(persist)
//! ```
//!
//! Classification never fails the scan: a sentinel label is stored like any
//! other. A photo uploaded before a later failure is left in place.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::retry::RetryPolicy;
use crate::inference::ImageClassifier;
use crate::models::{InventoryFilter, InventoryItem, Label, ManualEntry, PhotoRef, StoredItem};
use crate::storage::{InventoryStore, PhotoHandle, PhotoStore, StoreError};

// ═══════════════════════════════════════════════════════════
// States and failures
// ═══════════════════════════════════════════════════════════

/// Step whose external call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStep {
    Upload,
    Permission,
    Persist,
}

impl ScanStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStep::Upload => "upload",
            ScanStep::Permission => "permission",
            ScanStep::Persist => "persist",
        }
    }
}

impl fmt::Display for ScanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Received,
    Classified,
    PhotoUploaded,
    PhotoLinked,
    RecordBuilt,
    Persisted,
    Completed,
    Failed(ScanStep),
}

/// States a scan passed through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTrace(Vec<ScanState>);

impl ScanTrace {
    fn received() -> Self {
        Self(vec![ScanState::Received])
    }

    fn advance(&mut self, state: ScanState) {
        debug!(?state, "Scan transition");
        self.0.push(state);
    }

    #[cfg(test)]
    pub(crate) fn from_states(states: Vec<ScanState>) -> Self {
        Self(states)
    }

    pub fn states(&self) -> &[ScanState] {
        &self.0
    }

    pub fn last(&self) -> ScanState {
        self.0.last().copied().unwrap_or(ScanState::Received)
    }
}

#[derive(Error, Debug)]
#[error("Scan failed at {step}: {source}")]
pub struct ScanError {
    pub step: ScanStep,
    pub source: StoreError,
    /// Label the photo was given before the failure.
    pub label: Label,
    pub trace: ScanTrace,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub item: StoredItem,
    pub trace: ScanTrace,
}

// ═══════════════════════════════════════════════════════════
// Workflow
// ═══════════════════════════════════════════════════════════

/// Storage file name: `{label stem}_{YYYYMMDD_HHMMSS}.jpg`, UTC.
pub fn photo_file_name(label: &Label, at: DateTime<Utc>) -> String {
    format!("{}_{}.jpg", label.file_stem(), at.format("%Y%m%d_%H%M%S"))
}

/// Drives one scan at a time through classify → upload → share → persist.
/// Holds only shared handles; cheap to build per request.
pub struct ScanWorkflow {
    classifier: Arc<dyn ImageClassifier>,
    photos: Arc<dyn PhotoStore>,
    inventory: Arc<dyn InventoryStore>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl ScanWorkflow {
    pub fn new(
        classifier: Arc<dyn ImageClassifier>,
        photos: Arc<dyn PhotoStore>,
        inventory: Arc<dyn InventoryStore>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            classifier,
            photos,
            inventory,
            retry,
            clock,
        }
    }

    /// Blocking: performs store I/O on the calling thread.
    pub fn run(&self, image_bytes: &[u8]) -> Result<ScanOutcome, ScanError> {
        let mut trace = ScanTrace::received();

        let label = self.classifier.classify(image_bytes);
        trace.advance(ScanState::Classified);
        if label.is_sentinel() {
            warn!(%label, "Photo not recognized, storing with sentinel label");
        }

        let fail = |trace: &ScanTrace, step: ScanStep, source: StoreError| {
            warn!(%step, %label, error = %source, "Scan failed");
            let mut trace = trace.clone();
            trace.advance(ScanState::Failed(step));
            ScanError {
                step,
                source,
                label,
                trace,
            }
        };

        let file_name = photo_file_name(&label, self.clock.now());
        let handle = self
            .retry
            .run(ScanStep::Upload.as_str(), || {
                self.photos.upload(image_bytes, &file_name)
            })
            .and_then(non_empty_file_id)
            .map_err(|e| fail(&trace, ScanStep::Upload, e))?;
        trace.advance(ScanState::PhotoUploaded);

        // Not retried: a repeated grant against a half-shared file is not
        // known to be safe.
        let url = self
            .photos
            .make_public(&handle)
            .map_err(|e| fail(&trace, ScanStep::Permission, e))?;
        let image = PhotoRef::new(url, handle.file_id.clone()).ok_or_else(|| {
            fail(&trace, ScanStep::Permission, StoreError::MissingField("public url"))
        })?;
        trace.advance(ScanState::PhotoLinked);

        let item = InventoryItem::scanned(label, image, self.clock.now());
        trace.advance(ScanState::RecordBuilt);

        let stored = self
            .retry
            .run(ScanStep::Persist.as_str(), || self.inventory.insert(&item))
            .map_err(|e| fail(&trace, ScanStep::Persist, e))?;
        trace.advance(ScanState::Persisted);

        info!(id = %stored.id, %label, file_id = %handle.file_id, "Scan completed");
        trace.advance(ScanState::Completed);

        Ok(ScanOutcome {
            item: stored,
            trace,
        })
    }
}

fn non_empty_file_id(handle: PhotoHandle) -> Result<PhotoHandle, StoreError> {
    if handle.file_id.trim().is_empty() {
        Err(StoreError::MissingField("file id"))
    } else {
        Ok(handle)
    }
}

/// Echo a user-supplied label. Touches no store.
pub fn manual_add(label: &str) -> ManualEntry {
    ManualEntry {
        name: label.to_string(),
    }
}

/// Pass-through read of the inventory.
pub fn list_inventory(
    store: &dyn InventoryStore,
    filter: &InventoryFilter,
) -> Result<Vec<StoredItem>, StoreError> {
    store.query(filter)
}
