//! Process-wide classifier. Loaded once at startup, shared read-only.
//!
//! `classify` never fails: every fault is folded into a sentinel label.
//!
//! | Situation                    | Label                 |
//! |------------------------------|-----------------------|
//! | no model loaded              | `Model Error`         |
//! | undecodable bytes            | `Analysis Failed`     |
//! | forward-pass fault or panic  | `Analysis Failed`     |
//! | argmax outside class list    | `Unknown Class (i)`   |
//! | otherwise                    | class name            |

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, info, warn};

use super::classifier::Classifier;
use super::preprocess::preprocess;
use super::weights::ClassifierWeights;
use super::{InferenceError, ModelLoadError};
use crate::models::Label;

/// Anything that can put a label on a photo. The scan workflow depends on
/// this rather than on the concrete engine.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image_bytes: &[u8]) -> Label;

    /// False when every call would return the `Model Error` sentinel.
    fn is_ready(&self) -> bool;
}

/// Label plus the scores it was chosen from (absent for sentinels that
/// never reached the network).
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Label,
    pub logits: Option<Vec<f32>>,
}

impl Classification {
    fn sentinel(label: Label) -> Self {
        Self { label, logits: None }
    }
}

pub struct InferenceEngine {
    model: Option<Classifier>,
}

impl InferenceEngine {
    /// Read weights from a SafeTensors file and build the network.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let weights = ClassifierWeights::from_file(path)?;
        let engine = Self::from_classifier(Classifier::new(weights)?);
        info!(path = %path.display(), "Classifier ready");
        Ok(engine)
    }

    pub fn from_classifier(model: Classifier) -> Self {
        Self { model: Some(model) }
    }

    /// Engine without a model. Every call answers `Model Error`.
    pub fn unloaded() -> Self {
        Self { model: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn classify_detailed(&self, image_bytes: &[u8]) -> Classification {
        let Some(model) = &self.model else {
            warn!("Classification requested with no model loaded");
            return Classification::sentinel(Label::ModelError);
        };

        let input = match preprocess(image_bytes) {
            Ok(input) => input,
            Err(e) => {
                warn!(error = %e, bytes = image_bytes.len(), "Photo preprocessing failed");
                return Classification::sentinel(Label::AnalysisFailed);
            }
        };

        // A panic inside the numeric kernels must not take the request down.
        let forward = catch_unwind(AssertUnwindSafe(|| model.forward(&input)))
            .unwrap_or_else(|_| Err(InferenceError::Forward("forward pass panicked".into())));

        let logits = match forward {
            Ok(logits) if logits.iter().all(|v| v.is_finite()) => logits.to_vec(),
            Ok(_) => {
                warn!("Forward pass produced non-finite logits");
                return Classification::sentinel(Label::AnalysisFailed);
            }
            Err(e) => {
                warn!(error = %e, "Forward pass failed");
                return Classification::sentinel(Label::AnalysisFailed);
            }
        };

        let label = match argmax(&logits) {
            Some(index) => Label::from_index(index),
            None => Label::AnalysisFailed,
        };
        debug!(%label, "Photo classified");

        Classification {
            label,
            logits: Some(logits),
        }
    }
}

impl ImageClassifier for InferenceEngine {
    fn classify(&self, image_bytes: &[u8]) -> Label {
        self.classify_detailed(image_bytes).label
    }

    fn is_ready(&self) -> bool {
        self.is_loaded()
    }
}

/// Index of the largest score. Ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if v <= top => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

// ═══════════════════════════════════════════════════════════
// Mock classifier
// ═══════════════════════════════════════════════════════════

/// Returns a fixed label and records how many photos it saw.
#[cfg(test)]
pub(crate) struct MockClassifier {
    label: Label,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockClassifier {
    pub(crate) fn new(label: Label) -> Self {
        Self {
            label,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl ImageClassifier for MockClassifier {
    fn classify(&self, _image_bytes: &[u8]) -> Label {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.label
    }

    fn is_ready(&self) -> bool {
        self.label != Label::ModelError
    }
}
