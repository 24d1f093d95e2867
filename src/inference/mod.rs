//! Photo classification: decode → normalize → CNN forward pass → label.
//!
//! `InferenceEngine` is the only entry point the rest of the crate uses.
//! Decode and forward faults never leave this module as errors: they are
//! turned into sentinel labels by the engine.

pub mod classifier;
pub mod engine;
pub mod preprocess;
pub mod weights;

pub use classifier::Classifier;
pub use engine::{argmax, Classification, ImageClassifier, InferenceEngine};
pub use preprocess::{preprocess, InputTensor};
pub use weights::ClassifierWeights;

use std::path::PathBuf;

use thiserror::Error;

/// Per-call inference faults. Absorbed by the engine.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Forward pass failed: {0}")]
    Forward(String),
}

/// Weight loading faults. Fatal at startup.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model weights not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error reading model weights: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid weight file: {0}")]
    Format(String),

    #[error("Weight tensor missing: {0}")]
    MissingTensor(String),

    #[error("Weight tensor {name} has dtype {dtype}, expected F32")]
    DtypeMismatch { name: String, dtype: String },

    #[error("Weight tensor {name} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}
