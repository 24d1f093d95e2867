//! Photo bytes → normalized 3×32×32 input tensor.
//!
//! Steps: decode (any format the image crate sniffs) → RGB → 32×32
//! bilinear resize → scale to [0, 1] → per-channel ImageNet normalization.
//! Aspect ratio is not preserved: the network was trained on squashed frames.

use image::imageops::FilterType;
use image::GenericImageView;
use ndarray::Array3;
use tracing::debug;

use super::InferenceError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Square side the network expects.
pub const INPUT_SIZE: u32 = 32;

pub const CHANNELS: usize = 3;

pub const CHANNEL_MEAN: [f32; CHANNELS] = [0.485, 0.456, 0.406];
pub const CHANNEL_STD: [f32; CHANNELS] = [0.229, 0.224, 0.225];

// ═══════════════════════════════════════════════════════════
// Input tensor
// ═══════════════════════════════════════════════════════════

/// Normalized network input, channel-major (C, H, W).
/// Only `preprocess` builds one, so the shape is always 3×32×32.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor(Array3<f32>);

impl InputTensor {
    pub fn view(&self) -> ndarray::ArrayView3<'_, f32> {
        self.0.view()
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.0.dim()
    }
}

// ═══════════════════════════════════════════════════════════
// Preprocessing
// ═══════════════════════════════════════════════════════════

/// Decode and normalize raw photo bytes.
///
/// Pure: identical bytes always yield an identical tensor.
pub fn preprocess(bytes: &[u8]) -> Result<InputTensor, InferenceError> {
    if bytes.is_empty() {
        return Err(InferenceError::Decode("empty input".into()));
    }

    let decoded =
        image::load_from_memory(bytes).map_err(|e| InferenceError::Decode(e.to_string()))?;
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        "Decoded photo"
    );

    let rgb = decoded.to_rgb8();
    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let side = INPUT_SIZE as usize;
    let tensor = Array3::from_shape_fn((CHANNELS, side, side), |(c, y, x)| {
        let value = resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0;
        (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c]
    });

    Ok(InputTensor(tensor))
}
