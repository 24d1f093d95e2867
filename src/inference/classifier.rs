//! The fridge-item CNN, evaluated on the CPU with ndarray.
//!
//! ```text
//! input 3×32×32
//!   conv1 3→32   k4 p1 + ReLU   → 32×31×31
//!   conv2 32→128 k4 p1 + ReLU   → 128×30×30
//!   maxpool 2                   → 128×15×15
//!   conv3 128→256 k4 p1 + ReLU  → 256×14×14
//!   maxpool 2                   → 256×7×7
//!   flatten (C, H, W order)     → 12544
//!   fc1 + ReLU                  → 512
//!   dropout (identity at eval)
//!   fc2                         → 10 logits
//! ```

use ndarray::{Array1, Array2, Array3, Array4, ArrayView3, Axis};

use super::preprocess::InputTensor;
use super::weights::ClassifierWeights;
use super::{InferenceError, ModelLoadError};

pub const NUM_CLASSES: usize = 10;
pub const FLATTENED_FEATURES: usize = 256 * 7 * 7;

const PADDING: usize = 1;
const POOL: usize = 2;

// ═══════════════════════════════════════════════════════════
// Layers
// ═══════════════════════════════════════════════════════════

/// Stride-1 square convolution, lowered to a single matrix product
/// (im2col).
#[derive(Debug, Clone)]
pub struct Conv2d {
    /// [out, in·k·k], row-major over (in, ky, kx).
    kernel: Array2<f32>,
    bias: Array1<f32>,
    in_channels: usize,
    out_channels: usize,
    size: usize,
    padding: usize,
}

impl Conv2d {
    pub fn new(
        name: &str,
        weight: Array4<f32>,
        bias: Array1<f32>,
        padding: usize,
    ) -> Result<Self, ModelLoadError> {
        let (out_channels, in_channels, kh, kw) = weight.dim();
        if kh != kw || bias.len() != out_channels {
            return Err(ModelLoadError::ShapeMismatch {
                name: name.to_string(),
                expected: vec![out_channels, in_channels, kh, kh],
                actual: weight.shape().to_vec(),
            });
        }

        let kernel = weight
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((out_channels, in_channels * kh * kw))
            .map_err(|e| ModelLoadError::Format(format!("{name}: {e}")))?;

        Ok(Self {
            kernel,
            bias,
            in_channels,
            out_channels,
            size: kh,
            padding,
        })
    }

    pub fn forward(&self, input: ArrayView3<'_, f32>) -> Result<Array3<f32>, InferenceError> {
        let (channels, height, width) = input.dim();
        if channels != self.in_channels {
            return Err(InferenceError::Forward(format!(
                "conv expects {} channels, got {channels}",
                self.in_channels
            )));
        }

        let k = self.size;
        let p = self.padding;
        if height + 2 * p < k || width + 2 * p < k {
            return Err(InferenceError::Forward("input smaller than kernel".into()));
        }
        let out_h = height + 2 * p - k + 1;
        let out_w = width + 2 * p - k + 1;

        // Zero padding is implicit: out-of-range taps stay 0.
        let mut cols = Array2::<f32>::zeros((channels * k * k, out_h * out_w));
        for c in 0..channels {
            for ky in 0..k {
                for kx in 0..k {
                    let row = (c * k + ky) * k + kx;
                    for oy in 0..out_h {
                        let Some(iy) = (oy + ky).checked_sub(p).filter(|&y| y < height) else {
                            continue;
                        };
                        for ox in 0..out_w {
                            let Some(ix) = (ox + kx).checked_sub(p).filter(|&x| x < width) else {
                                continue;
                            };
                            cols[[row, oy * out_w + ox]] = input[[c, iy, ix]];
                        }
                    }
                }
            }
        }

        let mut out = self.kernel.dot(&cols);
        out += &self.bias.view().insert_axis(Axis(1));
        out.into_shape_with_order((self.out_channels, out_h, out_w))
            .map_err(|e| InferenceError::Forward(e.to_string()))
    }
}

/// Non-overlapping max pooling. Trailing rows/columns that do not fill a
/// window are dropped.
#[derive(Debug, Clone, Copy)]
pub struct MaxPool2d {
    size: usize,
}

impl MaxPool2d {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn forward(&self, input: ArrayView3<'_, f32>) -> Array3<f32> {
        let (channels, height, width) = input.dim();
        let s = self.size;
        Array3::from_shape_fn((channels, height / s, width / s), |(c, y, x)| {
            let mut max = f32::NEG_INFINITY;
            for dy in 0..s {
                for dx in 0..s {
                    max = max.max(input[[c, y * s + dy, x * s + dx]]);
                }
            }
            max
        })
    }
}

/// Fully connected layer, weight stored as [out, in].
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    pub fn new(name: &str, weight: Array2<f32>, bias: Array1<f32>) -> Result<Self, ModelLoadError> {
        if weight.nrows() != bias.len() {
            return Err(ModelLoadError::ShapeMismatch {
                name: name.to_string(),
                expected: vec![weight.nrows()],
                actual: vec![bias.len()],
            });
        }
        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, input: &Array1<f32>) -> Result<Array1<f32>, InferenceError> {
        if input.len() != self.in_features() {
            return Err(InferenceError::Forward(format!(
                "linear expects {} features, got {}",
                self.in_features(),
                input.len()
            )));
        }
        Ok(self.weight.dot(input) + &self.bias)
    }
}

/// Dropout with p = 0.5 at training time. Inference only runs in eval
/// mode, where it passes activations through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dropout;

impl Dropout {
    pub fn forward(&self, input: Array1<f32>) -> Array1<f32> {
        input
    }
}

fn relu_inplace<D: ndarray::Dimension>(x: &mut ndarray::Array<f32, D>) {
    x.mapv_inplace(|v| v.max(0.0));
}

// ═══════════════════════════════════════════════════════════
// Network
// ═══════════════════════════════════════════════════════════

/// Immutable after construction; `forward` takes `&self` and may be called
/// from many threads at once.
#[derive(Debug, Clone)]
pub struct Classifier {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    pool: MaxPool2d,
    fc1: Linear,
    dropout: Dropout,
    fc2: Linear,
}

impl Classifier {
    pub fn new(weights: ClassifierWeights) -> Result<Self, ModelLoadError> {
        let fc1 = Linear::new("fc1", weights.fc1_weight, weights.fc1_bias)?;
        let fc2 = Linear::new("fc2", weights.fc2_weight, weights.fc2_bias)?;

        if fc1.in_features() != FLATTENED_FEATURES {
            return Err(ModelLoadError::ShapeMismatch {
                name: "fc1.weight".into(),
                expected: vec![fc1.out_features(), FLATTENED_FEATURES],
                actual: vec![fc1.out_features(), fc1.in_features()],
            });
        }
        if fc2.in_features() != fc1.out_features() || fc2.out_features() != NUM_CLASSES {
            return Err(ModelLoadError::ShapeMismatch {
                name: "fc2.weight".into(),
                expected: vec![NUM_CLASSES, fc1.out_features()],
                actual: vec![fc2.out_features(), fc2.in_features()],
            });
        }

        Ok(Self {
            conv1: Conv2d::new("conv1", weights.conv1_weight, weights.conv1_bias, PADDING)?,
            conv2: Conv2d::new("conv2", weights.conv2_weight, weights.conv2_bias, PADDING)?,
            conv3: Conv2d::new("conv3", weights.conv3_weight, weights.conv3_bias, PADDING)?,
            pool: MaxPool2d::new(POOL),
            fc1,
            dropout: Dropout,
            fc2,
        })
    }

    /// Raw class scores, one per `FoodClass` in declaration order.
    pub fn forward(&self, input: &InputTensor) -> Result<Array1<f32>, InferenceError> {
        let mut x = self.conv1.forward(input.view())?;
        relu_inplace(&mut x);

        let mut x = self.conv2.forward(x.view())?;
        relu_inplace(&mut x);
        let x = self.pool.forward(x.view());

        let mut x = self.conv3.forward(x.view())?;
        relu_inplace(&mut x);
        let x = self.pool.forward(x.view());

        // Logical iteration order is (C, H, W), matching a contiguous flatten.
        let flat: Array1<f32> = x.iter().copied().collect();

        let mut hidden = self.fc1.forward(&flat)?;
        relu_inplace(&mut hidden);
        let hidden = self.dropout.forward(hidden);

        self.fc2.forward(&hidden)
    }
}
