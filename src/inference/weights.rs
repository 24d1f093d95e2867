//! Trained parameters, read from a SafeTensors file.
//!
//! Tensor names follow the layer names of the network
//! (`conv1.weight`, `fc2.bias`, ...). Every tensor must be little-endian
//! F32 with exactly the shape listed in `TENSOR_SHAPES`.

use std::path::Path;

use ndarray::{Array1, Array2, Array4};
use safetensors::{Dtype, SafeTensors};
use tracing::info;

use super::ModelLoadError;

/// Expected tensors, in network order.
pub const TENSOR_SHAPES: [(&str, &[usize]); 10] = [
    ("conv1.weight", &[32, 3, 4, 4]),
    ("conv1.bias", &[32]),
    ("conv2.weight", &[128, 32, 4, 4]),
    ("conv2.bias", &[128]),
    ("conv3.weight", &[256, 128, 4, 4]),
    ("conv3.bias", &[256]),
    ("fc1.weight", &[512, 12544]),
    ("fc1.bias", &[512]),
    ("fc2.weight", &[10, 512]),
    ("fc2.bias", &[10]),
];

/// Parameters for every trainable layer.
#[derive(Debug, Clone)]
pub struct ClassifierWeights {
    pub conv1_weight: Array4<f32>,
    pub conv1_bias: Array1<f32>,
    pub conv2_weight: Array4<f32>,
    pub conv2_bias: Array1<f32>,
    pub conv3_weight: Array4<f32>,
    pub conv3_bias: Array1<f32>,
    pub fc1_weight: Array2<f32>,
    pub fc1_bias: Array1<f32>,
    pub fc2_weight: Array2<f32>,
    pub fc2_bias: Array1<f32>,
}

impl ClassifierWeights {
    pub fn from_file(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.is_file() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let weights = Self::from_bytes(&bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Loaded classifier weights");
        Ok(weights)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelLoadError> {
        let tensors =
            SafeTensors::deserialize(bytes).map_err(|e| ModelLoadError::Format(e.to_string()))?;
        let reader = TensorReader { tensors: &tensors };

        Ok(Self {
            conv1_weight: reader.array4("conv1.weight")?,
            conv1_bias: reader.array1("conv1.bias")?,
            conv2_weight: reader.array4("conv2.weight")?,
            conv2_bias: reader.array1("conv2.bias")?,
            conv3_weight: reader.array4("conv3.weight")?,
            conv3_bias: reader.array1("conv3.bias")?,
            fc1_weight: reader.array2("fc1.weight")?,
            fc1_bias: reader.array1("fc1.bias")?,
            fc2_weight: reader.array2("fc2.weight")?,
            fc2_bias: reader.array1("fc2.bias")?,
        })
    }

    /// All-zero parameters. Every class ties, so the network predicts index 0.
    #[cfg(test)]
    pub(crate) fn zeros() -> Self {
        Self {
            conv1_weight: Array4::zeros((32, 3, 4, 4)),
            conv1_bias: Array1::zeros(32),
            conv2_weight: Array4::zeros((128, 32, 4, 4)),
            conv2_bias: Array1::zeros(128),
            conv3_weight: Array4::zeros((256, 128, 4, 4)),
            conv3_bias: Array1::zeros(256),
            fc1_weight: Array2::zeros((512, 12544)),
            fc1_bias: Array1::zeros(512),
            fc2_weight: Array2::zeros((10, 512)),
            fc2_bias: Array1::zeros(10),
        }
    }
}

struct TensorReader<'a> {
    tensors: &'a SafeTensors<'a>,
}

impl TensorReader<'_> {
    fn read(&self, name: &str) -> Result<(Vec<usize>, Vec<f32>), ModelLoadError> {
        let view = self
            .tensors
            .tensor(name)
            .map_err(|_| ModelLoadError::MissingTensor(name.to_string()))?;

        if view.dtype() != Dtype::F32 {
            return Err(ModelLoadError::DtypeMismatch {
                name: name.to_string(),
                dtype: format!("{:?}", view.dtype()),
            });
        }

        let expected = expected_shape(name)?;
        if view.shape() != expected {
            return Err(ModelLoadError::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: view.shape().to_vec(),
            });
        }

        let values = view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok((view.shape().to_vec(), values))
    }

    fn array1(&self, name: &str) -> Result<Array1<f32>, ModelLoadError> {
        let (_, values) = self.read(name)?;
        Ok(Array1::from_vec(values))
    }

    fn array2(&self, name: &str) -> Result<Array2<f32>, ModelLoadError> {
        let (shape, values) = self.read(name)?;
        Array2::from_shape_vec((shape[0], shape[1]), values)
            .map_err(|e| ModelLoadError::Format(format!("{name}: {e}")))
    }

    fn array4(&self, name: &str) -> Result<Array4<f32>, ModelLoadError> {
        let (shape, values) = self.read(name)?;
        Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), values)
            .map_err(|e| ModelLoadError::Format(format!("{name}: {e}")))
    }
}

fn expected_shape(name: &str) -> Result<&'static [usize], ModelLoadError> {
    TENSOR_SHAPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, shape)| *shape)
        .ok_or_else(|| ModelLoadError::MissingTensor(name.to_string()))
}
