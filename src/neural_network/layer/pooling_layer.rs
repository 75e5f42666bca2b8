use crate::error::ModelError;
use crate::neural_network::Tensor;
use crate::neural_network::layer::helper_functions::{
    calculate_output_shape_2d_pooling, execute_parallel_or_sequential, validate_gradient_shape,
    view_4d,
};
use crate::neural_network::layer::pooling_layer::input_validation_function::{
    validate_pool_size_2d, validate_strides_2d,
};
use crate::neural_network::neural_network_trait::Layer;
use ndarray::{Array2, ArrayD};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

/// Reduction applied inside each pooling window.
///
/// VGG was trained with max pooling; replacing it by average pooling tends to
/// give smoother style transfer results, which is why both are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolingMethod {
    Max,
    Average,
}

impl std::str::FromStr for PoolingMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(PoolingMethod::Max),
            "avg" | "average" => Ok(PoolingMethod::Average),
            other => Err(ModelError::ConfigurationError(format!(
                "unknown pooling method '{}', expected 'max' or 'avg'",
                other
            ))),
        }
    }
}

/// Writes per-(batch, channel) spatial results back into a 4D array.
fn merge_planes(output: &mut ArrayD<f32>, results: Vec<((usize, usize), Array2<f32>)>) {
    for ((b, c), plane) in results {
        for ((i, j), value) in plane.indexed_iter() {
            output[[b, c, i, j]] = *value;
        }
    }
}

/// 2D average pooling layer
pub mod average_pooling_2d;
mod input_validation_function;
/// 2D max pooling layer
pub mod max_pooling_2d;

pub use average_pooling_2d::AveragePooling2D;
pub use max_pooling_2d::MaxPooling2D;
