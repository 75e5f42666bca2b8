use crate::error::ModelError;
use crate::neural_network::Tensor;
use crate::neural_network::layer::helper_functions::{
    merge_results, validate_gradient_shape, view_4d,
};
use crate::neural_network::neural_network_trait::Layer;
use ndarray::{Array2, Array3, Array4, ArrayView3, Axis, s};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Defines the padding method used in convolutional layers.
///
/// The padding type determines how the input is padded before applying convolution:
/// - `Valid`: No padding is applied, which reduces the output dimensions.
/// - `Same`: Padding is added to preserve the input spatial dimensions in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingType {
    /// No padding is applied. The convolution is only computed where the filter
    /// fully overlaps with the input, resulting in an output with reduced dimensions.
    Valid,

    /// Zeros are added around the borders so that the output has the same
    /// spatial dimensions as the input (when stride is 1).
    Same,
}

/// 2D Convolutional Layer
pub mod conv_2d;

pub use conv_2d::*;
