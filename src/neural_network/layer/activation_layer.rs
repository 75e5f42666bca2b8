use crate::error::ModelError;
use crate::neural_network::Tensor;
use crate::neural_network::layer::helper_functions::validate_gradient_shape;
use crate::neural_network::neural_network_trait::Layer;
use ndarray::Zip;

/// ReLU (Rectified Linear Unit) activation layer.
pub mod relu;

pub use relu::*;
