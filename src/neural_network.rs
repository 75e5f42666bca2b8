/// Module that contains the statically declared layer-descriptor tables
pub mod architecture;
/// Module that contains neural network layer implementations
pub mod layer;
/// Module that contains the pretrained convolutional stack built from an architecture
pub mod network;
/// Module that contains the core traits of the network backend
pub mod neural_network_trait;
/// Module that contains optimization algorithms that update a tensor from its gradient
pub mod optimizer;
/// Module that contains pretrained weight (de)serialization
pub mod pretrained;

pub use architecture::*;
pub use layer::*;
pub use network::*;
pub use optimizer::*;
pub use pretrained::*;

use ndarray::ArrayD;

/// Type alias for n-dimensional arrays used as tensors in the neural network
pub type Tensor = ArrayD<f32>;

pub use crate::neural_network::neural_network_trait::Layer;
pub use crate::neural_network::neural_network_trait::Optimizer;
