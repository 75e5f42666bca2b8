/// Activation layers
pub mod activation_layer;
/// Convolution layers
pub mod convolution_layer;
/// Shape helpers shared by all layers
pub mod helper_functions;
/// Pooling layers
pub mod pooling_layer;

pub use activation_layer::*;
pub use convolution_layer::*;
pub use pooling_layer::*;
