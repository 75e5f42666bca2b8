/// Module that contains the run configuration and the parsing of block weights
pub mod config;
/// Module that contains the Gram matrix of an activation
pub mod gram;
/// Module that contains the image being optimized and its initialization
pub mod image_parameter;
/// Module that maps convolution-block weights onto network layers
pub mod layer_weights;
/// Module that converts between RGB images and network inputs
pub mod preprocess;
/// Module that drives a complete optimization run
pub mod runner;
/// Module that contains the Laplacian smoothness term
pub mod smoothness;
/// Module that contains the loss network and its gradient computation
pub mod style_network;

pub use config::*;
pub use gram::*;
pub use image_parameter::*;
pub use layer_weights::*;
pub use preprocess::*;
pub use runner::*;
pub use smoothness::*;
pub use style_network::*;
