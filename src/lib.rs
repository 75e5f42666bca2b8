//! Neural artistic style transfer in pure Rust.
//!
//! An image is synthesized that keeps the content of a *subject* image while
//! taking on the texture of a *style* image. Both are measured through the
//! activations of a pretrained convolutional network: the subject through the
//! raw activations of selected layers, the style through their Gram matrices.
//! The synthesized image is the only learnable parameter and is optimized
//! directly in pixel space.

/// Error types of the network backend, the optimization and file access
pub mod error;

pub use error::*;

/// Components for evaluating pretrained convolutional networks layer by layer.
///
/// # Core Components
///
/// ## Layer Types
/// - **Conv2D**: 2D convolution with pretrained filters
/// - **ReLU**: Rectified linear activation
/// - **MaxPooling2D** / **AveragePooling2D**: 2D spatial down-sampling
///
/// ## Network Description
/// - **Architecture**: Statically declared layer-descriptor table plus input preprocessing,
///   with the built-in VGG-19 table
/// - **PretrainedWeights**: Convolution filters keyed by layer name, read from JSON
/// - **Network**: The feature layers of an architecture bound to their weights
///
/// ## Optimization Algorithms
/// - **Adam**: Adaptive moment estimation optimizer
/// - **SGD**: Stochastic Gradient Descent
///
/// # Examples
/// ```rust
/// use rustystyle::neural_network::*;
/// use ndarray::Array4;
///
/// let relu = ReLU::new();
/// let input = Array4::from_elem((1, 1, 2, 2), -1.0).into_dyn();
///
/// let output = relu.forward(&input).unwrap();
/// assert!(output.iter().all(|&v| v == 0.0));
/// ```
#[cfg(feature = "neural_network")]
pub mod neural_network;

/// Style transfer on top of a pretrained network.
///
/// # Components
/// - **LayerWeights**: Maps sparse convolution-block weights onto the network layers and
///   finds how many layers have to be evaluated
/// - **StyleNetwork**: Caches the subject activations and style Gram matrices, then computes
///   loss and pixel-space gradient of candidate images
/// - **ImageParameter**: The image being optimized and its gradient
/// - **Preprocessor**: Conversion between RGB images and network inputs
/// - **StyleConfig** / **StyleTransfer**: Run configuration and the optimization driver
///
/// # Examples
/// ```rust
/// use rustystyle::style_transfer::*;
/// use ndarray::Array4;
///
/// let x = Array4::from_shape_fn((1, 3, 4, 4), |(_, c, i, j)| (c + i * j) as f32).into_dyn();
/// let gram = gram_matrix(&x).unwrap();
/// assert_eq!(gram, gram.t());
/// ```
#[cfg(feature = "style_transfer")]
pub mod style_transfer;

/// A convenience module that re-exports the most commonly used types and traits from this crate.
///
/// # Examples
/// ```rust
/// use rustystyle::prelude::*;
///
/// let config = StyleConfig::default();
/// assert_eq!(config.pooling, PoolingMethod::Average);
/// ```
pub mod prelude;
