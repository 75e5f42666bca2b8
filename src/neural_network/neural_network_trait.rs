use crate::error::ModelError;
use crate::neural_network::Tensor;

/// Defines the interface for layers of a pretrained network.
///
/// Layers are stateless: nothing is cached between calls, so one network can be
/// evaluated for several inputs at the same time. Backward propagation therefore
/// receives the input the layer saw during the forward pass.
pub trait Layer: Send + Sync {
    /// Performs forward propagation through the layer.
    ///
    /// # Parameters
    ///
    /// - `input` - The input tensor to the layer
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - The output tensor after forward computation
    /// - `Err(ModelError)` - If the input does not fit the layer
    fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError>;

    /// Performs backward propagation through the layer.
    ///
    /// # Parameters
    ///
    /// - `input` - The tensor that was passed to `forward`
    /// - `grad_output` - The gradient with respect to the layer output
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - The gradient with respect to the layer input
    /// - `Err(ModelError)` - If the tensors do not fit the layer
    fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, ModelError>;

    /// Returns the type name of the layer (e.g. "Conv2D").
    ///
    /// # Returns
    ///
    /// * `&str` - A string slice representing the layer type
    fn layer_type(&self) -> &str {
        "Unknown"
    }

    /// Computes the output shape produced for a given input shape.
    ///
    /// # Parameters
    ///
    /// - `input_shape` - Shape of the input tensor
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<usize>)` - Shape of the output tensor
    /// - `Err(ModelError)` - If the input shape does not fit the layer
    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, ModelError>;

    /// Returns the number of parameters held by the layer.
    fn param_count(&self) -> usize {
        0
    }
}

/// Defines the interface for optimization algorithms.
///
/// An optimizer owns whatever running state its update rule needs and applies
/// one step to a parameter tensor given the gradient of the loss with respect to it.
pub trait Optimizer {
    /// Updates `param` in place using `grad`.
    ///
    /// # Parameters
    ///
    /// - `param` - The tensor being optimized
    /// - `grad` - Gradient of the loss with respect to `param`, same shape
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The parameter was updated
    /// - `Err(ModelError::ShapeError)` - If `param` and `grad` have different shapes
    fn update(&mut self, param: &mut Tensor, grad: &Tensor) -> Result<(), ModelError>;
}
