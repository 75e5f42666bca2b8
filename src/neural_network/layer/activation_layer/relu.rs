use super::*;

/// Threshold for parallel computation (in number of elements)
/// For tensors with fewer elements, sequential computation is faster due to overhead
const RELU_PARALLEL_THRESHOLD: usize = 10_000;

/// ReLU (Rectified Linear Unit) activation layer.
///
/// Applies `max(0, x)` element-wise to the input tensor, keeping the original shape.
/// In a style network every ReLU is a potential loss-evaluation point: content and
/// style losses are measured on its output.
///
/// # Examples
///
/// ```rust
/// use rustystyle::neural_network::{Layer, ReLU};
/// use ndarray::Array2;
///
/// let x = Array2::from_shape_vec((2, 3), vec![-1.0, 2.0, -3.0, 4.0, -5.0, 6.0])
///     .unwrap()
///     .into_dyn();
///
/// let relu = ReLU::new();
/// let output = relu.forward(&x).unwrap();
///
/// assert_eq!(output.as_slice().unwrap(), &[0.0, 2.0, 0.0, 4.0, 0.0, 6.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ReLU;

impl ReLU {
    /// Creates a new ReLU activation layer.
    ///
    /// # Returns
    ///
    /// - `Self` - A new `ReLU` layer instance
    pub fn new() -> Self {
        ReLU
    }
}

impl Layer for ReLU {
    fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        if input.is_empty() {
            return Err(ModelError::InputValidationError(
                "Input tensor is empty".to_string(),
            ));
        }

        let mut output = input.clone();
        if input.len() >= RELU_PARALLEL_THRESHOLD {
            output.par_mapv_inplace(|x| if x > 0.0 { x } else { 0.0 })
        } else {
            output.mapv_inplace(|x| if x > 0.0 { x } else { 0.0 })
        };

        Ok(output)
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        validate_gradient_shape(grad_output, input.shape(), "ReLU")?;

        // ReLU derivative is 1 for x > 0, and 0 for x <= 0
        let mut grad_input = grad_output.clone();
        if input.len() >= RELU_PARALLEL_THRESHOLD {
            Zip::from(&mut grad_input)
                .and(input)
                .par_for_each(|grad, &inp| {
                    if inp <= 0.0 {
                        *grad = 0.0;
                    }
                });
        } else {
            Zip::from(&mut grad_input).and(input).for_each(|grad, &inp| {
                if inp <= 0.0 {
                    *grad = 0.0;
                }
            });
        }

        Ok(grad_input)
    }

    fn layer_type(&self) -> &str {
        "ReLU"
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, ModelError> {
        Ok(input_shape.to_vec())
    }
}
