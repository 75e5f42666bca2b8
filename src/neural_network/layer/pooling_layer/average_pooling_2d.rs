use super::*;

/// Threshold for deciding between parallel and sequential execution.
/// When batch_size * channels >= this threshold, use parallel execution.
const AVERAGE_POOLING_2D_PARALLEL_THRESHOLD: usize = 32;

/// 2D average pooling layer.
///
/// Replaces each pooling window by the mean of its values. The backward pass
/// spreads every output gradient evenly over the window it was computed from.
///
/// # Fields
///
/// - `pool_size` - Size of the pooling window as (height, width)
/// - `strides` - Step size of the pooling operation as (vertical stride, horizontal stride)
///
/// # Examples
/// ```rust
/// use rustystyle::neural_network::{AveragePooling2D, Layer};
/// use ndarray::Array4;
///
/// let input = Array4::from_shape_fn((1, 1, 2, 2), |(_, _, i, j)| (i * 2 + j) as f32).into_dyn();
///
/// let pool = AveragePooling2D::new((2, 2), None).unwrap();
/// let output = pool.forward(&input).unwrap();
///
/// assert_eq!(output.shape(), &[1, 1, 1, 1]);
/// assert_eq!(output[[0, 0, 0, 0]], 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct AveragePooling2D {
    pool_size: (usize, usize),
    strides: (usize, usize),
}

impl AveragePooling2D {
    /// Creates a new 2D average pooling layer.
    ///
    /// If `strides` is None, it defaults to `pool_size`.
    ///
    /// # Parameters
    ///
    /// - `pool_size` - Size of the pooling window as (height, width)
    /// - `strides` - Optional strides of the pooling operation as (vertical stride, horizontal stride)
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `pool_size` has a zero dimension or any stride is zero
    pub fn new(
        pool_size: (usize, usize),
        strides: Option<(usize, usize)>,
    ) -> Result<Self, ModelError> {
        let strides = strides.unwrap_or(pool_size);

        validate_pool_size_2d(pool_size)?;
        validate_strides_2d(strides)?;

        Ok(AveragePooling2D { pool_size, strides })
    }
}

impl Layer for AveragePooling2D {
    fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let x = view_4d(input, "AveragePooling2D")?;
        let output_shape = self.output_shape(input.shape())?;
        let (batch_size, channels) = (output_shape[0], output_shape[1]);
        let (out_height, out_width) = (output_shape[2], output_shape[3]);
        let window_area = (self.pool_size.0 * self.pool_size.1) as f32;

        let compute_pooling = |b: usize, c: usize| {
            let mut plane = Array2::zeros((out_height, out_width));
            for out_i in 0..out_height {
                let i_start = out_i * self.strides.0;
                for out_j in 0..out_width {
                    let j_start = out_j * self.strides.1;
                    let sum: f32 = x
                        .slice(ndarray::s![
                            b,
                            c,
                            i_start..i_start + self.pool_size.0,
                            j_start..j_start + self.pool_size.1
                        ])
                        .sum();
                    plane[[out_i, out_j]] = sum / window_area;
                }
            }
            ((b, c), plane)
        };

        let results: Vec<_> = execute_parallel_or_sequential!(
            batch_size,
            channels,
            AVERAGE_POOLING_2D_PARALLEL_THRESHOLD,
            compute_pooling
        );

        let mut output = ArrayD::zeros(output_shape);
        merge_planes(&mut output, results);
        Ok(output)
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let x = view_4d(input, "AveragePooling2D")?;
        let output_shape = self.output_shape(input.shape())?;
        validate_gradient_shape(grad_output, &output_shape, "AveragePooling2D")?;

        let (batch_size, channels, height, width) = x.dim();
        let (out_height, out_width) = (output_shape[2], output_shape[3]);
        let window_area = (self.pool_size.0 * self.pool_size.1) as f32;

        let compute_gradient = |b: usize, c: usize| {
            let mut plane = Array2::<f32>::zeros((height, width));
            for out_i in 0..out_height {
                let i_start = out_i * self.strides.0;
                for out_j in 0..out_width {
                    let j_start = out_j * self.strides.1;
                    let share = grad_output[[b, c, out_i, out_j]] / window_area;
                    plane
                        .slice_mut(ndarray::s![
                            i_start..i_start + self.pool_size.0,
                            j_start..j_start + self.pool_size.1
                        ])
                        .mapv_inplace(|g| g + share);
                }
            }
            ((b, c), plane)
        };

        let results: Vec<_> = execute_parallel_or_sequential!(
            batch_size,
            channels,
            AVERAGE_POOLING_2D_PARALLEL_THRESHOLD,
            compute_gradient
        );

        let mut input_gradients = ArrayD::zeros(input.shape().to_vec());
        merge_planes(&mut input_gradients, results);
        Ok(input_gradients)
    }

    fn layer_type(&self) -> &str {
        "AveragePooling2D"
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, ModelError> {
        calculate_output_shape_2d_pooling(input_shape, self.pool_size, self.strides)
    }
}
