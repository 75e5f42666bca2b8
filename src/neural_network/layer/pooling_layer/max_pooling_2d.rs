use super::*;

/// Threshold for deciding between parallel and sequential execution.
/// When batch_size * channels >= this threshold, use parallel execution.
const MAX_POOLING_2D_PARALLEL_THRESHOLD: usize = 32;

/// 2D max pooling layer.
///
/// Selects the maximum value within each pooling window across height and width.
/// Input tensor shape: `[batch_size, channels, height, width]`. Output tensor shape:
/// `[batch_size, channels, pooled_height, pooled_width]` where
/// `pooled_height = (height - pool_size_h) / stride_h + 1` and
/// `pooled_width = (width - pool_size_w) / stride_w + 1`.
///
/// The backward pass recomputes the position of every window maximum from the
/// input, so the layer keeps no state between calls.
///
/// # Fields
///
/// - `pool_size` - Size of the pooling window as (height, width)
/// - `strides` - Step size of the pooling operation as (vertical stride, horizontal stride)
///
/// # Examples
/// ```rust
/// use rustystyle::neural_network::{Layer, MaxPooling2D};
/// use ndarray::Array4;
///
/// let mut input = Array4::zeros((1, 1, 4, 4));
/// input[[0, 0, 1, 1]] = 5.0;
/// input[[0, 0, 2, 3]] = 7.0;
///
/// let pool = MaxPooling2D::new((2, 2), None).unwrap();
/// let output = pool.forward(&input.into_dyn()).unwrap();
///
/// assert_eq!(output.shape(), &[1, 1, 2, 2]);
/// assert_eq!(output[[0, 0, 0, 0]], 5.0);
/// assert_eq!(output[[0, 0, 1, 1]], 7.0);
/// ```
///
/// # Performance
///
/// Parallel execution is used when `batch_size * channels >= MAX_POOLING_2D_PARALLEL_THRESHOLD` (32).
#[derive(Debug, Clone)]
pub struct MaxPooling2D {
    pool_size: (usize, usize),
    strides: (usize, usize),
}

impl MaxPooling2D {
    /// Creates a new 2D max pooling layer.
    ///
    /// If `strides` is None, it defaults to `pool_size`.
    ///
    /// # Parameters
    ///
    /// - `pool_size` - Size of the pooling window as (height, width)
    /// - `strides` - Optional strides of the pooling operation as (vertical stride, horizontal stride)
    ///
    /// # Returns
    ///
    /// - `Result<MaxPooling2D, ModelError>` - New layer instance on success
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

        Ok(MaxPooling2D { pool_size, strides })
    }

    /// Finds the input position of the maximum of one pooling window.
    fn window_argmax(
        &self,
        input: &ndarray::ArrayView4<f32>,
        b: usize,
        c: usize,
        out_i: usize,
        out_j: usize,
    ) -> (usize, usize, f32) {
        let i_start = out_i * self.strides.0;
        let j_start = out_j * self.strides.1;

        let mut max_val = f32::NEG_INFINITY;
        let mut max_pos = (i_start, j_start);

        for i_pos in i_start..i_start + self.pool_size.0 {
            for j_pos in j_start..j_start + self.pool_size.1 {
                let val = input[[b, c, i_pos, j_pos]];
                if val > max_val {
                    max_val = val;
                    max_pos = (i_pos, j_pos);
                }
            }
        }

        (max_pos.0, max_pos.1, max_val)
    }
}

impl Layer for MaxPooling2D {
    fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let x = view_4d(input, "MaxPooling2D")?;
        let output_shape = self.output_shape(input.shape())?;
        let (batch_size, channels) = (output_shape[0], output_shape[1]);
        let (out_height, out_width) = (output_shape[2], output_shape[3]);

        let compute_pooling = |b: usize, c: usize| {
            let mut plane = Array2::zeros((out_height, out_width));
            for out_i in 0..out_height {
                for out_j in 0..out_width {
                    let (_, _, max_val) = self.window_argmax(&x, b, c, out_i, out_j);
                    plane[[out_i, out_j]] = max_val;
                }
            }
            ((b, c), plane)
        };

        let results: Vec<_> = execute_parallel_or_sequential!(
            batch_size,
            channels,
            MAX_POOLING_2D_PARALLEL_THRESHOLD,
            compute_pooling
        );

        let mut output = ArrayD::zeros(output_shape);
        merge_planes(&mut output, results);
        Ok(output)
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let x = view_4d(input, "MaxPooling2D")?;
        let output_shape = self.output_shape(input.shape())?;
        validate_gradient_shape(grad_output, &output_shape, "MaxPooling2D")?;

        let (batch_size, channels, height, width) = x.dim();
        let (out_height, out_width) = (output_shape[2], output_shape[3]);

        // Route each output gradient to the position of its window maximum
        let compute_gradient = |b: usize, c: usize| {
            let mut plane = Array2::zeros((height, width));
            for out_i in 0..out_height {
                for out_j in 0..out_width {
                    let (in_i, in_j, _) = self.window_argmax(&x, b, c, out_i, out_j);
                    plane[[in_i, in_j]] += grad_output[[b, c, out_i, out_j]];
                }
            }
            ((b, c), plane)
        };

        let results: Vec<_> = execute_parallel_or_sequential!(
            batch_size,
            channels,
            MAX_POOLING_2D_PARALLEL_THRESHOLD,
            compute_gradient
        );

        let mut input_gradients = ArrayD::zeros(input.shape().to_vec());
        merge_planes(&mut input_gradients, results);
        Ok(input_gradients)
    }

    fn layer_type(&self) -> &str {
        "MaxPooling2D"
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, ModelError> {
        calculate_output_shape_2d_pooling(input_shape, self.pool_size, self.strides)
    }
}
