use crate::error::ModelError;
use crate::neural_network::Tensor;
use ndarray::{Array3, ArrayD, ArrayView4, Ix4};

/// Views a tensor as a 4D `[batch_size, channels, height, width]` array.
///
/// # Parameters
///
/// - `tensor` - Tensor to view
/// - `layer_name` - Name used in the error message
///
/// # Returns
///
/// - `Ok(ArrayView4<f32>)` - 4D view of the tensor
/// - `Err(ModelError::ShapeError)` - If the tensor does not have two spatial dimensions
pub fn view_4d<'a>(tensor: &'a Tensor, layer_name: &str) -> Result<ArrayView4<'a, f32>, ModelError> {
    tensor.view().into_dimensionality::<Ix4>().map_err(|_| {
        ModelError::ShapeError(format!(
            "{} expects a 4D tensor [batch_size, channels, height, width], got shape {:?}",
            layer_name,
            tensor.shape()
        ))
    })
}

/// Checks that a gradient has exactly the expected shape.
///
/// # Errors
///
/// Returns `ModelError::ShapeError` if the shapes differ.
pub fn validate_gradient_shape(
    grad_output: &Tensor,
    expected: &[usize],
    layer_name: &str,
) -> Result<(), ModelError> {
    if grad_output.shape() != expected {
        return Err(ModelError::ShapeError(format!(
            "{} gradient shape {:?} doesn't match output shape {:?}",
            layer_name,
            grad_output.shape(),
            expected
        )));
    }
    Ok(())
}

/// Calculates the output shape of a 2d pooling or convolution window.
///
/// # Parameters
///
/// * `input_shape` - Shape of the input tensor, in format \[batch_size, channels, height, width\].
/// * `window` - Size of the window as a tuple (height, width).
/// * `strides` - Step size for the window as a tuple (height_step, width_step).
///
/// # Returns
///
/// - `Ok(Vec<usize>)` - Output shape in format \[batch_size, channels, output_height, output_width\].
/// - `Err(ModelError::ShapeError)` - If the window does not fit inside the input
pub fn calculate_output_shape_2d_pooling(
    input_shape: &[usize],
    window: (usize, usize),
    strides: (usize, usize),
) -> Result<Vec<usize>, ModelError> {
    if input_shape.len() != 4 {
        return Err(ModelError::ShapeError(format!(
            "expected a 4D input shape, got {:?}",
            input_shape
        )));
    }
    let input_height = input_shape[2];
    let input_width = input_shape[3];
    if input_height < window.0 || input_width < window.1 {
        return Err(ModelError::ShapeError(format!(
            "window {:?} does not fit spatial size ({}, {})",
            window, input_height, input_width
        )));
    }

    let output_height = (input_height - window.0) / strides.0 + 1;
    let output_width = (input_width - window.1) / strides.1 + 1;

    Ok(vec![input_shape[0], input_shape[1], output_height, output_width])
}

/// Merges per-batch results into a 4D tensor.
///
/// # Parameters
///
/// - `output_shape` - Shape of the merged tensor \[batch_size, channels, height, width\]
/// - `results` - `(batch index, [channels, height, width] result)` pairs
///
/// # Returns
///
/// * `ArrayD<f32>` - A 4D dynamic array containing the merged results
pub fn merge_results(output_shape: Vec<usize>, results: Vec<(usize, Array3<f32>)>) -> ArrayD<f32> {
    let mut output: ArrayD<f32> = ArrayD::zeros(output_shape);

    for (b, batch_output) in results {
        output
            .index_axis_mut(ndarray::Axis(0), b)
            .assign(&batch_output.into_dyn());
    }

    output
}

/// Runs `$compute(b, c)` for every (batch, channel) pair, in parallel when the
/// pair count reaches `$threshold`, and collects the results in order.
macro_rules! execute_parallel_or_sequential {
    ($batch_size:expr, $channels:expr, $threshold:expr, $compute:expr) => {{
        let pairs: Vec<(usize, usize)> = (0..$batch_size)
            .flat_map(|b| (0..$channels).map(move |c| (b, c)))
            .collect();
        if pairs.len() >= $threshold {
            pairs
                .into_par_iter()
                .map(|(b, c)| $compute(b, c))
                .collect()
        } else {
            pairs.into_iter().map(|(b, c)| $compute(b, c)).collect()
        }
    }};
}

pub(crate) use execute_parallel_or_sequential;
