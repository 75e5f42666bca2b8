use super::*;
use std::ops::Range;

/// Upper bound on the elements of one unfolded column matrix.
///
/// Larger outputs are lowered in tiles of whole output rows.
const MAX_COLUMN_ELEMENTS: usize = 1 << 22;

/// A 2D convolutional layer with fixed, pretrained filters.
///
/// Filters are never trained here: the backward pass only propagates the gradient
/// to the input image, which is all a style network needs. The convolution is
/// computed by unfolding every receptive field into a column (im2col) and
/// multiplying the result with the flattened filter bank, a band of output rows
/// at a time so that memory stays bounded on large images.
///
/// # Fields
///
/// - `filters` - Number of convolution filters (output channels).
/// - `kernel_size` - Size of the convolution kernel as (height, width).
/// - `strides` - Stride values for the convolution operation as (vertical, horizontal).
/// - `padding` - Type of padding to apply (`Valid` or `Same`).
/// - `weights` - 4D array of filter weights with shape \[filters, channels, kernel_height, kernel_width\].
/// - `weight_matrix` - `weights` flattened to \[filters, channels * kernel_height * kernel_width\].
/// - `bias` - 2D array of bias values with shape \[1, filters\].
///
/// # Shape Information
///
/// Input shape: \[batch_size, channels, height, width\]
/// Output shape: \[batch_size, filters, output_height, output_width\]
///
/// # Example
/// ```rust
/// use rustystyle::neural_network::{Conv2D, Layer, PaddingType};
/// use ndarray::{Array2, Array4};
///
/// // One 3x3 filter summing its receptive field
/// let conv = Conv2D::new(
///     Array4::ones((1, 1, 3, 3)),
///     Array2::zeros((1, 1)),
///     (1, 1),
///     PaddingType::Same,
/// )
/// .unwrap();
///
/// let x = Array4::ones((1, 1, 4, 4)).into_dyn();
/// let y = conv.forward(&x).unwrap();
///
/// assert_eq!(y.shape(), &[1, 1, 4, 4]);
/// assert_eq!(y[[0, 0, 1, 1]], 9.0);
/// assert_eq!(y[[0, 0, 0, 0]], 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct Conv2D {
    filters: usize,
    kernel_size: (usize, usize),
    strides: (usize, usize),
    padding: PaddingType,
    weights: Array4<f32>,
    weight_matrix: Array2<f32>,
    bias: Array2<f32>,
}

impl Conv2D {
    /// Creates a new 2D convolutional layer from existing filters.
    ///
    /// # Parameters
    ///
    /// - `weights` - Filter weights with shape \[filters, channels, kernel_height, kernel_width\]
    /// - `bias` - Bias values with shape \[1, filters\]
    /// - `strides` - Stride values for the convolution operation as (vertical, horizontal)
    /// - `padding` - Type of padding to apply (`Valid` or `Same`)
    ///
    /// # Returns
    ///
    /// - `Ok(Conv2D)` - A new layer instance
    /// - `Err(ModelError::InputValidationError)` - If a dimension or stride is zero, or the
    ///   bias does not hold exactly one value per filter
    pub fn new(
        weights: Array4<f32>,
        bias: Array2<f32>,
        strides: (usize, usize),
        padding: PaddingType,
    ) -> Result<Self, ModelError> {
        let (filters, channels, kernel_height, kernel_width) = weights.dim();

        if weights.is_empty() {
            return Err(ModelError::InputValidationError(format!(
                "Conv2D weights must not have a zero dimension, got {:?}",
                weights.shape()
            )));
        }
        if strides.0 == 0 || strides.1 == 0 {
            return Err(ModelError::InputValidationError(
                "Conv2D strides must be greater than zero".to_string(),
            ));
        }
        if bias.dim() != (1, filters) {
            return Err(ModelError::InputValidationError(format!(
                "Conv2D bias must have shape [1, {}], got {:?}",
                filters,
                bias.shape()
            )));
        }

        let weights = weights.as_standard_layout().into_owned();
        let weight_matrix = weights
            .clone()
            .into_shape_with_order((filters, channels * kernel_height * kernel_width))
            .map_err(|e| ModelError::InputValidationError(e.to_string()))?;

        Ok(Conv2D {
            filters,
            kernel_size: (kernel_height, kernel_width),
            strides,
            padding,
            weights,
            weight_matrix,
            bias,
        })
    }

    /// Returns the number of input channels the filters expect
    pub fn get_in_channels(&self) -> usize {
        self.weights.shape()[1]
    }

    /// Returns the number of filters (output channels)
    pub fn get_filters(&self) -> usize {
        self.filters
    }

    /// Returns a reference to the filter weights
    pub fn get_weights(&self) -> &Array4<f32> {
        &self.weights
    }

    /// Returns a reference to the bias
    pub fn get_bias(&self) -> &Array2<f32> {
        &self.bias
    }

    /// Computes (pad_top, pad_left, padded_height, padded_width) for an input size.
    fn padding_for(&self, input_height: usize, input_width: usize) -> (usize, usize, usize, usize) {
        match self.padding {
            PaddingType::Valid => (0, 0, input_height, input_width),
            PaddingType::Same => {
                let out_height = input_height.div_ceil(self.strides.0);
                let out_width = input_width.div_ceil(self.strides.1);

                let pad_height = ((out_height - 1) * self.strides.0 + self.kernel_size.0)
                    .saturating_sub(input_height);
                let pad_width = ((out_width - 1) * self.strides.1 + self.kernel_size.1)
                    .saturating_sub(input_width);

                (
                    pad_height / 2,
                    pad_width / 2,
                    input_height + pad_height,
                    input_width + pad_width,
                )
            }
        }
    }

    /// Calculates the output shape of the convolutional layer based on input dimensions.
    fn calculate_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, ModelError> {
        if input_shape.len() != 4 {
            return Err(ModelError::ShapeError(format!(
                "Conv2D expects a 4D input shape, got {:?}",
                input_shape
            )));
        }
        if input_shape[1] != self.get_in_channels() {
            return Err(ModelError::ShapeError(format!(
                "Conv2D expects {} input channels, got {}",
                self.get_in_channels(),
                input_shape[1]
            )));
        }

        let (_, _, padded_height, padded_width) = self.padding_for(input_shape[2], input_shape[3]);
        if padded_height < self.kernel_size.0 || padded_width < self.kernel_size.1 {
            return Err(ModelError::ShapeError(format!(
                "Conv2D kernel {:?} does not fit spatial size ({}, {})",
                self.kernel_size, input_shape[2], input_shape[3]
            )));
        }

        let output_height = (padded_height - self.kernel_size.0) / self.strides.0 + 1;
        let output_width = (padded_width - self.kernel_size.1) / self.strides.1 + 1;

        Ok(vec![input_shape[0], self.filters, output_height, output_width])
    }

    /// Copies one batch item into a zero-padded buffer.
    fn apply_padding(&self, item: ArrayView3<f32>) -> Array3<f32> {
        let (channels, height, width) = item.dim();
        let (pad_top, pad_left, padded_height, padded_width) = self.padding_for(height, width);

        let mut padded = Array3::zeros((channels, padded_height, padded_width));
        padded
            .slice_mut(s![.., pad_top..pad_top + height, pad_left..pad_left + width])
            .assign(&item);
        padded
    }

    /// Number of output rows lowered at once for an item with `channels` channels.
    fn tile_rows(&self, channels: usize, output_width: usize) -> usize {
        let per_row = channels * self.kernel_size.0 * self.kernel_size.1 * output_width;
        (MAX_COLUMN_ELEMENTS / per_row.max(1)).max(1)
    }

    /// Unfolds the receptive fields of output rows `rows` into columns.
    ///
    /// Row `c * kh * kw + ki * kw + kj` of the result holds kernel tap (ki, kj) of
    /// channel c, matching the layout of `weight_matrix`.
    fn im2col(&self, padded: &Array3<f32>, rows: Range<usize>, output_width: usize) -> Array2<f32> {
        let channels = padded.shape()[0];
        let (kernel_height, kernel_width) = self.kernel_size;
        let (first_row, tile_height) = (rows.start, rows.len());
        let mut cols = Array2::zeros((
            channels * kernel_height * kernel_width,
            tile_height * output_width,
        ));

        cols.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, mut col_row)| {
                let c = row / (kernel_height * kernel_width);
                let ki = (row / kernel_width) % kernel_height;
                let kj = row % kernel_width;

                for t in 0..tile_height {
                    let i_pos = (first_row + t) * self.strides.0 + ki;
                    for j in 0..output_width {
                        col_row[t * output_width + j] = padded[[c, i_pos, j * self.strides.1 + kj]];
                    }
                }
            });

        cols
    }

    /// Adds column gradients of the output rows starting at `first_row` onto a padded item.
    fn col2im(
        &self,
        cols: &Array2<f32>,
        first_row: usize,
        output_width: usize,
        image: &mut Array3<f32>,
    ) {
        let (kernel_height, kernel_width) = self.kernel_size;
        let tile_height = cols.shape()[1] / output_width.max(1);

        image
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(c, mut plane)| {
                for ki in 0..kernel_height {
                    for kj in 0..kernel_width {
                        let row = (c * kernel_height + ki) * kernel_width + kj;
                        for t in 0..tile_height {
                            let i_pos = (first_row + t) * self.strides.0 + ki;
                            for j in 0..output_width {
                                plane[[i_pos, j * self.strides.1 + kj]] +=
                                    cols[[row, t * output_width + j]];
                            }
                        }
                    }
                }
            });
    }
}

impl Layer for Conv2D {
    fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let x = view_4d(input, "Conv2D")?;
        let output_shape = self.calculate_output_shape(input.shape())?;
        let (output_height, output_width) = (output_shape[2], output_shape[3]);

        let results = x
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(b, item)| {
                let padded = self.apply_padding(item);
                let tile = self.tile_rows(padded.shape()[0], output_width);

                let mut out = Array2::<f32>::zeros((self.filters, output_height * output_width));
                for start in (0..output_height).step_by(tile) {
                    let end = (start + tile).min(output_height);
                    let cols = self.im2col(&padded, start..end, output_width);
                    out.slice_mut(s![.., start * output_width..end * output_width])
                        .assign(&self.weight_matrix.dot(&cols));
                }
                out += &self.bias.t();

                let out = out
                    .into_shape_with_order((self.filters, output_height, output_width))
                    .map_err(|e| ModelError::ProcessingError(e.to_string()))?;
                Ok((b, out))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        Ok(merge_results(output_shape, results))
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let x = view_4d(input, "Conv2D")?;
        let output_shape = self.calculate_output_shape(input.shape())?;
        validate_gradient_shape(grad_output, &output_shape, "Conv2D")?;
        let grad = view_4d(grad_output, "Conv2D")?;

        let (_, channels, height, width) = x.dim();
        let (pad_top, pad_left, padded_height, padded_width) = self.padding_for(height, width);
        let (output_height, output_width) = (output_shape[2], output_shape[3]);

        let results = grad
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(b, grad_item)| {
                let grad_matrix = grad_item
                    .to_owned()
                    .into_shape_with_order((self.filters, output_height * output_width))
                    .map_err(|e| ModelError::ProcessingError(e.to_string()))?;

                let tile = self.tile_rows(channels, output_width);
                let mut padded_grad = Array3::<f32>::zeros((channels, padded_height, padded_width));
                for start in (0..output_height).step_by(tile) {
                    let end = (start + tile).min(output_height);
                    let grad_cols = self
                        .weight_matrix
                        .t()
                        .dot(&grad_matrix.slice(s![.., start * output_width..end * output_width]));
                    self.col2im(&grad_cols, start, output_width, &mut padded_grad);
                }

                // Remove padding from gradients
                let grad_input = padded_grad
                    .slice(s![.., pad_top..pad_top + height, pad_left..pad_left + width])
                    .to_owned();
                Ok((b, grad_input))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        Ok(merge_results(input.shape().to_vec(), results))
    }

    fn layer_type(&self) -> &str {
        "Conv2D"
    }

    fn output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, ModelError> {
        self.calculate_output_shape(input_shape)
    }

    fn param_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}
