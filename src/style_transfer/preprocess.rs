use crate::error::ModelError;
use crate::neural_network::{Architecture, Tensor};
use crate::neural_network::layer::helper_functions::view_4d;
use image::{Rgb, RgbImage};
use ndarray::Array4;

const RGB_CHANNELS: usize = 3;

/// Conversion between RGB images and the native input layout of a network.
///
/// A pixel channel `v` in `0..=255` becomes `v / 255 * raw_scale`, the channels
/// are reordered so that network channel `k` reads RGB channel `channel_swap[k]`,
/// then `mean[k]` is subtracted. [`Preprocessor::to_image`] inverts the mapping
/// and clips to the displayable range.
///
/// # Example
/// ```rust
/// use rustystyle::style_transfer::Preprocessor;
/// use image::{Rgb, RgbImage};
///
/// let preprocessor = Preprocessor::new(vec![10.0, 20.0, 30.0], vec![2, 1, 0], 255.0).unwrap();
/// let image = RgbImage::from_pixel(2, 1, Rgb([200, 100, 50]));
///
/// let tensor = preprocessor.to_tensor(&image);
/// assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
/// assert_eq!(tensor[[0, 0, 0, 0]], 40.0); // blue - 10
///
/// assert_eq!(preprocessor.to_image(&tensor).unwrap(), image);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    mean: Vec<f32>,
    channel_swap: Vec<usize>,
    raw_scale: f32,
}

impl Preprocessor {
    /// Creates a preprocessor for three-channel networks.
    ///
    /// # Parameters
    ///
    /// - `mean` - Per-channel mean in network channel order
    /// - `channel_swap` - RGB channel read by each network channel
    /// - `raw_scale` - Network value of a full-intensity pixel
    ///
    /// # Returns
    ///
    /// - `Ok(Preprocessor)` - A new preprocessor
    /// - `Err(ModelError::ConfigurationError)` - If `mean` or `channel_swap` doesn't describe three channels,
    ///   `channel_swap` is not a permutation, or `raw_scale` is not positive
    pub fn new(mean: Vec<f32>, channel_swap: Vec<usize>, raw_scale: f32) -> Result<Self, ModelError> {
        if mean.len() != RGB_CHANNELS || mean.iter().any(|m| !m.is_finite()) {
            return Err(ModelError::ConfigurationError(format!(
                "mean must hold {} finite values, got {:?}",
                RGB_CHANNELS, mean
            )));
        }

        let mut sorted = channel_swap.clone();
        sorted.sort_unstable();
        if sorted != [0, 1, 2] {
            return Err(ModelError::ConfigurationError(format!(
                "channel_swap {:?} is not a permutation of the RGB channels",
                channel_swap
            )));
        }

        if !(raw_scale > 0.0 && raw_scale.is_finite()) {
            return Err(ModelError::ConfigurationError(format!(
                "raw_scale must be positive and finite, got {}",
                raw_scale
            )));
        }

        Ok(Preprocessor {
            mean,
            channel_swap,
            raw_scale,
        })
    }

    /// Creates the preprocessor an architecture expects.
    pub fn from_architecture(architecture: &Architecture) -> Result<Self, ModelError> {
        Self::new(
            architecture.mean.clone(),
            architecture.channel_swap.clone(),
            architecture.raw_scale,
        )
    }

    /// Converts an RGB image into a `(1, 3, height, width)` network input.
    pub fn to_tensor(&self, image: &RgbImage) -> Tensor {
        let (width, height) = image.dimensions();
        let scale = self.raw_scale / 255.0;

        let tensor = Array4::from_shape_fn(
            (1, RGB_CHANNELS, height as usize, width as usize),
            |(_, k, y, x)| {
                let pixel = image.get_pixel(x as u32, y as u32);
                pixel[self.channel_swap[k]] as f32 * scale - self.mean[k]
            },
        );
        tensor.into_dyn()
    }

    /// Converts a network input back into an RGB image.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeError` unless `tensor` has shape `(1, 3, height, width)`.
    pub fn to_image(&self, tensor: &Tensor) -> Result<RgbImage, ModelError> {
        let view = view_4d(tensor, "Preprocessor")?;
        let (batch, channels, height, width) = view.dim();
        if batch != 1 || channels != RGB_CHANNELS {
            return Err(ModelError::ShapeError(format!(
                "expected a single three-channel image, got shape {:?}",
                tensor.shape()
            )));
        }

        let scale = 255.0 / self.raw_scale;
        let image = RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let mut pixel = [0u8; RGB_CHANNELS];
            for (k, &rgb) in self.channel_swap.iter().enumerate() {
                let value = (view[[0, k, y as usize, x as usize]] + self.mean[k]) * scale;
                pixel[rgb] = value.round().clamp(0.0, 255.0) as u8;
            }
            Rgb(pixel)
        });
        Ok(image)
    }
}
