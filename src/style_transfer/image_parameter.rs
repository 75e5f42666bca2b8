use crate::error::ModelError;
use crate::neural_network::{Optimizer, Tensor};
use ndarray::Zip;
use ndarray_rand::RandomExt;
use ndarray_rand::rand::{SeedableRng, rngs::StdRng};
use ndarray_rand::rand_distr::Normal;

/// The image being synthesized, the only learnable parameter of a run.
///
/// Holds a `(1, channels, height, width)` tensor and a gradient buffer of the
/// same shape. The gradient is overwritten by every evaluation, never accumulated.
#[derive(Debug, Clone)]
pub struct ImageParameter {
    array: Tensor,
    grad: Tensor,
}

impl ImageParameter {
    /// Wraps an image tensor.
    ///
    /// # Parameters
    ///
    /// * `array` - Initial image of shape `(1, channels, height, width)`
    ///
    /// # Returns
    ///
    /// - `Ok(ImageParameter)` - Parameter with a zeroed gradient
    /// - `Err(ModelError::ShapeError)` - If `array` is not a single 4D image
    pub fn new(array: Tensor) -> Result<Self, ModelError> {
        if array.ndim() != 4 || array.shape()[0] != 1 {
            return Err(ModelError::ShapeError(format!(
                "image parameter must have shape (1, channels, height, width), got {:?}",
                array.shape()
            )));
        }
        let grad = Tensor::zeros(array.raw_dim());
        Ok(ImageParameter { array, grad })
    }

    /// Current image
    pub fn array(&self) -> &Tensor {
        &self.array
    }

    /// Mutable access to the image, for optimizers that step it in place
    pub fn array_mut(&mut self) -> &mut Tensor {
        &mut self.array
    }

    /// Gradient written by the last evaluation
    pub fn grad(&self) -> &Tensor {
        &self.grad
    }

    /// Replaces the gradient buffer.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeError` if `grad` does not have the image shape.
    pub fn set_grad(&mut self, grad: Tensor) -> Result<(), ModelError> {
        if grad.shape() != self.array.shape() {
            return Err(ModelError::ShapeError(format!(
                "gradient shape {:?} doesn't match image shape {:?}",
                grad.shape(),
                self.array.shape()
            )));
        }
        self.grad = grad;
        Ok(())
    }

    /// Lets `optimizer` step the image along the current gradient.
    pub fn apply(&mut self, optimizer: &mut dyn Optimizer) -> Result<(), ModelError> {
        optimizer.update(&mut self.array, &self.grad)
    }

    /// Consumes the parameter and returns the image
    pub fn into_array(self) -> Tensor {
        self.array
    }
}

/// Starting point of an optimization: the subject blended with Gaussian noise.
///
/// Computes `subject * (1 - noise_fraction) + noise * noise_fraction` where the
/// noise is drawn from `Normal(0, 0.1 * std(subject))` with a generator seeded by `seed`.
///
/// # Parameters
///
/// - `subject` - Preprocessed subject image
/// - `noise_fraction` - Share of noise, in `[0, 1]`
/// - `seed` - Seed of the noise generator
///
/// # Returns
///
/// - `Ok(Tensor)` - The initial image
/// - `Err(ModelError::ConfigurationError)` - If `noise_fraction` is outside `[0, 1]`
pub fn initial_image(subject: &Tensor, noise_fraction: f32, seed: u64) -> Result<Tensor, ModelError> {
    if !(0.0..=1.0).contains(&noise_fraction) {
        return Err(ModelError::ConfigurationError(format!(
            "noise fraction must be in [0, 1], got {}",
            noise_fraction
        )));
    }
    if noise_fraction == 0.0 {
        return Ok(subject.clone());
    }

    let std = subject.std(0.0);
    let normal = Normal::new(0.0, 0.1 * std)
        .map_err(|e| ModelError::ConfigurationError(format!("invalid noise distribution: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Tensor::random_using(subject.raw_dim(), normal, &mut rng);

    let mut image = subject.clone();
    Zip::from(&mut image).and(&noise).for_each(|x, &n| {
        *x = *x * (1.0 - noise_fraction) + n * noise_fraction;
    });
    Ok(image)
}
