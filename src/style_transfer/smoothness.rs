use crate::error::ModelError;
use crate::neural_network::Tensor;
use crate::neural_network::layer::helper_functions::view_4d;
use ndarray::{Array2, Array4, Axis, Zip, array};
use rayon::prelude::*;

/// The 3x3 discrete Laplacian normalized by the sum of its absolute weights.
///
/// # Example
/// ```rust
/// use rustystyle::style_transfer::laplacian_kernel;
///
/// let kernel = laplacian_kernel();
/// assert_eq!(kernel[[1, 1]], -0.5);
/// assert_eq!(kernel[[0, 1]], 0.125);
/// assert_eq!(kernel.sum(), 0.0);
/// ```
pub fn laplacian_kernel() -> Array2<f32> {
    let kernel = array![[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];
    let norm = kernel.mapv(f32::abs).sum();
    kernel / norm
}

/// Convolves every channel of an image with [`laplacian_kernel`].
///
/// Pixels outside the image take the value of the nearest border pixel, so a
/// constant image maps to zero everywhere.
///
/// # Parameters
///
/// * `image` - Image tensor of shape `(batch, channels, height, width)`
///
/// # Returns
///
/// - `Ok(Tensor)` - Laplacian of `image`, same shape
/// - `Err(ModelError::ShapeError)` - If `image` is not 4D
pub fn laplacian(image: &Tensor) -> Result<Tensor, ModelError> {
    let input = view_4d(image, "Laplacian")?;
    let (_, _, height, width) = input.dim();
    let kernel = laplacian_kernel();
    let mut output = Array4::<f32>::zeros(input.raw_dim());

    if height == 0 || width == 0 {
        return Ok(output.into_dyn());
    }

    let clamp = |x: isize, len: usize| x.clamp(0, len as isize - 1) as usize;

    for (mut out_batch, in_batch) in output.outer_iter_mut().zip(input.outer_iter()) {
        out_batch
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(in_batch.axis_iter(Axis(0)).into_par_iter())
            .for_each(|(mut out_plane, in_plane)| {
                Zip::indexed(&mut out_plane).for_each(|(i, j), out| {
                    let mut acc = 0.0;
                    for ((ki, kj), &k) in kernel.indexed_iter() {
                        if k == 0.0 {
                            continue;
                        }
                        let y = clamp(i as isize + ki as isize - 1, height);
                        let x = clamp(j as isize + kj as isize - 1, width);
                        acc += k * in_plane[[y, x]];
                    }
                    *out = acc;
                });
            });
    }

    Ok(output.into_dyn())
}

/// Gradient contribution of the smoothness term: `-coefficient * laplacian(image)`.
///
/// Returns `None` when the coefficient is zero.
pub fn smoothness_gradient(image: &Tensor, coefficient: f32) -> Result<Option<Tensor>, ModelError> {
    if coefficient == 0.0 {
        return Ok(None);
    }
    let mut grad = laplacian(image)?;
    grad.par_mapv_inplace(|v| -coefficient * v);
    Ok(Some(grad))
}
