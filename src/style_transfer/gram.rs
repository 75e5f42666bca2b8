use crate::error::ModelError;
use crate::neural_network::Tensor;
use ndarray::{Array2, ArrayView2, CowArray, Ix2};

fn check_activation(x: &Tensor) -> Result<(usize, usize), ModelError> {
    match x.shape() {
        &[1, channels, height, width] => Ok((channels, height * width)),
        shape => Err(ModelError::ShapeError(format!(
            "expected an activation of shape (1, channels, height, width), got {:?}",
            shape
        ))),
    }
}

/// Views an activation `(1, C, H, W)` as a `(C, H*W)` matrix.
///
/// Copies only when `x` is not in standard layout.
pub fn flatten(x: &Tensor) -> Result<CowArray<'_, f32, Ix2>, ModelError> {
    let (channels, pixels) = check_activation(x)?;
    x.to_shape((channels, pixels))
        .map_err(|e| ModelError::ShapeError(e.to_string()))
}

/// Number of spatial positions of an activation.
pub fn pixel_count(x: &Tensor) -> Result<usize, ModelError> {
    check_activation(x).map(|(_, pixels)| pixels)
}

/// Channel-by-channel inner products of an activation.
///
/// # Parameters
///
/// * `x` - Activation of shape `(1, C, H, W)`
///
/// # Returns
///
/// - `Ok(Array2<f32>)` - Symmetric `C x C` matrix `F · Fᵀ` where `F` is `x` flattened to `(C, H*W)`
/// - `Err(ModelError::ShapeError)` - If `x` does not have the shape of a single activation
///
/// # Example
/// ```rust
/// use rustystyle::style_transfer::gram_matrix;
/// use ndarray::Array4;
///
/// let x = Array4::from_shape_vec((1, 2, 1, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap().into_dyn();
/// let gram = gram_matrix(&x).unwrap();
///
/// assert_eq!(gram[[0, 0]], 5.0);
/// assert_eq!(gram[[0, 1]], 11.0);
/// assert_eq!(gram[[1, 0]], 11.0);
/// assert_eq!(gram[[1, 1]], 25.0);
/// ```
pub fn gram_matrix(x: &Tensor) -> Result<Array2<f32>, ModelError> {
    let flat = flatten(x)?;
    Ok(gram_of_flat(flat.view()))
}

pub(crate) fn gram_of_flat(flat: ArrayView2<f32>) -> Array2<f32> {
    flat.dot(&flat.t())
}
