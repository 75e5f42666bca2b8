#![cfg(feature = "style_transfer")]

use approx::assert_relative_eq;
use ndarray::{Array4, IxDyn};
use rustystyle::error::ModelError;
use rustystyle::neural_network::Tensor;
use rustystyle::style_transfer::{laplacian, laplacian_kernel, smoothness_gradient};

#[test]
fn test_laplacian_kernel_normalization() {
    let kernel = laplacian_kernel();

    assert_eq!(kernel.shape(), &[3, 3]);
    assert_relative_eq!(kernel.mapv(f32::abs).sum(), 1.0);
    assert_relative_eq!(kernel[[1, 1]], -0.5);
    for (i, j) in [(0, 1), (1, 0), (1, 2), (2, 1)] {
        assert_relative_eq!(kernel[[i, j]], 0.125);
    }
    for (i, j) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
        assert_eq!(kernel[[i, j]], 0.0);
    }
}

#[test]
fn test_laplacian_of_constant_image_is_zero() {
    let image = Tensor::from_elem(IxDyn(&[1, 3, 5, 7]), 42.5);
    let result = laplacian(&image).unwrap();

    assert_eq!(result.shape(), image.shape());
    assert!(result.iter().all(|&v| v == 0.0));
}

#[test]
fn test_laplacian_of_linear_ramp_vanishes_inside() {
    let image = Array4::from_shape_fn((1, 1, 5, 5), |(_, _, i, j)| 2.0 * i as f32 + j as f32)
        .into_dyn();
    let result = laplacian(&image).unwrap();

    for i in 1..4 {
        for j in 1..4 {
            assert_relative_eq!(result[[0, 0, i, j]], 0.0, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_laplacian_of_single_spike() {
    let mut image = Tensor::zeros(IxDyn(&[1, 2, 5, 5]));
    image[[0, 1, 2, 2]] = 8.0;
    let result = laplacian(&image).unwrap();

    assert_relative_eq!(result[[0, 1, 2, 2]], -4.0);
    for (i, j) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
        assert_relative_eq!(result[[0, 1, i, j]], 1.0);
    }
    assert_eq!(result[[0, 1, 1, 1]], 0.0);
    // channels are filtered independently
    assert!(result.index_axis(ndarray::Axis(1), 0).iter().all(|&v| v == 0.0));
}

#[test]
fn test_laplacian_replicates_border() {
    // a bright corner pixel only sees its two inner neighbours as different
    let mut image = Tensor::zeros(IxDyn(&[1, 1, 3, 3]));
    image[[0, 0, 0, 0]] = 8.0;
    let result = laplacian(&image).unwrap();

    // top and left neighbours are the pixel itself
    assert_relative_eq!(result[[0, 0, 0, 0]], (8.0 + 8.0 - 4.0 * 8.0) / 8.0);
}

#[test]
fn test_smoothness_gradient() {
    let mut image = Tensor::zeros(IxDyn(&[1, 1, 3, 3]));
    image[[0, 0, 1, 1]] = 8.0;

    assert!(smoothness_gradient(&image, 0.0).unwrap().is_none());

    let grad = smoothness_gradient(&image, 0.5).unwrap().unwrap();
    let lap = laplacian(&image).unwrap();
    for (g, l) in grad.iter().zip(lap.iter()) {
        assert_relative_eq!(*g, -0.5 * l);
    }

    let flat = Tensor::from_elem(IxDyn(&[1, 3, 4, 4]), -7.0);
    let grad = smoothness_gradient(&flat, 3.0).unwrap().unwrap();
    assert!(grad.iter().all(|&v| v == 0.0));
}

#[test]
fn test_laplacian_rejects_non_image() {
    let image = Tensor::zeros(IxDyn(&[3, 4]));
    assert!(matches!(laplacian(&image), Err(ModelError::ShapeError(_))));
}
