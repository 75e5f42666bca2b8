#![cfg(feature = "neural_network")]

use approx::assert_relative_eq;
use ndarray::{Array4, IxDyn};
use rustystyle::error::ModelError;
use rustystyle::neural_network::Tensor;
use rustystyle::neural_network::layer::{AveragePooling2D, MaxPooling2D, PoolingMethod};
use rustystyle::neural_network::neural_network_trait::Layer;

fn ramp(batch: usize, channels: usize, height: usize, width: usize) -> Tensor {
    Array4::from_shape_fn((batch, channels, height, width), |(b, c, i, j)| {
        (b * 1000 + c * 100 + i * width + j) as f32
    })
    .into_dyn()
}

#[test]
fn test_max_pooling_2d_forward() {
    let input = ramp(2, 3, 4, 4);
    let pool = MaxPooling2D::new((2, 2), None).unwrap();

    let output = pool.forward(&input).unwrap();
    assert_eq!(output.shape(), &[2, 3, 2, 2]);

    for b in 0..2 {
        for c in 0..3 {
            for i in 0..2 {
                for j in 0..2 {
                    // bottom right corner of each window
                    let expected = (b * 1000 + c * 100 + (2 * i + 1) * 4 + 2 * j + 1) as f32;
                    assert_relative_eq!(output[[b, c, i, j]], expected);
                }
            }
        }
    }
}

#[test]
fn test_max_pooling_2d_backward_routes_to_argmax() {
    let mut input = Tensor::zeros(IxDyn(&[1, 1, 4, 4]));
    input[[0, 0, 0, 1]] = 3.0;
    input[[0, 0, 1, 2]] = 4.0;
    input[[0, 0, 3, 0]] = 5.0;
    input[[0, 0, 2, 3]] = 6.0;

    let pool = MaxPooling2D::new((2, 2), None).unwrap();
    let grad_output =
        Tensor::from_shape_vec(IxDyn(&[1, 1, 2, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let grad = pool.backward(&input, &grad_output).unwrap();

    assert_eq!(grad.shape(), input.shape());
    assert_relative_eq!(grad[[0, 0, 0, 1]], 1.0);
    assert_relative_eq!(grad[[0, 0, 1, 2]], 2.0);
    assert_relative_eq!(grad[[0, 0, 3, 0]], 3.0);
    assert_relative_eq!(grad[[0, 0, 2, 3]], 4.0);
    assert_relative_eq!(grad.sum(), 10.0);
}

#[test]
fn test_max_pooling_2d_parallel_path() {
    // batch * channels above the parallel threshold
    let input = ramp(2, 20, 6, 6);
    let pool = MaxPooling2D::new((2, 2), Some((2, 2))).unwrap();

    let output = pool.forward(&input).unwrap();
    assert_eq!(output.shape(), &[2, 20, 3, 3]);
    assert_relative_eq!(output[[1, 19, 2, 2]], (1000 + 1900 + 35) as f32);

    let grad = pool
        .backward(&input, &Tensor::ones(IxDyn(&[2, 20, 3, 3])))
        .unwrap();
    assert_relative_eq!(grad.sum(), (2 * 20 * 9) as f32);
}

#[test]
fn test_average_pooling_2d_forward() {
    let input = ramp(1, 2, 4, 4);
    let pool = AveragePooling2D::new((2, 2), None).unwrap();

    let output = pool.forward(&input).unwrap();
    assert_eq!(output.shape(), &[1, 2, 2, 2]);
    // mean of 0, 1, 4, 5
    assert_relative_eq!(output[[0, 0, 0, 0]], 2.5);
    // mean of 110, 111, 114, 115
    assert_relative_eq!(output[[0, 1, 1, 1]], 112.5);
}

#[test]
fn test_average_pooling_2d_backward_spreads_evenly() {
    let input = ramp(1, 1, 4, 4);
    let pool = AveragePooling2D::new((2, 2), None).unwrap();
    let grad_output =
        Tensor::from_shape_vec(IxDyn(&[1, 1, 2, 2]), vec![4.0, 8.0, 12.0, 16.0]).unwrap();

    let grad = pool.backward(&input, &grad_output).unwrap();

    assert_relative_eq!(grad[[0, 0, 0, 0]], 1.0);
    assert_relative_eq!(grad[[0, 0, 1, 1]], 1.0);
    assert_relative_eq!(grad[[0, 0, 0, 2]], 2.0);
    assert_relative_eq!(grad[[0, 0, 3, 0]], 3.0);
    assert_relative_eq!(grad[[0, 0, 3, 3]], 4.0);
    assert_relative_eq!(grad.sum(), 40.0);
}

#[test]
fn test_pooling_output_shape_drops_partial_windows() {
    let max = MaxPooling2D::new((2, 2), None).unwrap();
    let avg = AveragePooling2D::new((2, 2), None).unwrap();

    assert_eq!(max.output_shape(&[1, 3, 5, 7]).unwrap(), vec![1, 3, 2, 3]);
    assert_eq!(avg.output_shape(&[1, 3, 5, 7]).unwrap(), vec![1, 3, 2, 3]);

    let overlapping = MaxPooling2D::new((3, 3), Some((2, 2))).unwrap();
    assert_eq!(overlapping.output_shape(&[1, 1, 7, 7]).unwrap(), vec![1, 1, 3, 3]);
}

#[test]
fn test_pooling_rejects_bad_shapes() {
    let pool = MaxPooling2D::new((2, 2), None).unwrap();

    let too_small = Tensor::zeros(IxDyn(&[1, 1, 1, 4]));
    assert!(matches!(pool.forward(&too_small), Err(ModelError::ShapeError(_))));

    let three_d = Tensor::zeros(IxDyn(&[1, 4, 4]));
    assert!(matches!(pool.forward(&three_d), Err(ModelError::ShapeError(_))));

    let input = Tensor::zeros(IxDyn(&[1, 1, 4, 4]));
    let wrong_grad = Tensor::zeros(IxDyn(&[1, 1, 3, 2]));
    assert!(matches!(
        AveragePooling2D::new((2, 2), None)
            .unwrap()
            .backward(&input, &wrong_grad),
        Err(ModelError::ShapeError(_))
    ));
}

#[test]
fn test_pooling_validates_construction() {
    assert!(matches!(
        MaxPooling2D::new((0, 2), None),
        Err(ModelError::InputValidationError(_))
    ));
    assert!(matches!(
        AveragePooling2D::new((2, 2), Some((2, 0))),
        Err(ModelError::InputValidationError(_))
    ));
}

#[test]
fn test_pooling_method_from_str() {
    assert_eq!("max".parse::<PoolingMethod>().unwrap(), PoolingMethod::Max);
    assert_eq!("avg".parse::<PoolingMethod>().unwrap(), PoolingMethod::Average);
    assert_eq!(
        "average".parse::<PoolingMethod>().unwrap(),
        PoolingMethod::Average
    );
    assert!(matches!(
        "median".parse::<PoolingMethod>(),
        Err(ModelError::ConfigurationError(_))
    ));
}
