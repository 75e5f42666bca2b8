#![cfg(feature = "neural_network")]

use approx::assert_relative_eq;
use ndarray::{Array1, IxDyn};
use rustystyle::error::ModelError;
use rustystyle::neural_network::Tensor;
use rustystyle::neural_network::neural_network_trait::Optimizer;
use rustystyle::neural_network::optimizer::{Adam, SGD};

#[test]
fn test_sgd_step() {
    let mut sgd = SGD::new(0.5).unwrap();
    let mut param = Array1::from(vec![1.0_f32, 2.0, 3.0]).into_dyn();
    let grad = Array1::from(vec![2.0_f32, -2.0, 0.0]).into_dyn();

    sgd.update(&mut param, &grad).unwrap();

    assert_eq!(param.as_slice().unwrap(), &[0.0, 3.0, 3.0]);
}

#[test]
fn test_adam_first_steps() {
    let mut adam = Adam::new(0.01, 0.9, 0.999, 1e-8).unwrap();
    let mut param = Tensor::zeros(IxDyn(&[1, 1, 2, 2]));
    let grad = Tensor::from_shape_vec(IxDyn(&[1, 1, 2, 2]), vec![1.0, -1.0, 0.5, 0.0]).unwrap();

    adam.update(&mut param, &grad).unwrap();
    assert_eq!(adam.get_timestep(), 1);

    // the bias-corrected first step has length lr for every non-zero gradient
    assert_relative_eq!(param[[0, 0, 0, 0]], -0.01, epsilon = 1e-6);
    assert_relative_eq!(param[[0, 0, 0, 1]], 0.01, epsilon = 1e-6);
    assert_relative_eq!(param[[0, 0, 1, 0]], -0.01, epsilon = 1e-6);
    assert_relative_eq!(param[[0, 0, 1, 1]], 0.0, epsilon = 1e-6);

    adam.update(&mut param, &grad).unwrap();
    assert_eq!(adam.get_timestep(), 2);
    assert_relative_eq!(param[[0, 0, 0, 0]], -0.02, epsilon = 1e-5);
}

#[test]
fn test_adam_minimizes_quadratic() {
    let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8).unwrap();
    let target = Array1::from(vec![3.0_f32, -2.0, 0.5]).into_dyn();
    let mut param = Tensor::zeros(IxDyn(&[3]));

    for _ in 0..500 {
        let grad = &param - &target;
        adam.update(&mut param, &grad).unwrap();
    }

    for (p, t) in param.iter().zip(target.iter()) {
        assert_relative_eq!(p, t, epsilon = 0.1);
    }
}

#[test]
fn test_adam_resets_on_shape_change() {
    let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8).unwrap();
    let mut small = Tensor::zeros(IxDyn(&[2]));
    adam.update(&mut small, &Tensor::ones(IxDyn(&[2]))).unwrap();
    adam.update(&mut small, &Tensor::ones(IxDyn(&[2]))).unwrap();
    assert_eq!(adam.get_timestep(), 2);

    let mut large = Tensor::zeros(IxDyn(&[3]));
    adam.update(&mut large, &Tensor::ones(IxDyn(&[3]))).unwrap();
    assert_eq!(adam.get_timestep(), 1);
    assert_relative_eq!(large[0], -0.1, epsilon = 1e-6);
}

#[test]
fn test_optimizers_reject_mismatched_gradient() {
    let mut param = Tensor::zeros(IxDyn(&[2, 2]));
    let grad = Tensor::zeros(IxDyn(&[4]));

    let mut sgd = SGD::new(0.1).unwrap();
    assert!(matches!(
        sgd.update(&mut param, &grad),
        Err(ModelError::ShapeError(_))
    ));

    let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8).unwrap();
    assert!(matches!(
        adam.update(&mut param, &grad),
        Err(ModelError::ShapeError(_))
    ));
}

#[test]
fn test_optimizers_validate_hyper_parameters() {
    for lr in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(SGD::new(lr), Err(ModelError::InputValidationError(_))));
        assert!(matches!(
            Adam::new(lr, 0.9, 0.999, 1e-8),
            Err(ModelError::InputValidationError(_))
        ));
    }

    assert!(matches!(
        Adam::new(0.1, 1.0, 0.999, 1e-8),
        Err(ModelError::InputValidationError(_))
    ));
    assert!(matches!(
        Adam::new(0.1, 0.9, -0.1, 1e-8),
        Err(ModelError::InputValidationError(_))
    ));
    assert!(matches!(
        Adam::new(0.1, 0.9, 0.999, 0.0),
        Err(ModelError::InputValidationError(_))
    ));
}
