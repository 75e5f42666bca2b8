use crate::error::ModelError;
use crate::neural_network::Tensor;
use crate::neural_network::neural_network_trait::Optimizer;
use crate::neural_network::optimizer::input_validation_function::{
    validate_decay_rate, validate_epsilon, validate_learning_rate,
};
use ndarray::Zip;

/// Checks that a parameter and its gradient have the same shape.
fn validate_param_grad(param: &Tensor, grad: &Tensor) -> Result<(), ModelError> {
    if param.shape() != grad.shape() {
        return Err(ModelError::ShapeError(format!(
            "parameter shape {:?} doesn't match gradient shape {:?}",
            param.shape(),
            grad.shape()
        )));
    }
    Ok(())
}

/// Adam optimizer
pub mod adam;
mod input_validation_function;
/// Stochastic Gradient Descent optimizer
pub mod sgd;

pub use adam::*;
pub use sgd::*;
