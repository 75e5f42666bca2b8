use super::*;

/// Adam optimizer implementation.
///
/// An optimization algorithm that computes individual adaptive learning
/// rates for every element of the parameter from estimates of first and second
/// moments of the gradients. The moment buffers are created on the first update
/// and reset whenever the parameter shape changes.
///
/// # Example
/// ```rust
/// use rustystyle::neural_network::{Adam, Optimizer};
/// use ndarray::Array1;
///
/// let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8).unwrap();
/// let mut param = Array1::from(vec![1.0_f32, -1.0]).into_dyn();
/// let grad = Array1::from(vec![2.0_f32, -2.0]).into_dyn();
///
/// adam.update(&mut param, &grad).unwrap();
///
/// // The first step moves every element by roughly the learning rate
/// assert!((param[0] - 0.9).abs() < 1e-4);
/// assert!((param[1] + 0.9).abs() < 1e-4);
/// ```
pub struct Adam {
    /// Learning rate controlling the size of parameter updates.
    learning_rate: f32,
    /// Exponential decay rate for the first moment estimates.
    beta1: f32,
    /// Exponential decay rate for the second moment estimates.
    beta2: f32,
    /// Small constant added for numerical stability.
    epsilon: f32,
    /// Current timestep, incremented with each update.
    t: u64,
    states: Option<AdamStates>,
}

impl Adam {
    /// Creates a new Adam optimizer with the specified parameters.
    ///
    /// # Parameters
    ///
    /// - `learning_rate` - Step size for parameter updates
    /// - `beta1` - Decay rate for the first moment estimates (typically 0.9)
    /// - `beta2` - Decay rate for the second moment estimates (typically 0.999)
    /// - `epsilon` - Small constant for numerical stability (typically 1e-8)
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - A new Adam optimizer instance
    /// - `Err(ModelError::InputValidationError)` - If any hyper-parameter is out of range
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Result<Self, ModelError> {
        validate_learning_rate(learning_rate)?;
        validate_decay_rate(beta1, "beta1")?;
        validate_decay_rate(beta2, "beta2")?;
        validate_epsilon(epsilon)?;

        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            states: None,
        })
    }

    /// Returns the number of updates applied so far
    pub fn get_timestep(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn update(&mut self, param: &mut Tensor, grad: &Tensor) -> Result<(), ModelError> {
        validate_param_grad(param, grad)?;

        let states = match self.states.take() {
            Some(states) if states.m.shape() == param.shape() => states,
            _ => {
                self.t = 0;
                AdamStates::new(param.shape())
            }
        };
        let states = self.states.insert(states);

        self.t += 1; // Increment step count with each update
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);
        let (beta1, beta2, epsilon, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);

        Zip::from(param)
            .and(grad)
            .and(&mut states.m)
            .and(&mut states.v)
            .par_for_each(|p, &g, m, v| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;

                let m_hat = *m / bias_correction1;
                let v_hat = *v / bias_correction2;

                *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
            });

        Ok(())
    }
}

/// First and second moment estimates kept by [`Adam`].
///
/// # Fields
///
/// - `m` - First moment (moving average of gradients)
/// - `v` - Second moment (moving average of squared gradients)
#[derive(Debug, Clone)]
pub struct AdamStates {
    pub m: Tensor,
    pub v: Tensor,
}

impl AdamStates {
    /// Creates zero-initialized moments for a parameter shape
    pub fn new(shape: &[usize]) -> Self {
        Self {
            m: Tensor::zeros(shape),
            v: Tensor::zeros(shape),
        }
    }
}
