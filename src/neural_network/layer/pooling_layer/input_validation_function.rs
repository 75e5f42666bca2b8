use super::*;

/// Validates pool size for 2D pooling.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` if any dimension is 0.
pub fn validate_pool_size_2d(pool_size: (usize, usize)) -> Result<(), ModelError> {
    if pool_size.0 == 0 || pool_size.1 == 0 {
        return Err(ModelError::InputValidationError(
            "Pool size must be greater than zero in all dimensions".to_string(),
        ));
    }
    Ok(())
}

/// Validates strides for 2D pooling.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` if any stride is 0.
pub fn validate_strides_2d(strides: (usize, usize)) -> Result<(), ModelError> {
    if strides.0 == 0 || strides.1 == 0 {
        return Err(ModelError::InputValidationError(
            "Strides must be greater than zero in all dimensions".to_string(),
        ));
    }
    Ok(())
}
