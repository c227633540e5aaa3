use thiserror::Error;

/// Errors raised eagerly at construction time for invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Gap proportion {gap} and valid proportion {valid} must sum to less than 1")]
    InvalidProportions { gap: f64, valid: f64 },

    #[error("{name} must be greater than 0, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("x and y must have equal length, got {x_len} and {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },

    #[error("Y position {y_position} must be between 0 and sequence length - 1 ({seq_len} - 1)")]
    InvalidYPosition { y_position: usize, seq_len: usize },

    #[error("Sequence length {seq_len} must be between 1 and the number of rows ({rows})")]
    InvalidSeqLen { seq_len: usize, rows: usize },

    #[error("Invalid env '{0}'. Expected 'dev' or 'prod'")]
    InvalidEnv(String),
}

/// Errors from feature generators, labelers, and the feature service.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Feature generator '{0}' used before initialize")]
    NotInitialized(String),

    #[error("Feature generator '{0}' initialized twice")]
    AlreadyInitialized(String),

    #[error("Column '{0}' not found in input data")]
    MissingColumn(String),

    #[error("Flattened feature key '{0}' is produced by more than one generator")]
    KeyCollision(String),

    #[error("Not enough history: need at least {needed} rows, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

/// Errors from the model/estimator machinery.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Scaler used before fit")]
    ScalerNotFitted,

    #[error("Parameter {index} has an unexpected shape")]
    ParameterShape { index: usize },

    #[error("Expected {expected} parameter tensors, got {got}")]
    ParameterCount { expected: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_formatting() {
        let err = ConfigError::InvalidProportions {
            gap: 0.4,
            valid: 0.7,
        };
        let msg = err.to_string();
        assert!(msg.contains("0.4"));
        assert!(msg.contains("0.7"));
    }

    #[test]
    fn test_feature_error_formatting() {
        let err = FeatureError::KeyCollision("SMA__close__3".to_string());
        assert!(err.to_string().contains("SMA__close__3"));
    }
}
