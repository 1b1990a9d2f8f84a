use thiserror::Error;

/// Main error type for the Schwarzschild annealer
#[derive(Error, Debug)]
pub enum SzError {
    #[error("Numerical error: {0}")]
    Numerical(#[from] NumericalError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Precondition violations raised by the numerical routines.
///
/// These are fatal to the run segment that raised them; nothing retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericalError {
    #[error("Grid too short: {len} samples, at least {required} required")]
    GridTooShort { len: usize, required: usize },

    #[error("Index {index} out of range for a field of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Zero denominator in {quantity} at r = {r}")]
    ZeroDenominator { quantity: &'static str, r: f64 },

    #[error("Field length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Result type alias for annealer operations
pub type SzResult<T> = Result<T, SzError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::SzError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::SzError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SzError::Config(format!($($arg)*))
    };
}
