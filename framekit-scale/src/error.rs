//! Scaler error types.

use framekit_core::Error as CoreError;
use thiserror::Error;

/// Error type for scaler setup and execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScaleError {
    /// Core error, including allocation failures.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Conversion between the given formats is not supported.
    #[error("Unsupported conversion: {0}")]
    Unsupported(String),

    /// A source slice did not continue where the previous one ended.
    #[error("Source slice out of order: expected row {expected}, got row {got}")]
    SliceOrder { expected: u32, got: u32 },

    /// A source slice does not fit the source image.
    #[error("Invalid source slice: {0}")]
    InvalidSlice(String),

    /// A caller plane is missing or shorter than its geometry requires.
    #[error("Plane {plane} too small: need {needed} bytes, have {actual}")]
    PlaneTooSmall {
        plane: usize,
        needed: usize,
        actual: usize,
    },
}

/// Scaler result type.
pub type Result<T> = std::result::Result<T, ScaleError>;

impl ScaleError {
    /// Check if this error is an allocation failure.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, ScaleError::Core(err) if err.is_out_of_memory())
    }
}
