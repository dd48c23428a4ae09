//! Error types for the framekit core.
//!
//! Allocation failures, rejected geometry and misuse of frames all surface
//! through [`Error`]. Callers either receive a fully usable object or one of
//! these errors; nothing is ever returned half-built.

use thiserror::Error;

/// Main error type for buffer pools and frame acquisition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An allocation was refused by the allocator.
    #[error("Out of memory: {what} ({size} bytes)")]
    OutOfMemory { what: &'static str, size: usize },

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A computed size exceeds the safe bound.
    #[error("Size overflow: {what} needs {size} bytes, limit is {limit}")]
    Overflow {
        what: &'static str,
        size: usize,
        limit: usize,
    },

    /// The operation is not valid for the object's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A fixed-size hardware frame pool has no free surfaces left.
    #[error("Hardware frame pool exhausted ({pool_size} surfaces)")]
    HwPoolExhausted { pool_size: usize },

    /// Any other failure reported by a hardware frame allocator.
    #[error("Hardware frame allocation failed: {0}")]
    Hardware(String),

    /// Unsupported feature or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create an out-of-memory error.
    pub fn oom(what: &'static str, size: usize) -> Self {
        Error::OutOfMemory { what, size }
    }

    /// Check if this is an out-of-memory error.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Error::OutOfMemory { .. })
    }

    /// Check if this error came from an exhausted fixed-size hardware pool.
    ///
    /// Such failures are usually fixable by configuring a larger pool, which
    /// is why they are kept apart from plain allocation failures.
    #[must_use]
    pub fn is_hw_pool_exhausted(&self) -> bool {
        matches!(self, Error::HwPoolExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("test parameter".into());
        assert_eq!(err.to_string(), "Invalid parameter: test parameter");

        let err = Error::oom("pool block", 4096);
        assert_eq!(err.to_string(), "Out of memory: pool block (4096 bytes)");
    }

    #[test]
    fn test_is_out_of_memory() {
        assert!(Error::oom("line", 16).is_out_of_memory());
        assert!(!Error::invalid_state("busy").is_out_of_memory());
    }

    #[test]
    fn test_hw_pool_exhausted_is_distinct() {
        let err = Error::HwPoolExhausted { pool_size: 4 };
        assert!(err.is_hw_pool_exhausted());
        assert!(!err.is_out_of_memory());
        assert!(!Error::Hardware("lost device".into()).is_hw_pool_exhausted());
    }
}
