//! Host error types

use crate::value::Value;
use thiserror::Error;

/// Faults raised by host-native operations
#[derive(Debug, Error)]
pub enum HostError {
    /// Type error (e.g., calling non-function)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Range error (e.g., invalid array length)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Reference error
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Re-entry depth exhausted
    #[error("RangeError: Maximum call stack size exceeded")]
    StackOverflow,

    /// An arbitrary thrown value
    #[error("Uncaught exception: {0:?}")]
    Throw(Value),
}

impl HostError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a reference error
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Throw an arbitrary value
    pub fn throw(value: impl Into<Value>) -> Self {
        Self::Throw(value.into())
    }
}

/// Result type for host operations
pub type HostResult<T> = std::result::Result<T, HostError>;
