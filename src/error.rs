use std::fmt;

/// Result type for Sparta operations
pub type Result<T> = std::result::Result<T, SpartaError>;

/// Main error type for the learning engine
#[derive(Debug, Clone, PartialEq)]
pub enum SpartaError {
    /// Input length disagrees with a layer's configured size. Always a wiring bug.
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid configuration value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (model store files)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),

    /// Numerical computation errors
    NumericalError(String),

    /// A shared trainer or store lock was poisoned by a panicking holder
    LockPoisoned(String),

    /// A stored snapshot does not describe a consistent two-layer network
    InvalidSnapshot(String),
}

impl fmt::Display for SpartaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpartaError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            SpartaError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            SpartaError::IoError(msg) => write!(f, "IO error: {}", msg),
            SpartaError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SpartaError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            SpartaError::LockPoisoned(what) => write!(f, "Lock poisoned: {}", what),
            SpartaError::InvalidSnapshot(msg) => write!(f, "Invalid snapshot: {}", msg),
        }
    }
}

impl std::error::Error for SpartaError {}

impl From<std::io::Error> for SpartaError {
    fn from(err: std::io::Error) -> Self {
        SpartaError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for SpartaError {
    fn from(err: bincode::Error) -> Self {
        SpartaError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for SpartaError {
    fn from(err: serde_json::Error) -> Self {
        SpartaError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl SpartaError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        SpartaError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        SpartaError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn lock_poisoned<S: Into<String>>(what: S) -> Self {
        SpartaError::LockPoisoned(what.into())
    }
}
