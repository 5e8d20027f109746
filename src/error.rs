//! Error types for Detectar operations.
//!
//! Provides rich error context for pipeline consumers.

use std::fmt;

/// Main error type for Detectar operations.
///
/// Covers the full failure taxonomy of the evaluation pipeline: unreadable
/// sources, malformed tables, balancing preconditions, evaluator
/// preconditions, and opaque backend failures.
///
/// # Examples
///
/// ```
/// use detectar::error::DetectarError;
///
/// let err = DetectarError::LengthMismatch {
///     expected: 100,
///     actual: 95,
/// };
/// assert!(err.to_string().contains("length mismatch"));
/// ```
#[derive(Debug)]
pub enum DetectarError {
    /// Input path does not exist or cannot be opened.
    SourceNotFound {
        /// Path that failed to open
        path: String,
    },

    /// Malformed or inconsistent input table (ragged rows, bad label values).
    Schema {
        /// Error description
        message: String,
    },

    /// A class has too few members for neighbor interpolation.
    InsufficientSamples {
        /// Class label that cannot be resampled
        class: usize,
        /// Members available in that class
        available: usize,
        /// Members required for the configured neighbor count
        required: usize,
    },

    /// Co-indexed sequences differ in length.
    LengthMismatch {
        /// Expected length
        expected: usize,
        /// Actual length found
        actual: usize,
    },

    /// An operation received an empty input it cannot define a result for.
    EmptyInput {
        /// What was empty
        context: String,
    },

    /// Opaque failure surfaced from a model backend.
    BackendTraining {
        /// Backend name
        backend: String,
        /// Whatever the backend reported
        message: String,
    },

    /// Invalid hyperparameter or configuration value.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// I/O error (permission denied, read failure, etc.).
    Io(std::io::Error),

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for DetectarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectarError::SourceNotFound { path } => {
                write!(f, "Source not found: {path}")
            }
            DetectarError::Schema { message } => {
                write!(f, "Schema error: {message}")
            }
            DetectarError::InsufficientSamples {
                class,
                available,
                required,
            } => {
                write!(
                    f,
                    "Insufficient samples for class {class}: {available} available, {required} required"
                )
            }
            DetectarError::LengthMismatch { expected, actual } => {
                write!(f, "Sequence length mismatch: expected {expected}, got {actual}")
            }
            DetectarError::EmptyInput { context } => {
                write!(f, "Empty input: {context}")
            }
            DetectarError::BackendTraining { backend, message } => {
                write!(f, "Backend '{backend}' failed: {message}")
            }
            DetectarError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            DetectarError::Io(e) => write!(f, "I/O error: {e}"),
            DetectarError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DetectarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectarError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DetectarError {
    fn from(err: std::io::Error) -> Self {
        DetectarError::Io(err)
    }
}

impl From<&str> for DetectarError {
    fn from(msg: &str) -> Self {
        DetectarError::Other(msg.to_string())
    }
}

impl From<String> for DetectarError {
    fn from(msg: String) -> Self {
        DetectarError::Other(msg)
    }
}

impl DetectarError {
    /// Create a schema error with descriptive context.
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create an empty input error.
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::EmptyInput {
            context: context.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, DetectarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_not_found_display() {
        let err = DetectarError::SourceNotFound {
            path: "/no/such/file.csv".to_string(),
        };
        assert!(err.to_string().contains("Source not found"));
        assert!(err.to_string().contains("/no/such/file.csv"));
    }

    #[test]
    fn test_insufficient_samples_display() {
        let err = DetectarError::InsufficientSamples {
            class: 1,
            available: 3,
            required: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("class 1"));
        assert!(msg.contains("3 available"));
        assert!(msg.contains("6 required"));
    }

    #[test]
    fn test_length_mismatch_display() {
        let err = DetectarError::LengthMismatch {
            expected: 10,
            actual: 8,
        };
        assert!(err.to_string().contains("expected 10"));
        assert!(err.to_string().contains("got 8"));
    }

    #[test]
    fn test_backend_training_display() {
        let err = DetectarError::BackendTraining {
            backend: "gbt".to_string(),
            message: "zero samples".to_string(),
        };
        assert!(err.to_string().contains("gbt"));
        assert!(err.to_string().contains("zero samples"));
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = DetectarError::InvalidHyperparameter {
            param: "test_fraction".to_string(),
            value: "1.5".to_string(),
            constraint: "0 < f < 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("test_fraction"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn test_from_str() {
        let err: DetectarError = "test error".into();
        assert!(matches!(err, DetectarError::Other(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: DetectarError = io_err.into();
        assert!(matches!(err, DetectarError::Io(_)));
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = DetectarError::Io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_other() {
        use std::error::Error;
        let err = DetectarError::empty_input("predictions");
        assert!(err.source().is_none());
    }
}
