use thiserror::Error;

/// Validation errors for wire primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When a required list or value is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Field name that was empty.
        field: &'static str,
    },
    /// When a digest names an algorithm other than `sha-256`.
    #[error("unsupported digest algorithm '{0}'")]
    UnsupportedAlgorithm(String),
}
