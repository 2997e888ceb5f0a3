use miette::Diagnostic;
use thiserror::Error;

/// Core error type shared across the capstan crates
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(capstan::core::serialization_error),
        help("Check that the input is valid JSON with the expected shape")
    )]
    SerializationError { message: String },

    /// Invalid node snapshot
    #[error("Invalid node snapshot: {message}")]
    #[diagnostic(
        code(capstan::core::invalid_snapshot),
        help("A node snapshot must list every node exactly once with a non-empty name")
    )]
    InvalidSnapshot { message: String },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }
}
