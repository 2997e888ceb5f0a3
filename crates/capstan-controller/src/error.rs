use miette::Diagnostic;
use thiserror::Error;

/// Controller error type
///
/// Only failures that abort a whole invocation live here. A single failed
/// cordon/uncordon/prewarm call is deliberately not an error variant: those
/// are collected per node into `ApplyOutcome::failures` so one flaky node
/// cannot block progress on the rest of the batch.
#[derive(Error, Debug, Diagnostic)]
pub enum ControllerError {
    /// Cluster inventory call failed
    #[error("Inventory operation failed: {message}")]
    #[diagnostic(
        code(capstan::controller::inventory_error),
        help("The cluster control plane could not be read. Check connectivity and credentials, then re-invoke")
    )]
    InventoryError { message: String },

    /// Core library error
    #[error(transparent)]
    #[diagnostic(transparent)]
    CoreError(#[from] capstan_core::CoreError),

    /// Internal error
    #[error("Internal controller error: {message}")]
    #[diagnostic(
        code(capstan::controller::internal_error),
        help("This is likely a bug in capstan-controller. Please report it")
    )]
    InternalError { message: String },
}

/// Result type alias for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

impl ControllerError {
    pub fn inventory_error(message: impl Into<String>) -> Self {
        Self::InventoryError {
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
