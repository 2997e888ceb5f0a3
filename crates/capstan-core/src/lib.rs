//! Capstan Core - Fundamental types for the Capstan cluster autoscaling loop
//!
//! This crate provides:
//! - The cluster node read model shared by the controller and the driver
//! - Provider-neutral pool identity and instance descriptors
//! - Error types with miette diagnostics

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{ClusterNode, Instance, OperationHandle, PoolContext};

/// Deserialize a value from JSON
pub fn from_json<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_json::from_str(data)
        .map_err(|e| CoreError::serialization_error(format!("Failed to deserialize from JSON: {}", e)))
}

/// Serialize a value to pretty JSON
pub fn to_json_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::serialization_error(format!("Failed to serialize to JSON: {}", e)))
}
