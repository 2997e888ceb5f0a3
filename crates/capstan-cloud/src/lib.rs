//! Capstan Cloud - provider-polymorphic node pool abstraction
//!
//! This crate provides:
//! - The `NodePool` trait: resolve a scaling context, grow to a target
//!   size, remove a named instance, list members
//! - GCE (managed instance groups) and Azure (container-service agent
//!   pools) implementations over their REST management planes
//! - `MockPool` for testing without a provider

pub mod azure;
pub mod error;
pub mod gce;
pub mod mock;
pub mod resolve;
pub mod traits;

// Re-export primary types
pub use azure::{AzurePool, AzureSettings};
pub use error::{CloudError, Result};
pub use gce::{GcePool, GceSettings};
pub use mock::MockPool;
pub use traits::NodePool;
