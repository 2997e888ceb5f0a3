//! Capstan Controller - node scheduling for the autoscaling loop
//!
//! This crate provides:
//! - The priority-based cordon/uncordon selection algorithm
//! - The scaling controller that applies a selection against the cluster
//!   control plane with collect-and-report failure semantics
//! - Collaborator traits (inventory, image prewarm, notification) with
//!   mock implementations for testing

pub mod controller;
pub mod error;
pub mod mock;
pub mod notify;
pub mod selection;
pub mod traits;

// Re-export primary types
pub use controller::{
    ApplyAction, ApplyFailure, ApplyOutcome, ScalingController, ScalingControllerConfig,
};
pub use error::{ControllerError, Result};
pub use mock::{MockInventory, RecordingNotifier, RecordingPrewarmer};
pub use notify::{NullNotifier, SlackNotifier};
pub use selection::{select_unschedulable, Selection};
pub use traits::{ClusterInventory, ImagePrewarmer, Notifier};
