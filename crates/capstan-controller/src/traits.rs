use crate::error::Result;
use async_trait::async_trait;
use capstan_core::ClusterNode;
use std::collections::HashMap;

/// Trait for the cluster control plane the controller mutates
///
/// The controller needs exactly three operations; it never depends on a
/// richer cluster-state shape. Implementations talk to the real control
/// plane; `MockInventory` backs the tests and the driver's snapshot mode.
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// Current node snapshot
    ///
    /// Called at the start of every invocation; nothing is cached across
    /// invocations, so each run reasons about live state.
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>>;

    /// Pod count per node name, for the default cordon priority
    async fn pods_per_node(&self) -> Result<HashMap<String, usize>>;

    /// Set the cordon state of one node
    async fn set_unschedulable(&self, node_name: &str, unschedulable: bool) -> Result<()>;
}

/// Trait for pre-populating container images on a node
///
/// Invoked once per (newly-uncordoned node, image) pair so workloads
/// scheduled onto a freshly reactivated node skip the cold pull.
#[async_trait]
pub trait ImagePrewarmer: Send + Sync {
    async fn prewarm(&self, node_name: &str, image: &str) -> Result<()>;
}

/// Trait for the best-effort notification sink
///
/// A missing or failed notification must never fail the control loop, so
/// the contract is infallible: implementations swallow their own errors.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}
