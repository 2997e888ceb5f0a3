use serde::{Deserialize, Serialize};
use std::fmt;

/// One worker machine as known to the cluster control plane.
///
/// This is a read model: it is built fresh from a live inventory snapshot on
/// every control-loop iteration and is never mutated in memory. Changing the
/// cordon state of a real node goes through
/// `ClusterInventory::set_unschedulable`, after which the next snapshot
/// reflects the new state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    /// Unique stable node name within the cluster
    pub name: String,
    /// Current cordon state (true = no new workloads are placed here)
    #[serde(default)]
    pub unschedulable: bool,
}

impl ClusterNode {
    pub fn new(name: impl Into<String>, unschedulable: bool) -> Self {
        Self {
            name: name.into(),
            unschedulable,
        }
    }
}

impl fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.name,
            if self.unschedulable {
                "unschedulable"
            } else {
                "schedulable"
            }
        )
    }
}

/// The provider resource a logical scaling context resolved to.
///
/// Produced only by `NodePool::resolve`, which requires the context hint to
/// match exactly one instance group / agent pool. Holding a `PoolContext`
/// means the ambiguity check already happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolContext {
    /// Provider-side instance group / agent pool name
    pub name: String,
}

impl PoolContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for PoolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One member of a provider pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Short instance name, matching the cluster node name
    pub name: String,
    /// Provider-specific handle needed to target this instance
    /// (GCE: full instance URL, Azure: scale-set instanceId)
    pub reference: String,
}

impl Instance {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
        }
    }
}

/// Handle for a provider-side asynchronous operation returned by a
/// mutating pool call. The core never polls these; the id is logged so an
/// operator can follow up in the provider console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    /// Provider-assigned operation identifier
    pub id: String,
    /// Status as reported at submission time, if any
    pub status: Option<String>,
}

impl OperationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
        }
    }

    pub fn with_status(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Some(status.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_node_display_shows_cordon_state() {
        let node = ClusterNode::new("worker-1", false);
        assert_eq!(node.to_string(), "worker-1 (schedulable)");

        let node = ClusterNode::new("worker-2", true);
        assert_eq!(node.to_string(), "worker-2 (unschedulable)");
    }

    #[test]
    fn cluster_node_deserializes_with_default_cordon_state() {
        let node: ClusterNode = serde_json::from_str(r#"{"name": "worker-1"}"#).unwrap();
        assert_eq!(node.name, "worker-1");
        assert!(!node.unschedulable);
    }

    #[test]
    fn operation_handle_with_status() {
        let op = OperationHandle::with_status("op-123", "PENDING");
        assert_eq!(op.id, "op-123");
        assert_eq!(op.status.as_deref(), Some("PENDING"));
    }
}
