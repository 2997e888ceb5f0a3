use crate::error::{ControllerError, Result};
use crate::traits::{ClusterInventory, ImagePrewarmer, Notifier};
use async_trait::async_trait;
use capstan_core::ClusterNode;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory cluster inventory for tests and the driver's snapshot mode
///
/// Tracks cordon state and pod counts per node, records every mutation in
/// order, and can be told to fail mutations for specific nodes so the
/// collect-and-report path is exercisable.
pub struct MockInventory {
    nodes: Arc<RwLock<Vec<ClusterNode>>>,
    pods: Arc<RwLock<HashMap<String, usize>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    mutations: Arc<RwLock<Vec<(String, bool)>>>,
}

impl MockInventory {
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(Vec::new())),
            pods: Arc::new(RwLock::new(HashMap::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            mutations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Build an inventory from an existing snapshot plus pod counts
    pub fn from_snapshot(nodes: Vec<ClusterNode>, pods: HashMap<String, usize>) -> Self {
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            pods: Arc::new(RwLock::new(pods)),
            failing: Arc::new(RwLock::new(HashSet::new())),
            mutations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add_node(&self, name: &str, unschedulable: bool, pods: usize) {
        self.nodes
            .write()
            .await
            .push(ClusterNode::new(name, unschedulable));
        self.pods.write().await.insert(name.to_string(), pods);
    }

    /// Make `set_unschedulable` fail for this node
    pub async fn fail_node(&self, name: &str) {
        self.failing.write().await.insert(name.to_string());
    }

    /// Every (node, unschedulable) mutation issued, in order
    pub async fn mutations(&self) -> Vec<(String, bool)> {
        self.mutations.read().await.clone()
    }
}

impl Default for MockInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterInventory for MockInventory {
    async fn list_nodes(&self) -> Result<Vec<ClusterNode>> {
        Ok(self.nodes.read().await.clone())
    }

    async fn pods_per_node(&self) -> Result<HashMap<String, usize>> {
        Ok(self.pods.read().await.clone())
    }

    async fn set_unschedulable(&self, node_name: &str, unschedulable: bool) -> Result<()> {
        if self.failing.read().await.contains(node_name) {
            return Err(ControllerError::inventory_error(format!(
                "injected failure for node '{}'",
                node_name
            )));
        }

        let mut nodes = self.nodes.write().await;
        let node = nodes
            .iter_mut()
            .find(|n| n.name == node_name)
            .ok_or_else(|| {
                ControllerError::inventory_error(format!("unknown node '{}'", node_name))
            })?;
        node.unschedulable = unschedulable;

        self.mutations
            .write()
            .await
            .push((node_name.to_string(), unschedulable));
        debug!(node = node_name, unschedulable, "Mock: cordon state updated");
        Ok(())
    }
}

/// Prewarmer that records every (node, image) call
pub struct RecordingPrewarmer {
    calls: Arc<RwLock<Vec<(String, String)>>>,
}

impl RecordingPrewarmer {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.read().await.clone()
    }
}

impl Default for RecordingPrewarmer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImagePrewarmer for RecordingPrewarmer {
    async fn prewarm(&self, node_name: &str, image: &str) -> Result<()> {
        self.calls
            .write()
            .await
            .push((node_name.to_string(), image.to_string()));
        Ok(())
    }
}

/// Notifier that records every message
pub struct RecordingNotifier {
    messages: Arc<RwLock<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.read().await.clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.write().await.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_inventory_tracks_mutations() {
        let inventory = MockInventory::new();
        inventory.add_node("n1", false, 2).await;

        inventory.set_unschedulable("n1", true).await.unwrap();
        let nodes = inventory.list_nodes().await.unwrap();
        assert!(nodes[0].unschedulable);
        assert_eq!(inventory.mutations().await, vec![("n1".to_string(), true)]);
    }

    #[tokio::test]
    async fn mock_inventory_unknown_node_errors() {
        let inventory = MockInventory::new();
        let err = inventory.set_unschedulable("ghost", true).await.unwrap_err();
        assert!(matches!(err, ControllerError::InventoryError { .. }));
    }

    #[tokio::test]
    async fn from_snapshot_serves_given_state() {
        let nodes = vec![ClusterNode::new("a", true)];
        let pods = HashMap::from([("a".to_string(), 7)]);
        let inventory = MockInventory::from_snapshot(nodes, pods);

        assert_eq!(inventory.list_nodes().await.unwrap().len(), 1);
        assert_eq!(inventory.pods_per_node().await.unwrap()["a"], 7);
    }
}
