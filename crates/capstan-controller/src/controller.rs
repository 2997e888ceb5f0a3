use crate::error::Result;
use crate::selection::{select_unschedulable, Selection};
use crate::traits::{ClusterInventory, ImagePrewarmer, Notifier};
use capstan_core::ClusterNode;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for the scaling controller
#[derive(Debug, Clone, Default)]
pub struct ScalingControllerConfig {
    /// Images to pre-populate on newly uncordoned nodes
    pub images: Vec<String>,
    /// Dry run: compute and log the selection, issue no mutations and no
    /// side effects
    pub test_mode: bool,
}

/// Which mutation a per-node failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyAction {
    Cordon,
    Uncordon,
    Prewarm,
}

/// One non-fatal per-node failure, collected while the batch continues
#[derive(Debug, Clone)]
pub struct ApplyFailure {
    pub node: String,
    pub action: ApplyAction,
    pub message: String,
}

/// Result of one `update_unschedulable` invocation.
///
/// `cordoned` / `uncordoned` list the nodes the selection chose; in test
/// mode they describe what would have changed. `net_change` is the signed
/// selection delta (cordons minus uncordons) regardless of per-node
/// failures, which are reported separately in `failures`.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub net_change: i64,
    pub cordoned: Vec<String>,
    pub uncordoned: Vec<String>,
    pub failures: Vec<ApplyFailure>,
}

/// Node scheduling controller: decides which specific nodes stop or resume
/// accepting workloads when the loop adjusts capacity, and applies the
/// decision against the cluster control plane.
///
/// Collaborators are injected at construction; the controller holds no
/// state between invocations and recomputes everything from the snapshot
/// it is handed.
pub struct ScalingController {
    inventory: Arc<dyn ClusterInventory>,
    prewarmer: Arc<dyn ImagePrewarmer>,
    notifier: Arc<dyn Notifier>,
    config: ScalingControllerConfig,
}

impl ScalingController {
    pub fn new(
        inventory: Arc<dyn ClusterInventory>,
        prewarmer: Arc<dyn ImagePrewarmer>,
        notifier: Arc<dyn Notifier>,
        config: ScalingControllerConfig,
    ) -> Self {
        Self {
            inventory,
            prewarmer,
            notifier,
            config,
        }
    }

    /// Ensure exactly `min(desired, nodes.len())` nodes are unschedulable.
    ///
    /// `priority` maps a node to its cordon priority (lower score = blocked
    /// first); when `None`, the default is the node's current pod count from
    /// the inventory, so the least-loaded nodes are disrupted first. Nodes
    /// that must never be cordoned must already be excluded from `nodes`.
    ///
    /// A failed mutation for one node never aborts the batch; failures are
    /// collected into the outcome and the remaining nodes proceed.
    pub async fn update_unschedulable(
        &self,
        nodes: &[ClusterNode],
        desired: usize,
        priority: Option<&(dyn Fn(&ClusterNode) -> f64 + Send + Sync)>,
    ) -> Result<ApplyOutcome> {
        info!(
            desired,
            total = nodes.len(),
            "Updating unschedulable flags to ensure {} nodes are unschedulable",
            desired
        );

        let selection = match priority {
            Some(score) => select_unschedulable(nodes, desired, score),
            None => {
                let pods = self.inventory.pods_per_node().await?;
                select_unschedulable(nodes, desired, |n: &ClusterNode| {
                    pods.get(&n.name).copied().unwrap_or(0) as f64
                })
            }
        };

        let mut outcome = ApplyOutcome {
            net_change: selection.net_change(),
            ..Default::default()
        };

        self.apply(nodes, &selection, &mut outcome).await;

        debug!("{} nodes newly blocked", outcome.cordoned.len());
        debug!("{} nodes newly unblocked", outcome.uncordoned.len());

        if self.config.test_mode {
            info!(
                cordon = ?outcome.cordoned,
                uncordon = ?outcome.uncordoned,
                "Test mode: no mutations were issued"
            );
            return Ok(outcome);
        }

        // Side effects only for invocations that actually moved nodes.
        let moved = !selection.to_cordon.is_empty() || !selection.to_uncordon.is_empty();
        if moved && selection.to_cordon.len() != selection.to_uncordon.len() {
            self.notifier
                .notify(&format!(
                    "{} nodes newly blocked, {} nodes newly unblocked",
                    selection.to_cordon.len(),
                    selection.to_uncordon.len()
                ))
                .await;
        }

        if !selection.to_uncordon.is_empty() {
            self.prewarm_uncordoned(nodes, &selection, &mut outcome)
                .await;
        }

        Ok(outcome)
    }

    /// Issue the cordon and uncordon commands, one node at a time
    async fn apply(&self, nodes: &[ClusterNode], selection: &Selection, outcome: &mut ApplyOutcome) {
        for &index in &selection.to_cordon {
            let name = &nodes[index].name;
            outcome.cordoned.push(name.clone());
            if self.config.test_mode {
                continue;
            }
            if let Err(e) = self.inventory.set_unschedulable(name, true).await {
                warn!(node = %name, "Failed to cordon node: {}", e);
                outcome.failures.push(ApplyFailure {
                    node: name.clone(),
                    action: ApplyAction::Cordon,
                    message: e.to_string(),
                });
            }
        }

        for &index in &selection.to_uncordon {
            let name = &nodes[index].name;
            outcome.uncordoned.push(name.clone());
            if self.config.test_mode {
                continue;
            }
            if let Err(e) = self.inventory.set_unschedulable(name, false).await {
                warn!(node = %name, "Failed to uncordon node: {}", e);
                outcome.failures.push(ApplyFailure {
                    node: name.clone(),
                    action: ApplyAction::Uncordon,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Pre-populate images on each newly uncordoned node so fresh workloads
    /// skip the cold pull
    async fn prewarm_uncordoned(
        &self,
        nodes: &[ClusterNode],
        selection: &Selection,
        outcome: &mut ApplyOutcome,
    ) {
        debug!("Populating images on newly schedulable nodes");
        for &index in &selection.to_uncordon {
            let name = &nodes[index].name;
            for image in &self.config.images {
                if let Err(e) = self.prewarmer.prewarm(name, image).await {
                    warn!(node = %name, image = %image, "Image prewarm failed: {}", e);
                    outcome.failures.push(ApplyFailure {
                        node: name.clone(),
                        action: ApplyAction::Prewarm,
                        message: e.to_string(),
                    });
                }
            }
        }
        debug!("Populate finished");
    }
}
