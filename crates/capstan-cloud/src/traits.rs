use crate::error::Result;
use async_trait::async_trait;
use capstan_core::{Instance, OperationHandle, PoolContext};

/// Trait for provider-backed node pool implementations
///
/// This trait abstracts over a managed instance group (GCE) or agent pool
/// (Azure). The capability set is deliberately asymmetric: growth takes a
/// target count, shrink targets a named instance. A uniform "set size" API
/// would hand victim selection to the provider and defeat the scheduling
/// controller, which has already decided which node should go.
///
/// Every method that touches the management plane treats transport or API
/// failure as fatal for the invocation; nothing here retries.
#[async_trait]
pub trait NodePool: Send + Sync {
    /// Short provider name for logs and diagnostics ("gce", "azure", ...)
    fn provider(&self) -> &str;

    /// Resolve a context hint to exactly one pool
    ///
    /// Matches the hint as a substring against the provider's pool listing.
    /// Zero matches or more than one match is fatal; an ambiguous scaling
    /// target is an operator error, never silently defaulted.
    async fn resolve(&self, hint: &str) -> Result<PoolContext>;

    /// Request the pool be resized to `target` members
    ///
    /// Defined only for growth on providers that pick their own victims on
    /// shrink (Azure rejects `target < current` before issuing the
    /// mutation). Shrinking goes through `remove_instance`.
    async fn grow_to(&self, context: &PoolContext, target: u64) -> Result<OperationHandle>;

    /// Remove the single named instance from the pool
    ///
    /// The preferred shrink path: node selection stays with the caller.
    async fn remove_instance(
        &self,
        context: &PoolContext,
        node_name: &str,
    ) -> Result<OperationHandle>;

    /// Enumerate current pool membership
    async fn list_members(&self, context: &PoolContext) -> Result<Vec<Instance>>;

    /// Current member count of the pool
    async fn current_size(&self, context: &PoolContext) -> Result<u64>;
}
