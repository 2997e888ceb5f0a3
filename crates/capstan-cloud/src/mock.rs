use crate::error::{CloudError, Result};
use crate::resolve::{check_growth, select_unique_pool};
use crate::traits::NodePool;
use async_trait::async_trait;
use capstan_core::{Instance, OperationHandle, PoolContext};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory pool state for MockPool
#[derive(Debug, Clone)]
struct PoolState {
    members: Vec<Instance>,
}

/// Mock node pool for testing without a cloud provider
///
/// Maintains an in-memory pool registry and simulates membership changes.
/// `growth_only()` switches on the Azure-style resize precondition so the
/// grow path can be exercised both ways.
pub struct MockPool {
    pools: Arc<RwLock<HashMap<String, PoolState>>>,
    next_op: Arc<RwLock<u64>>,
    growth_only: bool,
}

impl MockPool {
    pub fn new() -> Self {
        Self {
            pools: Arc::new(RwLock::new(HashMap::new())),
            next_op: Arc::new(RwLock::new(1)),
            growth_only: false,
        }
    }

    /// Enforce the grow-only resize precondition, like the Azure variant
    pub fn growth_only(mut self) -> Self {
        self.growth_only = true;
        self
    }

    /// Seed a pool with the given member names
    pub async fn add_pool(&self, name: &str, members: &[&str]) {
        let state = PoolState {
            members: members
                .iter()
                .map(|m| Instance::new(*m, format!("mock/{}/{}", name, m)))
                .collect(),
        };
        self.pools.write().await.insert(name.to_string(), state);
    }

    async fn next_operation(&self) -> OperationHandle {
        let mut next = self.next_op.write().await;
        let op = OperationHandle::with_status(format!("mock-op-{}", *next), "DONE");
        *next += 1;
        op
    }
}

impl Default for MockPool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodePool for MockPool {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn resolve(&self, hint: &str) -> Result<PoolContext> {
        let pools = self.pools.read().await;
        let names: Vec<String> = pools.keys().cloned().collect();
        let name = select_unique_pool("mock", hint, &names)?;
        Ok(PoolContext::new(name))
    }

    async fn grow_to(&self, context: &PoolContext, target: u64) -> Result<OperationHandle> {
        let mut pools = self.pools.write().await;
        let pool = pools
            .get_mut(&context.name)
            .ok_or_else(|| CloudError::pool_not_found(&context.name))?;

        let current = pool.members.len() as u64;
        if self.growth_only {
            check_growth(&context.name, current, target)?;
        }

        // Pad with synthetic members up to the target; plain shrink drops
        // from the tail, mimicking provider-chosen victims.
        while (pool.members.len() as u64) < target {
            let name = format!("{}-m{}", context.name, pool.members.len());
            let reference = format!("mock/{}/{}", context.name, name);
            pool.members.push(Instance::new(name, reference));
        }
        pool.members.truncate(target as usize);

        debug!(pool = %context, target, "Mock: pool resized");
        Ok(self.next_operation().await)
    }

    async fn remove_instance(
        &self,
        context: &PoolContext,
        node_name: &str,
    ) -> Result<OperationHandle> {
        let mut pools = self.pools.write().await;
        let pool = pools
            .get_mut(&context.name)
            .ok_or_else(|| CloudError::pool_not_found(&context.name))?;

        let position = pool
            .members
            .iter()
            .position(|i| i.name.contains(node_name))
            .ok_or_else(|| CloudError::instance_not_found(&context.name, node_name))?;

        pool.members.remove(position);
        debug!(pool = %context, node = node_name, "Mock: instance removed");
        Ok(self.next_operation().await)
    }

    async fn list_members(&self, context: &PoolContext) -> Result<Vec<Instance>> {
        let pools = self.pools.read().await;
        let pool = pools
            .get(&context.name)
            .ok_or_else(|| CloudError::pool_not_found(&context.name))?;
        Ok(pool.members.clone())
    }

    async fn current_size(&self, context: &PoolContext) -> Result<u64> {
        let pools = self.pools.read().await;
        let pool = pools
            .get(&context.name)
            .ok_or_else(|| CloudError::pool_not_found(&context.name))?;
        Ok(pool.members.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_finds_unique_pool() {
        let pool = MockPool::new();
        pool.add_pool("prod-west", &["a", "b"]).await;
        pool.add_pool("staging", &["c"]).await;

        let ctx = pool.resolve("prod").await.unwrap();
        assert_eq!(ctx.name, "prod-west");
    }

    #[tokio::test]
    async fn resolve_rejects_ambiguous_hint() {
        let pool = MockPool::new();
        pool.add_pool("prod-west", &[]).await;
        pool.add_pool("prod-east", &[]).await;

        let err = pool.resolve("prod").await.unwrap_err();
        assert!(matches!(err, CloudError::AmbiguousContext { .. }));
    }

    #[tokio::test]
    async fn grow_to_pads_membership() {
        let pool = MockPool::new();
        pool.add_pool("prod", &["a"]).await;
        let ctx = pool.resolve("prod").await.unwrap();

        pool.grow_to(&ctx, 3).await.unwrap();
        assert_eq!(pool.current_size(&ctx).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn growth_only_mode_rejects_shrink_by_resize() {
        let pool = MockPool::new().growth_only();
        pool.add_pool("prod", &["a", "b", "c", "d", "e"]).await;
        let ctx = pool.resolve("prod").await.unwrap();

        let err = pool.grow_to(&ctx, 2).await.unwrap_err();
        assert!(matches!(
            err,
            CloudError::ShrinkViaResize {
                current: 5,
                requested: 2,
                ..
            }
        ));
        // No membership change happened.
        assert_eq!(pool.current_size(&ctx).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn remove_instance_targets_named_member() {
        let pool = MockPool::new();
        pool.add_pool("prod", &["a", "b", "c"]).await;
        let ctx = pool.resolve("prod").await.unwrap();

        pool.remove_instance(&ctx, "b").await.unwrap();

        let members = pool.list_members(&ctx).await.unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn remove_unknown_instance_errors() {
        let pool = MockPool::new();
        pool.add_pool("prod", &["a"]).await;
        let ctx = pool.resolve("prod").await.unwrap();

        let err = pool.remove_instance(&ctx, "zz").await.unwrap_err();
        assert!(matches!(err, CloudError::InstanceNotFound { .. }));
    }
}
