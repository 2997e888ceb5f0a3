use crate::error::{CloudError, Result};
use crate::resolve::{check_growth, select_unique_pool};
use crate::traits::NodePool;
use async_trait::async_trait;
use capstan_core::{Instance, OperationHandle, PoolContext};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const PROVIDER: &str = "azure";
const DEFAULT_BASE_URL: &str = "https://management.azure.com";
const CONTAINER_SERVICE_API: &str = "2017-07-01";
const COMPUTE_API: &str = "2024-07-01";

/// Settings for the Azure-backed pool
#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// Azure subscription id
    pub subscription_id: String,
    /// Resource group holding the container service
    pub resource_group: String,
    /// Container service name whose agent pools back the cluster
    pub container_service: String,
    /// ARM access token; acquisition happens outside this core
    pub access_token: String,
}

/// Azure-backed node pool over container-service agent pools.
///
/// Growth rewrites the agent pool count on the container service; Azure
/// offers no victim selection through that path, so `grow_to` is defined
/// only for growth and shrink deallocates a named scale-set VM.
pub struct AzurePool {
    settings: AzureSettings,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ScaleSetVmList {
    #[serde(default)]
    value: Vec<ScaleSetVm>,
}

#[derive(Debug, Deserialize)]
struct ScaleSetVm {
    #[serde(rename = "instanceId")]
    instance_id: String,
    #[serde(default)]
    name: String,
}

impl AzurePool {
    pub fn new(settings: AzureSettings) -> Self {
        Self {
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different management plane (tests, sovereign clouds)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn container_service_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ContainerService/containerServices/{}",
            self.base_url,
            self.settings.subscription_id,
            self.settings.resource_group,
            self.settings.container_service
        )
    }

    fn scale_set_url(&self, pool: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachineScaleSets/{}",
            self.base_url,
            self.settings.subscription_id,
            self.settings.resource_group,
            pool
        )
    }

    /// GET the container service resource, agent pool profiles included
    async fn get_container_service(&self) -> Result<Value> {
        let url = self.container_service_url();
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.settings.access_token)
            .query(&[("api-version", CONTAINER_SERVICE_API)])
            .send()
            .await
            .map_err(|e| CloudError::provider_api(PROVIDER, "get", None, e.to_string()))?;

        check(resp, "get").await?.json().await.map_err(|e| {
            CloudError::provider_api(PROVIDER, "get", None, format!("Failed to parse: {}", e))
        })
    }

    /// Agent pool profiles as (name, count) pairs
    fn agent_pools(service: &Value) -> Vec<(String, u64)> {
        service["properties"]["agentPoolProfiles"]
            .as_array()
            .map(|pools| {
                pools
                    .iter()
                    .filter_map(|p| {
                        let name = p["name"].as_str()?.to_string();
                        let count = p["count"].as_u64().unwrap_or(0);
                        Some((name, count))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn pool_count(service: &Value, pool: &str) -> Result<u64> {
        Self::agent_pools(service)
            .into_iter()
            .find(|(name, _)| name == pool)
            .map(|(_, count)| count)
            .ok_or_else(|| CloudError::pool_not_found(pool))
    }
}

/// Map a non-success response to a fatal provider error
async fn check(resp: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(CloudError::provider_api(PROVIDER, operation, Some(status), body))
}

#[async_trait]
impl NodePool for AzurePool {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn resolve(&self, hint: &str) -> Result<PoolContext> {
        let service = self.get_container_service().await?;
        let names: Vec<String> = Self::agent_pools(&service)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let name = select_unique_pool(PROVIDER, hint, &names)?;
        Ok(PoolContext::new(name))
    }

    async fn grow_to(&self, context: &PoolContext, target: u64) -> Result<OperationHandle> {
        // Read-modify-write on the container service. The growth invariant is
        // checked against the freshly read count; on violation the PUT is
        // never issued.
        let mut service = self.get_container_service().await?;
        let current = Self::pool_count(&service, &context.name)?;
        check_growth(&context.name, current, target)?;

        debug!(pool = %context, current, target, "Resizing agent pool");

        let pools = service["properties"]["agentPoolProfiles"]
            .as_array_mut()
            .ok_or_else(|| CloudError::pool_not_found(&context.name))?;
        for pool in pools.iter_mut() {
            if pool["name"].as_str() == Some(context.name.as_str()) {
                pool["count"] = Value::from(target);
            }
        }

        let url = self.container_service_url();
        debug!("PUT {}", url);

        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.settings.access_token)
            .query(&[("api-version", CONTAINER_SERVICE_API)])
            .json(&service)
            .send()
            .await
            .map_err(|e| CloudError::provider_api(PROVIDER, "resize", None, e.to_string()))?;

        let body: Value = check(resp, "resize").await?.json().await.map_err(|e| {
            CloudError::provider_api(PROVIDER, "resize", None, format!("Failed to parse: {}", e))
        })?;

        let state = body["properties"]["provisioningState"]
            .as_str()
            .map(|s| s.to_string());
        Ok(OperationHandle {
            id: format!("{}/resize", self.settings.container_service),
            status: state,
        })
    }

    async fn remove_instance(
        &self,
        context: &PoolContext,
        node_name: &str,
    ) -> Result<OperationHandle> {
        let members = self.list_members(context).await?;
        let target = members
            .iter()
            .find(|i| i.name.contains(node_name))
            .ok_or_else(|| CloudError::instance_not_found(&context.name, node_name))?;

        debug!(pool = %context, node = node_name, instance_id = %target.reference, "Deallocating node");

        let url = format!(
            "{}/virtualmachines/{}/deallocate",
            self.scale_set_url(&context.name),
            target.reference
        );
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.access_token)
            .query(&[("api-version", COMPUTE_API)])
            .send()
            .await
            .map_err(|e| CloudError::provider_api(PROVIDER, "deallocate", None, e.to_string()))?;

        check(resp, "deallocate").await?;
        Ok(OperationHandle::with_status(
            format!("{}/{}/deallocate", context.name, target.reference),
            "Accepted",
        ))
    }

    async fn list_members(&self, context: &PoolContext) -> Result<Vec<Instance>> {
        let url = format!("{}/virtualMachines", self.scale_set_url(&context.name));
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.settings.access_token)
            .query(&[("api-version", COMPUTE_API)])
            .send()
            .await
            .map_err(|e| CloudError::provider_api(PROVIDER, "listVMs", None, e.to_string()))?;

        let list: ScaleSetVmList = check(resp, "listVMs").await?.json().await.map_err(|e| {
            CloudError::provider_api(PROVIDER, "listVMs", None, format!("Failed to parse: {}", e))
        })?;

        Ok(list
            .value
            .into_iter()
            .map(|vm| Instance::new(vm.name, vm.instance_id))
            .collect())
    }

    async fn current_size(&self, context: &PoolContext) -> Result<u64> {
        let service = self.get_container_service().await?;
        Self::pool_count(&service, &context.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_fixture() -> Value {
        json!({
            "properties": {
                "agentPoolProfiles": [
                    { "name": "agentpool0", "count": 5 },
                    { "name": "gpu-pool", "count": 2 }
                ]
            }
        })
    }

    #[test]
    fn agent_pools_parses_profiles() {
        let pools = AzurePool::agent_pools(&service_fixture());
        assert_eq!(
            pools,
            vec![("agentpool0".to_string(), 5), ("gpu-pool".to_string(), 2)]
        );
    }

    #[test]
    fn pool_count_for_missing_pool_errors() {
        let err = AzurePool::pool_count(&service_fixture(), "nope").unwrap_err();
        assert!(matches!(err, CloudError::PoolNotFound { .. }));
    }

    #[test]
    fn agent_pools_tolerates_absent_profiles() {
        assert!(AzurePool::agent_pools(&json!({})).is_empty());
    }
}
