use crate::error::{CloudError, Result};
use crate::resolve::select_unique_pool;
use crate::traits::NodePool;
use async_trait::async_trait;
use capstan_core::{Instance, OperationHandle, PoolContext};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const PROVIDER: &str = "gce";
const DEFAULT_BASE_URL: &str = "https://compute.googleapis.com/compute/v1";

/// Settings for the GCE-backed pool
#[derive(Debug, Clone)]
pub struct GceSettings {
    /// GCP project id
    pub project: String,
    /// Compute zone the instance group lives in (e.g. "us-central1-a")
    pub zone: String,
    /// OAuth2 access token; acquisition happens outside this core
    pub access_token: String,
}

/// GCE-backed node pool over zonal managed instance groups.
///
/// Growth and shrink both exist on this provider, but plain resize lets GCE
/// pick the victims; controlled shrink goes through `remove_instance`
/// (`deleteInstances` with an explicit instance URL).
pub struct GcePool {
    settings: GceSettings,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ManagerList {
    #[serde(default)]
    items: Vec<Manager>,
}

#[derive(Debug, Deserialize)]
struct Manager {
    name: String,
    #[serde(rename = "targetSize", default)]
    target_size: u64,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManagedInstanceList {
    #[serde(rename = "managedInstances", default)]
    managed_instances: Vec<ManagedInstance>,
}

#[derive(Debug, Deserialize)]
struct ManagedInstance {
    /// Full instance URL; the short name is its last path segment
    instance: String,
}

impl GcePool {
    pub fn new(settings: GceSettings) -> Self {
        Self {
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different management plane (tests, proxies)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn managers_url(&self) -> String {
        format!(
            "{}/projects/{}/zones/{}/instanceGroupManagers",
            self.base_url, self.settings.project, self.settings.zone
        )
    }

    async fn list_managers(&self) -> Result<Vec<Manager>> {
        let url = self.managers_url();
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.settings.access_token)
            .send()
            .await
            .map_err(|e| CloudError::provider_api(PROVIDER, "list", None, e.to_string()))?;

        let list: ManagerList = check(resp, "list").await?.json().await.map_err(|e| {
            CloudError::provider_api(PROVIDER, "list", None, format!("Failed to parse: {}", e))
        })?;

        Ok(list.items)
    }

    async fn manager(&self, name: &str) -> Result<Manager> {
        self.list_managers()
            .await?
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CloudError::pool_not_found(name))
    }

    /// POST an instance-group-manager action and parse the resulting operation
    async fn post_operation(
        &self,
        group: &str,
        action: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<OperationHandle> {
        let url = format!("{}/{}/{}", self.managers_url(), group, action);
        debug!("POST {}", url);

        let mut req = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.access_token)
            .query(query);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| CloudError::provider_api(PROVIDER, action, None, e.to_string()))?;

        let op: Operation = check(resp, action).await?.json().await.map_err(|e| {
            CloudError::provider_api(PROVIDER, action, None, format!("Failed to parse: {}", e))
        })?;

        Ok(OperationHandle {
            id: op.name,
            status: op.status,
        })
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

/// Short instance name from a GCE instance URL
fn instance_name_from_url(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[async_trait]
impl NodePool for GcePool {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn resolve(&self, hint: &str) -> Result<PoolContext> {
        let names: Vec<String> = self
            .list_managers()
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect();
        let name = select_unique_pool(PROVIDER, hint, &names)?;
        Ok(PoolContext::new(name))
    }

    async fn grow_to(&self, context: &PoolContext, target: u64) -> Result<OperationHandle> {
        // GCE resize accepts any size; the provider picks victims on shrink,
        // which is exactly why controlled shrink uses remove_instance.
        debug!(pool = %context, target, "Resizing instance group");
        self.post_operation(
            &context.name,
            "resize",
            &[("size", target.to_string())],
            None,
        )
        .await
    }

    async fn remove_instance(
        &self,
        context: &PoolContext,
        node_name: &str,
    ) -> Result<OperationHandle> {
        let members = self.list_members(context).await?;
        let target = members
            .iter()
            .find(|i| i.reference.contains(node_name))
            .ok_or_else(|| CloudError::instance_not_found(&context.name, node_name))?;

        debug!(pool = %context, node = node_name, "Shutting down node");
        self.post_operation(
            &context.name,
            "deleteInstances",
            &[],
            Some(serde_json::json!({ "instances": [target.reference] })),
        )
        .await
    }

    async fn list_members(&self, context: &PoolContext) -> Result<Vec<Instance>> {
        let url = format!("{}/{}/listManagedInstances", self.managers_url(), context.name);
        debug!("POST {}", url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.access_token)
            .send()
            .await
            .map_err(|e| {
                CloudError::provider_api(PROVIDER, "listManagedInstances", None, e.to_string())
            })?;

        let list: ManagedInstanceList = check(resp, "listManagedInstances")
            .await?
            .json()
            .await
            .map_err(|e| {
                CloudError::provider_api(
                    PROVIDER,
                    "listManagedInstances",
                    None,
                    format!("Failed to parse: {}", e),
                )
            })?;

        Ok(list
            .managed_instances
            .into_iter()
            .map(|m| {
                let name = instance_name_from_url(&m.instance).to_string();
                Instance::new(name, m.instance)
            })
            .collect())
    }

    async fn current_size(&self, context: &PoolContext) -> Result<u64> {
        Ok(self.manager(&context.name).await?.target_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_name_is_last_url_segment() {
        assert_eq!(
            instance_name_from_url(
                "https://www.googleapis.com/compute/v1/projects/p/zones/z/instances/worker-7"
            ),
            "worker-7"
        );
        assert_eq!(instance_name_from_url("worker-7"), "worker-7");
    }
}
