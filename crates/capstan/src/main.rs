use capstan_cloud::{AzurePool, AzureSettings, GcePool, GceSettings, NodePool};
use capstan_controller::{
    ClusterInventory, MockInventory, RecordingPrewarmer, ScalingController,
    ScalingControllerConfig, SlackNotifier,
};
use capstan_core::ClusterNode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "capstan", about = "Capstan cluster autoscaling control loop")]
struct Cli {
    /// Dry run: compute and log decisions, mutate nothing
    #[arg(long, global = true)]
    test: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Provider {
    Gce,
    Azure,
}

#[derive(Args)]
struct ProviderOpts {
    /// Cloud provider backing the node pool
    #[arg(long, value_enum)]
    provider: Provider,

    /// Context hint identifying the instance group / agent pool
    #[arg(long, env = "CAPSTAN_CONTEXT")]
    context: String,

    /// GCP project id
    #[arg(long, env = "CAPSTAN_GCE_PROJECT", default_value = "")]
    gce_project: String,

    /// GCE compute zone
    #[arg(long, env = "CAPSTAN_GCE_ZONE", default_value = "us-central1-a")]
    gce_zone: String,

    /// Azure subscription id
    #[arg(long, env = "CAPSTAN_AZURE_SUBSCRIPTION", default_value = "")]
    azure_subscription: String,

    /// Azure resource group
    #[arg(long, env = "CAPSTAN_AZURE_RESOURCE_GROUP", default_value = "")]
    azure_resource_group: String,

    /// Azure container service name
    #[arg(long, env = "CAPSTAN_AZURE_CONTAINER_SERVICE", default_value = "")]
    azure_container_service: String,

    /// Provider access token; acquisition is the operator's concern
    #[arg(long, env = "CAPSTAN_ACCESS_TOKEN", default_value = "")]
    access_token: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Cordon/uncordon nodes so a target count is unschedulable
    Cordon {
        /// Desired number of unschedulable nodes
        #[arg(long)]
        count: usize,
        /// JSON node snapshot (nodes + pod counts) to run against
        #[arg(long)]
        nodes_file: String,
        /// Images to pre-populate on newly uncordoned nodes
        #[arg(long, value_delimiter = ':', env = "CAPSTAN_IMAGES")]
        images: Vec<String>,
        /// Slack token for notifications (omit to disable)
        #[arg(long, env = "SLACK_TOKEN")]
        slack_token: Option<String>,
        /// Slack channel for notifications
        #[arg(long, env = "SLACK_CHANNEL", default_value = "C48QN9GHK")]
        slack_channel: String,
    },
    /// Resolve a context hint to a single pool
    Resolve {
        #[command(flatten)]
        provider: ProviderOpts,
    },
    /// List current pool membership
    Members {
        #[command(flatten)]
        provider: ProviderOpts,
    },
    /// Grow the pool to a target size
    Grow {
        #[command(flatten)]
        provider: ProviderOpts,
        /// Target member count
        #[arg(long)]
        size: u64,
    },
    /// Remove one named instance from the pool
    Remove {
        #[command(flatten)]
        provider: ProviderOpts,
        /// Node name to remove
        #[arg(long)]
        node: String,
    },
}

/// On-disk node snapshot consumed by `cordon`
///
/// Live control-plane retrieval is a separate collaborator; the driver
/// works from a snapshot an operator or an upstream job wrote out.
#[derive(Debug, Deserialize)]
struct NodeSnapshot {
    nodes: Vec<ClusterNode>,
    #[serde(default)]
    pods: HashMap<String, usize>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Cordon {
            count,
            nodes_file,
            images,
            slack_token,
            slack_channel,
        } => {
            run_cordon(
                count,
                &nodes_file,
                images,
                slack_token,
                &slack_channel,
                cli.test,
            )
            .await
        }
        Commands::Resolve { provider } => {
            let pool = build_pool(&provider);
            let ctx = pool.resolve(&provider.context).await?;
            println!("{}", ctx);
            Ok(())
        }
        Commands::Members { provider } => {
            let pool = build_pool(&provider);
            let ctx = pool.resolve(&provider.context).await?;
            for member in pool.list_members(&ctx).await? {
                println!("{}\t{}", member.name, member.reference);
            }
            Ok(())
        }
        Commands::Grow { provider, size } => {
            let pool = build_pool(&provider);
            let ctx = pool.resolve(&provider.context).await?;
            if cli.test {
                info!(pool = %ctx, size, "Test mode: would resize pool");
                return Ok(());
            }
            let op = pool.grow_to(&ctx, size).await?;
            info!(pool = %ctx, operation = %op.id, "Resize submitted");
            Ok(())
        }
        Commands::Remove { provider, node } => {
            let pool = build_pool(&provider);
            let ctx = pool.resolve(&provider.context).await?;
            if cli.test {
                info!(pool = %ctx, node = %node, "Test mode: would remove instance");
                return Ok(());
            }
            let op = pool.remove_instance(&ctx, &node).await?;
            info!(pool = %ctx, node = %node, operation = %op.id, "Removal submitted");
            Ok(())
        }
    }
}

fn build_pool(opts: &ProviderOpts) -> Arc<dyn NodePool> {
    match opts.provider {
        Provider::Gce => Arc::new(GcePool::new(GceSettings {
            project: opts.gce_project.clone(),
            zone: opts.gce_zone.clone(),
            access_token: opts.access_token.clone(),
        })),
        Provider::Azure => Arc::new(AzurePool::new(AzureSettings {
            subscription_id: opts.azure_subscription.clone(),
            resource_group: opts.azure_resource_group.clone(),
            container_service: opts.azure_container_service.clone(),
            access_token: opts.access_token.clone(),
        })),
    }
}

async fn run_cordon(
    count: usize,
    nodes_file: &str,
    images: Vec<String>,
    slack_token: Option<String>,
    slack_channel: &str,
    test: bool,
) -> miette::Result<()> {
    let snapshot = load_snapshot(nodes_file)?;
    info!(
        nodes = snapshot.nodes.len(),
        count, "Loaded node snapshot"
    );

    let inventory = Arc::new(MockInventory::from_snapshot(
        snapshot.nodes,
        snapshot.pods,
    ));
    // No in-cluster prewarm service is wired into the driver yet; the
    // recording implementation keeps the callback path exercised.
    let prewarmer = Arc::new(RecordingPrewarmer::new());
    let notifier = Arc::new(SlackNotifier::new(slack_token, slack_channel));

    let controller = ScalingController::new(
        inventory.clone(),
        prewarmer,
        notifier,
        ScalingControllerConfig {
            images,
            test_mode: test,
        },
    );

    let nodes = inventory.list_nodes().await?;
    let outcome = controller.update_unschedulable(&nodes, count, None).await?;

    info!(
        net_change = outcome.net_change,
        cordoned = ?outcome.cordoned,
        uncordoned = ?outcome.uncordoned,
        "Cordon pass complete"
    );
    for failure in &outcome.failures {
        warn!(node = %failure.node, "Per-node failure: {}", failure.message);
    }

    println!("{}", outcome.net_change);
    Ok(())
}

fn load_snapshot(path: &str) -> miette::Result<NodeSnapshot> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read nodes file '{}': {}", path, e))?;
    let snapshot: NodeSnapshot = serde_json::from_str(&data)
        .map_err(|e| miette::miette!("Invalid node snapshot '{}': {}", path, e))?;
    if snapshot.nodes.is_empty() {
        warn!("Node snapshot '{}' lists no nodes", path);
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn snapshot_parses_nodes_and_pods() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"nodes": [{{"name": "w1", "unschedulable": true}}, {{"name": "w2"}}],
                "pods": {{"w1": 3, "w2": 0}}}}"#
        )
        .unwrap();

        let snapshot = load_snapshot(file.path().to_str().unwrap()).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert!(snapshot.nodes[0].unschedulable);
        assert!(!snapshot.nodes[1].unschedulable);
        assert_eq!(snapshot.pods["w1"], 3);
    }

    #[test]
    fn missing_snapshot_file_errors() {
        assert!(load_snapshot("/nonexistent/snapshot.json").is_err());
    }
}
