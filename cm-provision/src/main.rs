//! cm-provision CLI
//!
//! Runs single cluster operations against a manager, for bootstrapping and
//! troubleshooting outside the orchestration engine.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cm_common::{Cluster, Instance};
use cm_provision::api::HttpConnector;
use cm_provision::credentials::MemoryCredentialStore;
use cm_provision::platform::CdhPlatform;
use cm_provision::progress::TracingProgress;
use cm_provision::{AdapterConfig, ClouderaAdapter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "CM_PROVISION_CONFIG")]
    config: Option<PathBuf>,

    /// Cluster description (YAML, TOML or JSON)
    #[arg(long)]
    cluster: Option<PathBuf>,

    /// Operator password of the manager admin user
    #[arg(long, env = "CM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a sample configuration file
    SampleConfig,
    /// Show manager console URL and credentials
    Info,
    /// Replace the factory admin password with the operator password
    RotatePassword,
    /// Start the cluster
    Start,
    /// Deploy client configuration cluster-wide
    DeployConfigs,
    /// Redeploy client configuration on instances (all if none given)
    UpdateConfigs { hosts: Vec<String> },
    /// Create roles on instances (all if none given)
    Configure { hosts: Vec<String> },
    /// Wait for manager agents to register (all instances if none given)
    AwaitAgents { hosts: Vec<String> },
    /// Create and start the management service
    CreateMgmt,
    /// Restart the management service
    RestartMgmt,
    /// Refresh all DataNodes
    RefreshDatanodes,
    /// Refresh all NodeManagers
    RefreshYarnNodes,
    /// Decommission and delete roles
    Decommission {
        /// Role type, e.g. DATANODE
        #[arg(short, long)]
        process: String,
        /// Role names
        #[arg(required = true)]
        roles: Vec<String>,
    },
    /// Remove hosts from the cluster and the manager
    DeleteInstances {
        #[arg(required = true)]
        hosts: Vec<String>,
    },
}

fn load_config(path: Option<&Path>) -> Result<AdapterConfig> {
    let config = match path {
        Some(path) => AdapterConfig::load_from(Some(path))?,
        None => AdapterConfig::load()?,
    };
    Ok(config)
}

fn load_cluster(path: &Path) -> Result<Arc<Cluster>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading cluster description {}", path.display()))?;

    let cluster: Cluster = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    Ok(Arc::new(cluster))
}

fn select_instances(cluster: &Arc<Cluster>, hosts: &[String]) -> Result<Vec<Instance>> {
    if hosts.is_empty() {
        return Ok(cluster.instances());
    }
    hosts
        .iter()
        .map(|h| {
            cluster
                .instance_by_fqdn(h)
                .with_context(|| format!("no instance {} in cluster {}", h, cluster.name))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let _guard = config
        .logging
        .init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    if let Commands::SampleConfig = cli.command {
        print!("{}", AdapterConfig::generate_sample());
        return Ok(());
    }

    let Some(cluster_path) = cli.cluster.as_deref() else {
        bail!("--cluster is required for this command");
    };
    let cluster = load_cluster(cluster_path)?;

    let credentials = Arc::new(MemoryCredentialStore::new());
    if let Some(password) = &cli.password {
        credentials.set_cm_password(&cluster.id, password).await;
    }

    let connector = HttpConnector::new(config.manager.request_timeout());
    let adapter = ClouderaAdapter::new(
        Arc::new(CdhPlatform::new()),
        Arc::new(connector),
        credentials,
        Arc::new(TracingProgress),
        config,
    );

    match cli.command {
        Commands::SampleConfig => {}
        Commands::Info => {
            let info = adapter.get_cloudera_manager_info(&cluster).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::RotatePassword => adapter.update_cloudera_password(&cluster).await?,
        Commands::Start => adapter.start_instances(&cluster).await?,
        Commands::DeployConfigs => adapter.deploy_configs(&cluster).await?,
        Commands::UpdateConfigs { hosts } => {
            let instances = select_instances(&cluster, &hosts)?;
            adapter.update_configs(&instances).await?
        }
        Commands::Configure { hosts } => {
            let instances = select_instances(&cluster, &hosts)?;
            adapter.configure_instances(&instances, Some(&cluster)).await?
        }
        Commands::AwaitAgents { hosts } => {
            let instances = select_instances(&cluster, &hosts)?;
            adapter.await_agents(&cluster, &instances).await?
        }
        Commands::CreateMgmt => adapter.create_mgmt_service(&cluster).await?,
        Commands::RestartMgmt => adapter.restart_mgmt_service(&cluster).await?,
        Commands::RefreshDatanodes => adapter.refresh_datanodes(&cluster).await?,
        Commands::RefreshYarnNodes => adapter.refresh_yarn_nodes(&cluster).await?,
        Commands::Decommission { process, roles } => {
            adapter.decommission_nodes(&cluster, &process, &roles).await?
        }
        Commands::DeleteInstances { hosts } => {
            let instances = select_instances(&cluster, &hosts)?;
            adapter.delete_instances(&cluster, &instances).await?
        }
    }

    tracing::info!(cluster = %cluster.name, "Operation completed");
    Ok(())
}
