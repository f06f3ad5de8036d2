//! Cluster operations adapter
//!
//! Translates cluster lifecycle intents (start, add nodes, decommission,
//! refresh, reconfigure) into manager API calls. Every command issued is
//! waited for before the next step runs, and the first failure aborts the
//! operation.

use crate::api::{
    ApiServiceSetupInfo, HttpConnector, ManagerConnector, ManagerSession, RemoteCluster,
    RemoteService, SessionParams,
};
use crate::command::CommandWaiter;
use crate::config::AdapterConfig;
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::error::{ProvisionError, Result};
use crate::platform::{CdhPlatform, PlatformUtils};
use crate::poll;
use crate::progress::{track_event, track_step, ProgressReporter, TracingProgress};
use crate::roles::{self, HDFS_SERVICE_NAME, MGMT_PROCESSES, YARN_SERVICE_NAME};
use cm_common::{Cluster, Instance, ManagerConsole, ManagerConsoleInfo};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Coordinates provisioning operations against the cluster manager
#[derive(Clone)]
pub struct ClouderaAdapter {
    pu: Arc<dyn PlatformUtils>,
    connector: Arc<dyn ManagerConnector>,
    credentials: Arc<dyn CredentialStore>,
    progress: Arc<dyn ProgressReporter>,
    config: Arc<AdapterConfig>,
}

impl ClouderaAdapter {
    pub fn new(
        pu: Arc<dyn PlatformUtils>,
        connector: Arc<dyn ManagerConnector>,
        credentials: Arc<dyn CredentialStore>,
        progress: Arc<dyn ProgressReporter>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            pu,
            connector,
            credentials,
            progress,
            config: Arc::new(config),
        }
    }

    /// Adapter using the CDH platform, the REST client and an in-memory
    /// credential store
    pub fn with_defaults(config: AdapterConfig) -> Self {
        let connector = HttpConnector::new(config.manager.request_timeout());
        Self::new(
            Arc::new(CdhPlatform::new()),
            Arc::new(connector),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(TracingProgress),
            config,
        )
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn platform(&self) -> &Arc<dyn PlatformUtils> {
        &self.pu
    }

    fn waiter<'a>(&self, session: &'a ManagerSession) -> CommandWaiter<'a> {
        CommandWaiter::new(session.as_ref(), self.config.manager.command_poll_interval())
    }

    fn connect(
        &self,
        cluster: &Arc<Cluster>,
        username: &str,
        password: String,
    ) -> Result<ManagerSession> {
        let manager = self.pu.get_manager(cluster)?;
        let params = SessionParams {
            address: manager.management_ip().to_string(),
            port: self.config.manager.port,
            username: username.to_string(),
            password,
            api_version: self.config.manager.api_version,
        };
        debug!(cluster = %cluster.name, address = %params.address, "Opening manager session");
        Ok(self.connector.connect(&params)?)
    }

    /// Session using the factory credentials; only valid before the
    /// operator password has been set
    pub fn get_api_client_by_default_password(
        &self,
        cluster: &Arc<Cluster>,
    ) -> Result<ManagerSession> {
        let manager = &self.config.manager;
        self.connect(
            cluster,
            &manager.default_username,
            manager.default_password.clone(),
        )
    }

    /// Session using the cluster's stored operator password
    pub async fn get_api_client(&self, cluster: &Arc<Cluster>) -> Result<ManagerSession> {
        let password = self.credentials.get_cm_password(cluster).await?;
        self.connect(cluster, &self.config.manager.default_username, password)
    }

    /// Replace the factory password of the administrative user with the
    /// cluster's operator password
    pub async fn update_cloudera_password(&self, cluster: &Arc<Cluster>) -> Result<()> {
        info!(cluster = %cluster.name, "Rotating manager admin password");
        let api = self.get_api_client_by_default_password(cluster)?;
        let mut user = api.get_user(&self.config.manager.default_username).await?;
        user.password = Some(self.credentials.get_cm_password(cluster).await?);
        api.update_user(&user).await?;
        Ok(())
    }

    pub async fn get_cloudera_cluster(&self, cluster: &Arc<Cluster>) -> Result<RemoteCluster> {
        let api = self.get_api_client(cluster).await?;
        let remote = api.get_cluster(&cluster.name).await?;
        Ok(RemoteCluster::new(api, remote.name))
    }

    /// Start every service of the cluster
    pub async fn start_instances(&self, cluster: &Arc<Cluster>) -> Result<()> {
        info!(cluster = %cluster.name, "Starting cluster");
        let cm_cluster = self.get_cloudera_cluster(cluster).await?;
        self.waiter(cm_cluster.session())
            .issue(cm_cluster.start())
            .await
    }

    /// Remove the instances' hosts from the cluster and from the manager
    pub async fn delete_instances(
        &self,
        cluster: &Arc<Cluster>,
        instances: &[Instance],
    ) -> Result<()> {
        track_step(
            self.progress.as_ref(),
            &cluster.id,
            "Delete instances",
            self.remove_hosts(cluster, instances),
        )
        .await
    }

    async fn remove_hosts(&self, cluster: &Arc<Cluster>, instances: &[Instance]) -> Result<()> {
        let api = self.get_api_client(cluster).await?;
        let cm_cluster = self.get_cloudera_cluster(cluster).await?;
        let hosts = api.get_all_hosts("full").await?;
        let to_delete: HashSet<&str> = instances.iter().map(|i| i.fqdn()).collect();

        for host in hosts.iter().filter(|h| to_delete.contains(h.hostname.as_str())) {
            info!(cluster = %cluster.name, host = %host.hostname, "Deleting host");
            cm_cluster.remove_host(&host.host_id).await?;
            api.delete_host(&host.host_id).await?;
        }
        Ok(())
    }

    /// Decommission roles of one type, then delete them.
    ///
    /// Not transactional: a failed deletion leaves the remaining roles
    /// decommissioned but present.
    pub async fn decommission_nodes(
        &self,
        cluster: &Arc<Cluster>,
        process: &str,
        role_names: &[String],
    ) -> Result<()> {
        track_step(
            self.progress.as_ref(),
            &cluster.id,
            "Decommission nodes",
            self.decommission_and_delete(cluster, process, role_names),
        )
        .await
    }

    async fn decommission_and_delete(
        &self,
        cluster: &Arc<Cluster>,
        process: &str,
        role_names: &[String],
    ) -> Result<()> {
        info!(cluster = %cluster.name, process, roles = ?role_names, "Decommissioning roles");
        let service = self.get_service_by_role(process, Some(cluster), None).await?;
        self.waiter(service.session())
            .issue(service.decommission(role_names))
            .await?;
        for role_name in role_names {
            service.delete_role(role_name).await?;
        }
        Ok(())
    }

    pub async fn refresh_datanodes(&self, cluster: &Arc<Cluster>) -> Result<()> {
        track_step(
            self.progress.as_ref(),
            &cluster.id,
            "Refresh DataNodes",
            self.refresh_nodes(cluster, "DATANODE", HDFS_SERVICE_NAME),
        )
        .await
    }

    pub async fn refresh_yarn_nodes(&self, cluster: &Arc<Cluster>) -> Result<()> {
        track_step(
            self.progress.as_ref(),
            &cluster.id,
            "Refresh YARNNodes",
            self.refresh_nodes(cluster, "NODEMANAGER", YARN_SERVICE_NAME),
        )
        .await
    }

    /// Refresh every role of `process` individually
    async fn refresh_nodes(
        &self,
        cluster: &Arc<Cluster>,
        process: &str,
        service_name: &str,
    ) -> Result<()> {
        let cm_cluster = self.get_cloudera_cluster(cluster).await?;
        let service = cm_cluster.get_service(service_name);
        let waiter = self.waiter(cm_cluster.session());

        let roles = service.get_roles_by_type(process).await?;
        info!(
            cluster = %cluster.name,
            service = service_name,
            count = roles.len(),
            "Refreshing roles"
        );
        for role in roles {
            let commands = service.refresh(&[role.name]).await?;
            waiter.run_all(commands).await?;
        }
        Ok(())
    }

    /// Deploy client configuration for the whole cluster
    pub async fn deploy_configs(&self, cluster: &Arc<Cluster>) -> Result<()> {
        track_step(
            self.progress.as_ref(),
            &cluster.id,
            "Deploy configs",
            self.deploy_cluster_configs(cluster),
        )
        .await
    }

    async fn deploy_cluster_configs(&self, cluster: &Arc<Cluster>) -> Result<()> {
        let cm_cluster = self.get_cloudera_cluster(cluster).await?;
        self.waiter(cm_cluster.session())
            .issue(cm_cluster.deploy_client_config())
            .await
    }

    /// Redeploy client configuration on each instance concurrently.
    ///
    /// All tasks run to completion. A single failure is returned as is,
    /// several are combined into `ProvisionError::Aggregate`.
    pub async fn update_configs(&self, instances: &[Instance]) -> Result<()> {
        let Some(first) = instances.first() else {
            return Ok(());
        };
        let cluster_id = first.cluster_id().to_string();
        self.progress
            .add_provisioning_step(&cluster_id, "Update configs", instances.len());

        let mut join_set = JoinSet::new();
        for instance in instances {
            let adapter = self.clone();
            let instance = instance.clone();
            join_set.spawn(async move {
                let name = instance.instance_name().to_string();
                let result = track_event(
                    adapter.progress.as_ref(),
                    instance.cluster_id(),
                    Some(name.as_str()),
                    adapter.update_instance_configs(&instance),
                )
                .await;
                (name, result)
            });
        }

        let mut errors = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((name, Err(e))) => {
                    error!(instance = %name, "Config update failed: {}", e);
                    errors.push((name, e));
                }
                Err(e) => {
                    error!("Task join error: {}", e);
                    errors.push((String::from("<task>"), ProvisionError::Task(e.to_string())));
                }
            }
        }

        if errors.len() <= 1 {
            return errors.pop().map_or(Ok(()), |(_, e)| Err(e));
        }
        Err(ProvisionError::Aggregate(
            errors
                .into_iter()
                .map(|(name, e)| format!("{}: {}", name, e))
                .collect(),
        ))
    }

    async fn update_instance_configs(&self, instance: &Instance) -> Result<()> {
        for process in instance.node_processes() {
            let process = self.pu.convert_role_showname(process);
            let service = self.get_service_by_role(&process, None, Some(instance)).await?;
            let role_name = self.pu.get_role_name(instance, &process);
            debug!(
                instance = %instance.instance_name(),
                role = %role_name,
                "Deploying client config"
            );
            self.waiter(service.session())
                .issue(service.deploy_client_config(&[role_name]))
                .await?;
        }
        Ok(())
    }

    pub async fn restart_mgmt_service(&self, cluster: &Arc<Cluster>) -> Result<()> {
        info!(cluster = %cluster.name, "Restarting management service");
        let api = self.get_api_client(cluster).await?;
        self.waiter(&api).issue(api.restart_mgmt_service()).await
    }

    pub async fn start_service(&self, service: &RemoteService) -> Result<()> {
        info!(service = %service.name(), "Starting service");
        self.waiter(service.session()).issue(service.start()).await
    }

    pub async fn start_roles(&self, service: &RemoteService, role_names: &[String]) -> Result<()> {
        info!(service = %service.name(), roles = ?role_names, "Starting roles");
        let commands = service.start_roles(role_names).await?;
        self.waiter(service.session()).run_all(commands).await
    }

    /// Create the manager's monitoring service on the manager host and
    /// start its roles. Calling this twice creates the service twice.
    pub async fn create_mgmt_service(&self, cluster: &Arc<Cluster>) -> Result<()> {
        track_step(
            self.progress.as_ref(),
            &cluster.id,
            "Create mgmt service",
            self.setup_mgmt_service(cluster),
        )
        .await
    }

    async fn setup_mgmt_service(&self, cluster: &Arc<Cluster>) -> Result<()> {
        let api = self.get_api_client(cluster).await?;
        let manager = self.pu.get_manager(cluster)?;
        let hostname = manager.fqdn().to_string();

        let mut setup_info = ApiServiceSetupInfo::default();
        for process in MGMT_PROCESSES {
            let role_name = self.pu.get_role_name(&manager, process);
            setup_info.add_role_info(&role_name, process, &hostname);
        }

        info!(cluster = %cluster.name, host = %hostname, "Creating management service");
        api.create_mgmt_service(&setup_info).await?;
        self.waiter(&api)
            .issue(api.hosts_start_roles(&[hostname]))
            .await
    }

    /// Manager service owning `role`, looked up through either the cluster
    /// or the instance's cluster
    pub async fn get_service_by_role(
        &self,
        role: &str,
        cluster: Option<&Arc<Cluster>>,
        instance: Option<&Instance>,
    ) -> Result<RemoteService> {
        let cluster = match (cluster, instance) {
            (Some(cluster), _) => cluster,
            (None, Some(instance)) => instance.cluster(),
            (None, None) => {
                return Err(ProvisionError::InvalidArgument(
                    "'cluster' or 'instance' argument missed".to_string(),
                ))
            }
        };

        let service_name = roles::service_for_role(role)?;
        let cm_cluster = self.get_cloudera_cluster(cluster).await?;
        Ok(cm_cluster.get_service(service_name))
    }

    /// Whether every instance's host is registered with the manager
    pub async fn agents_connected(instances: &[Instance], api: &ManagerSession) -> Result<bool> {
        let registered: HashSet<String> = api
            .get_all_hosts("full")
            .await?
            .into_iter()
            .map(|h| h.hostname)
            .collect();

        Ok(instances.iter().all(|i| registered.contains(i.fqdn())))
    }

    /// Block until the manager agents of `instances` have registered
    pub async fn await_agents(&self, cluster: &Arc<Cluster>, instances: &[Instance]) -> Result<()> {
        track_step(
            self.progress.as_ref(),
            &cluster.id,
            "Await agents",
            self.wait_for_agents(cluster, instances),
        )
        .await
    }

    async fn wait_for_agents(&self, cluster: &Arc<Cluster>, instances: &[Instance]) -> Result<()> {
        let owner = instances.first().map(|i| i.cluster()).unwrap_or(cluster);
        let api = self.get_api_client(owner).await?;
        let api = &api;
        let agents = &self.config.agents;

        poll::plugin_option_poll(
            cluster,
            &agents.timeout_option(),
            "Await Cloudera agents",
            agents.poll_interval(),
            move || Self::agents_connected(instances, api),
        )
        .await
    }

    /// Create and configure roles on each instance, one instance at a time
    pub async fn configure_instances(
        &self,
        instances: &[Instance],
        cluster: Option<&Arc<Cluster>>,
    ) -> Result<()> {
        let Some(first) = instances.first() else {
            return Ok(());
        };
        self.progress
            .add_provisioning_step(first.cluster_id(), "Configure instances", instances.len());

        for instance in instances {
            track_event(
                self.progress.as_ref(),
                instance.cluster_id(),
                Some(instance.instance_name()),
                self.configure_instance(instance, cluster),
            )
            .await?;
        }
        Ok(())
    }

    /// Create every role the instance needs, including implied gateways
    pub async fn configure_instance(
        &self,
        instance: &Instance,
        cluster: Option<&Arc<Cluster>>,
    ) -> Result<()> {
        let cluster = cluster.unwrap_or_else(|| instance.cluster());
        let mut roles_list: Vec<String> = self
            .get_roles_list(instance.node_processes())
            .into_iter()
            .collect();
        roles_list.sort();

        info!(instance = %instance.instance_name(), roles = ?roles_list, "Configuring instance");
        for role in &roles_list {
            self.add_role(instance, role, cluster).await?;
        }
        Ok(())
    }

    async fn add_role(
        &self,
        instance: &Instance,
        process: &str,
        cluster: &Arc<Cluster>,
    ) -> Result<()> {
        if roles::is_unmanaged_role(process) {
            return Ok(());
        }

        let process = self.pu.convert_role_showname(process);
        let service = self.get_service_by_role(&process, None, Some(instance)).await?;
        let role_type = self.get_role_type(&process);
        let role_name = self.pu.get_role_name(instance, &process);

        debug!(service = %service.name(), role = %role_name, role_type, "Creating role");
        let role = service
            .create_role(&role_name, role_type, instance.fqdn())
            .await?;
        role.update_config(&self.pu.get_configs(&process, cluster, instance))
            .await?;
        Ok(())
    }

    /// Requested processes plus the gateway roles they imply
    pub fn get_roles_list<S: AsRef<str>>(&self, node_processes: &[S]) -> HashSet<String> {
        roles::roles_list(node_processes)
    }

    pub fn get_role_type<'a>(&self, process: &'a str) -> &'a str {
        roles::role_type(process)
    }

    /// Console URL and credentials for display to an operator
    pub async fn get_cloudera_manager_info(
        &self,
        cluster: &Arc<Cluster>,
    ) -> Result<ManagerConsoleInfo> {
        let manager = self.pu.get_manager(cluster)?;
        Ok(ManagerConsoleInfo {
            cloudera_manager: ManagerConsole {
                web_ui: format!("http://{}:{}", manager.management_ip(), self.config.manager.port),
                username: self.config.manager.default_username.clone(),
                password: self.credentials.get_cm_password(cluster).await?,
            },
        })
    }
}
