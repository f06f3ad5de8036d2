//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use cm_common::{Cluster, ConfigMap, InstanceRecord, NodeGroup};
use cm_provision::api::*;
use cm_provision::credentials::MemoryCredentialStore;
use cm_provision::platform::CdhPlatform;
use cm_provision::progress::ProgressReporter;
use cm_provision::{AdapterConfig, ClouderaAdapter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

pub const CLUSTER_ID: &str = "c1";
pub const CLUSTER_NAME: &str = "cdh";
pub const OPERATOR_PASSWORD: &str = "operator-pw";
pub const MANAGER_IP: &str = "10.0.0.10";

/// In-memory manager that records every call
#[derive(Default)]
pub struct FakeManager {
    calls: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, ApiCommand>>,
    completions: Mutex<HashMap<i64, ApiCommand>>,
    bulk_responses: Mutex<HashMap<String, Vec<ApiCommand>>>,
    hosts: Mutex<Vec<ApiHost>>,
    roles: Mutex<HashMap<String, Vec<ApiRole>>>,
    users: Mutex<HashMap<String, ApiUser>>,
    role_configs: Mutex<HashMap<String, HashMap<String, String>>>,
    mgmt_setups: Mutex<Vec<ApiServiceSetupInfo>>,
    next_id: AtomicI64,
}

impl FakeManager {
    pub fn new() -> Arc<Self> {
        let manager = Self::default();
        manager.users.lock().unwrap().insert(
            "admin".to_string(),
            ApiUser {
                name: "admin".to_string(),
                password: None,
                roles: vec!["ROLE_ADMIN".to_string()],
            },
        );
        Arc::new(manager)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    /// Return `cmd` when `call` is made
    pub fn respond_with(&self, call: &str, cmd: ApiCommand) {
        self.responses.lock().unwrap().insert(call.to_string(), cmd);
    }

    /// Return `commands` from a bulk call
    pub fn respond_with_bulk(&self, call: &str, commands: Vec<ApiCommand>) {
        self.bulk_responses
            .lock()
            .unwrap()
            .insert(call.to_string(), commands);
    }

    /// State reported by `get_command` once the command is polled
    pub fn complete_with(&self, cmd: ApiCommand) {
        self.completions.lock().unwrap().insert(cmd.id, cmd);
    }

    pub fn add_host(&self, host_id: &str, hostname: &str) {
        self.hosts.lock().unwrap().push(ApiHost {
            host_id: host_id.to_string(),
            hostname: hostname.to_string(),
            ip_address: None,
        });
    }

    pub fn add_role(&self, service: &str, name: &str, role_type: &str) {
        self.roles
            .lock()
            .unwrap()
            .entry(service.to_string())
            .or_default()
            .push(ApiRole {
                name: name.to_string(),
                role_type: role_type.to_string(),
                host_ref: None,
            });
    }

    pub fn roles_of(&self, service: &str) -> Vec<ApiRole> {
        self.roles
            .lock()
            .unwrap()
            .get(service)
            .cloned()
            .unwrap_or_default()
    }

    pub fn user(&self, name: &str) -> Option<ApiUser> {
        self.users.lock().unwrap().get(name).cloned()
    }

    pub fn role_config(&self, role: &str) -> Option<HashMap<String, String>> {
        self.role_configs.lock().unwrap().get(role).cloned()
    }

    pub fn mgmt_setups(&self) -> Vec<ApiServiceSetupInfo> {
        self.mgmt_setups.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn command(&self, call: String) -> ApiCommand {
        let response = self.responses.lock().unwrap().get(&call).cloned();
        self.record(call);
        response.unwrap_or_else(|| succeeded(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn bulk(&self, call: String) -> ApiBulkCommandList {
        let response = self.bulk_responses.lock().unwrap().get(&call).cloned();
        self.record(call);
        ApiBulkCommandList {
            items: response
                .unwrap_or_else(|| vec![succeeded(self.next_id.fetch_add(1, Ordering::SeqCst))]),
            errors: vec![],
        }
    }
}

pub fn succeeded(id: i64) -> ApiCommand {
    ApiCommand {
        id,
        name: "command".to_string(),
        active: false,
        success: Some(true),
        result_message: Some("Command succeeded".to_string()),
        children: None,
    }
}

pub fn failed(id: i64, message: &str) -> ApiCommand {
    ApiCommand {
        id,
        name: "command".to_string(),
        active: false,
        success: Some(false),
        result_message: Some(message.to_string()),
        children: None,
    }
}

#[async_trait]
impl ManagerApi for FakeManager {
    async fn get_user(&self, username: &str) -> ClientResult<ApiUser> {
        self.record(format!("get_user {}", username));
        self.user(username)
            .ok_or_else(|| ClientError::NotFound(username.to_string()))
    }

    async fn update_user(&self, user: &ApiUser) -> ClientResult<ApiUser> {
        self.record(format!("update_user {}", user.name));
        self.users
            .lock()
            .unwrap()
            .insert(user.name.clone(), user.clone());
        Ok(user.clone())
    }

    async fn get_cluster(&self, cluster: &str) -> ClientResult<ApiCluster> {
        self.record(format!("get_cluster {}", cluster));
        if cluster == CLUSTER_NAME {
            Ok(ApiCluster {
                name: cluster.to_string(),
                version: Some("CDH5".to_string()),
            })
        } else {
            Err(ClientError::NotFound(cluster.to_string()))
        }
    }

    async fn start_cluster(&self, cluster: &str) -> ClientResult<ApiCommand> {
        Ok(self.command(format!("start_cluster {}", cluster)))
    }

    async fn deploy_cluster_client_config(&self, cluster: &str) -> ClientResult<ApiCommand> {
        Ok(self.command(format!("deploy_cluster_client_config {}", cluster)))
    }

    async fn remove_cluster_host(&self, cluster: &str, host_id: &str) -> ClientResult<()> {
        self.record(format!("remove_cluster_host {} {}", cluster, host_id));
        Ok(())
    }

    async fn get_all_hosts(&self, view: &str) -> ClientResult<Vec<ApiHost>> {
        self.record(format!("get_all_hosts {}", view));
        Ok(self.hosts.lock().unwrap().clone())
    }

    async fn delete_host(&self, host_id: &str) -> ClientResult<()> {
        self.record(format!("delete_host {}", host_id));
        self.hosts.lock().unwrap().retain(|h| h.host_id != host_id);
        Ok(())
    }

    async fn create_role(
        &self,
        _cluster: &str,
        service: &str,
        role: &ApiRole,
    ) -> ClientResult<ApiRole> {
        let host = role
            .host_ref
            .as_ref()
            .map(|h| h.host_id.clone())
            .unwrap_or_default();
        self.record(format!(
            "create_role {} {} {} {}",
            service, role.name, role.role_type, host
        ));
        self.add_role(service, &role.name, &role.role_type);
        Ok(role.clone())
    }

    async fn update_role_config(
        &self,
        _cluster: &str,
        service: &str,
        role: &str,
        config: &HashMap<String, String>,
    ) -> ClientResult<()> {
        self.record(format!("update_role_config {} {}", service, role));
        self.role_configs
            .lock()
            .unwrap()
            .insert(role.to_string(), config.clone());
        Ok(())
    }

    async fn delete_role(
        &self,
        _cluster: &str,
        service: &str,
        role: &str,
    ) -> ClientResult<ApiRole> {
        self.record(format!("delete_role {} {}", service, role));
        let mut roles = self.roles.lock().unwrap();
        let service_roles = roles.entry(service.to_string()).or_default();
        let position = service_roles
            .iter()
            .position(|r| r.name == role)
            .ok_or_else(|| ClientError::NotFound(role.to_string()))?;
        Ok(service_roles.remove(position))
    }

    async fn get_roles(&self, _cluster: &str, service: &str) -> ClientResult<Vec<ApiRole>> {
        self.record(format!("get_roles {}", service));
        Ok(self.roles_of(service))
    }

    async fn decommission_roles(
        &self,
        _cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiCommand> {
        Ok(self.command(format!("decommission {} {}", service, roles.join(","))))
    }

    async fn refresh_roles(
        &self,
        _cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiBulkCommandList> {
        Ok(self.bulk(format!("refresh {} {}", service, roles.join(","))))
    }

    async fn deploy_service_client_config(
        &self,
        _cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiCommand> {
        Ok(self.command(format!("deploy_client_config {} {}", service, roles.join(","))))
    }

    async fn start_service(&self, _cluster: &str, service: &str) -> ClientResult<ApiCommand> {
        Ok(self.command(format!("start_service {}", service)))
    }

    async fn start_roles(
        &self,
        _cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiBulkCommandList> {
        Ok(self.bulk(format!("start_roles {} {}", service, roles.join(","))))
    }

    async fn create_mgmt_service(&self, setup: &ApiServiceSetupInfo) -> ClientResult<()> {
        self.record("create_mgmt_service".to_string());
        self.mgmt_setups.lock().unwrap().push(setup.clone());
        Ok(())
    }

    async fn restart_mgmt_service(&self) -> ClientResult<ApiCommand> {
        Ok(self.command("restart_mgmt_service".to_string()))
    }

    async fn hosts_start_roles(&self, hostnames: &[String]) -> ClientResult<ApiCommand> {
        Ok(self.command(format!("hosts_start_roles {}", hostnames.join(","))))
    }

    async fn get_command(&self, id: i64) -> ClientResult<ApiCommand> {
        self.record(format!("get_command {}", id));
        self.completions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("command {}", id)))
    }
}

/// Connector handing out the shared fake and remembering the parameters
pub struct FakeConnector {
    manager: Arc<FakeManager>,
    sessions: Mutex<Vec<SessionParams>>,
}

impl FakeConnector {
    pub fn new(manager: Arc<FakeManager>) -> Self {
        Self {
            manager,
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn sessions(&self) -> Vec<SessionParams> {
        self.sessions.lock().unwrap().clone()
    }
}

impl ManagerConnector for FakeConnector {
    fn connect(&self, params: &SessionParams) -> ClientResult<ManagerSession> {
        self.sessions.lock().unwrap().push(params.clone());
        let session: ManagerSession = self.manager.clone();
        Ok(session)
    }
}

/// Progress reporter that keeps every notification
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn add_provisioning_step(&self, _cluster_id: &str, step: &str, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("step {} {}", step, total));
    }

    fn add_successful_event(&self, _cluster_id: &str, instance: Option<&str>) {
        self.events
            .lock()
            .unwrap()
            .push(format!("ok {}", instance.unwrap_or("-")));
    }

    fn add_fail_event(&self, _cluster_id: &str, instance: Option<&str>, _error: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("fail {}", instance.unwrap_or("-")));
    }
}

pub fn record(name: &str, ip: &str) -> InstanceRecord {
    InstanceRecord {
        instance_id: format!("id-{}", name),
        instance_name: name.to_string(),
        internal_hostname: name.to_string(),
        fqdn: format!("{}.novalocal", name),
        management_ip: ip.to_string(),
        internal_ip: None,
    }
}

pub fn group(name: &str, processes: &[&str], instances: Vec<InstanceRecord>) -> NodeGroup {
    NodeGroup {
        name: name.to_string(),
        node_processes: processes.iter().map(|p| p.to_string()).collect(),
        node_configs: ConfigMap::new(),
        instances,
    }
}

/// manager-1: manager, NameNode, ResourceManager
/// worker-1, worker-2: DataNode, NodeManager
/// journal-1: JournalNode, ZooKeeper
pub fn test_cluster() -> Arc<Cluster> {
    let mut worker = group(
        "worker",
        &["HDFS_DATANODE", "YARN_NODEMANAGER"],
        vec![record("worker-1", "10.0.0.21"), record("worker-2", "10.0.0.22")],
    );
    worker.node_configs.insert(
        "DATANODE".to_string(),
        [(
            "dfs_data_dir_list".to_string(),
            serde_json::json!("/volumes/disk1/fs/dn"),
        )]
        .into_iter()
        .collect(),
    );

    Arc::new(Cluster {
        id: CLUSTER_ID.to_string(),
        name: CLUSTER_NAME.to_string(),
        plugin_version: Some("5.4.0".to_string()),
        cluster_configs: ConfigMap::new(),
        node_groups: vec![
            group(
                "master",
                &["CLOUDERA_MANAGER", "HDFS_NAMENODE", "YARN_RESOURCEMANAGER"],
                vec![record("manager-1", MANAGER_IP)],
            ),
            worker,
            group(
                "journal",
                &["HDFS_JOURNALNODE", "ZOOKEEPER_SERVER"],
                vec![record("journal-1", "10.0.0.31")],
            ),
        ],
    })
}

pub fn test_config() -> AdapterConfig {
    let mut config = AdapterConfig::default();
    config.manager.command_poll_interval_ms = 1;
    config.agents.poll_interval_secs = 1;
    config
}

/// Adapter wired to fakes, with the operator password already stored
pub struct Harness {
    pub adapter: ClouderaAdapter,
    pub manager: Arc<FakeManager>,
    pub connector: Arc<FakeConnector>,
    pub progress: Arc<RecordingProgress>,
    pub cluster: Arc<Cluster>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_cluster(test_cluster()).await
    }

    pub async fn with_cluster(cluster: Arc<Cluster>) -> Self {
        let manager = FakeManager::new();
        let connector = Arc::new(FakeConnector::new(manager.clone()));
        let progress = Arc::new(RecordingProgress::default());
        let credentials = Arc::new(MemoryCredentialStore::new());
        credentials.set_cm_password(&cluster.id, OPERATOR_PASSWORD).await;

        let adapter = ClouderaAdapter::new(
            Arc::new(CdhPlatform::new()),
            connector.clone(),
            credentials,
            progress.clone(),
            test_config(),
        );

        Self {
            adapter,
            manager,
            connector,
            progress,
            cluster,
        }
    }

    pub fn instance(&self, name: &str) -> cm_common::Instance {
        self.cluster
            .instance_by_fqdn(&format!("{}.novalocal", name))
            .unwrap()
    }
}
