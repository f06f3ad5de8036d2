//! Management API seam
//!
//! `ManagerApi` is the capability interface of an authenticated manager
//! session. The adapter only ever talks to the manager through it, via the
//! thin `RemoteCluster`/`RemoteService`/`RemoteRole` handles below.
//! `CmClient` is the REST implementation.

pub mod client;
pub mod types;

pub use client::{CmClient, HttpConnector};
pub use types::*;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Authentication failed")]
    AuthFailed,
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// An authenticated manager session
pub type ManagerSession = Arc<dyn ManagerApi>;

/// Operations exposed by the cluster manager
#[async_trait]
pub trait ManagerApi: Send + Sync {
    // Users
    async fn get_user(&self, username: &str) -> ClientResult<ApiUser>;
    async fn update_user(&self, user: &ApiUser) -> ClientResult<ApiUser>;

    // Clusters
    async fn get_cluster(&self, cluster: &str) -> ClientResult<ApiCluster>;
    async fn start_cluster(&self, cluster: &str) -> ClientResult<ApiCommand>;
    async fn deploy_cluster_client_config(&self, cluster: &str) -> ClientResult<ApiCommand>;
    async fn remove_cluster_host(&self, cluster: &str, host_id: &str) -> ClientResult<()>;

    // Hosts
    async fn get_all_hosts(&self, view: &str) -> ClientResult<Vec<ApiHost>>;
    async fn delete_host(&self, host_id: &str) -> ClientResult<()>;

    // Roles
    async fn create_role(&self, cluster: &str, service: &str, role: &ApiRole)
        -> ClientResult<ApiRole>;
    async fn update_role_config(
        &self,
        cluster: &str,
        service: &str,
        role: &str,
        config: &HashMap<String, String>,
    ) -> ClientResult<()>;
    async fn delete_role(&self, cluster: &str, service: &str, role: &str) -> ClientResult<ApiRole>;
    async fn get_roles(&self, cluster: &str, service: &str) -> ClientResult<Vec<ApiRole>>;

    // Service commands
    async fn decommission_roles(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiCommand>;
    async fn refresh_roles(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiBulkCommandList>;
    async fn deploy_service_client_config(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiCommand>;
    async fn start_service(&self, cluster: &str, service: &str) -> ClientResult<ApiCommand>;
    async fn start_roles(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiBulkCommandList>;

    // Management service
    async fn create_mgmt_service(&self, setup: &ApiServiceSetupInfo) -> ClientResult<()>;
    async fn restart_mgmt_service(&self) -> ClientResult<ApiCommand>;
    async fn hosts_start_roles(&self, hostnames: &[String]) -> ClientResult<ApiCommand>;

    // Commands
    async fn get_command(&self, id: i64) -> ClientResult<ApiCommand>;
}

/// Parameters for opening a manager session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub api_version: u32,
}

/// Factory for manager sessions
pub trait ManagerConnector: Send + Sync {
    fn connect(&self, params: &SessionParams) -> ClientResult<ManagerSession>;
}

impl ApiCommand {
    /// Block until the command leaves the active state.
    ///
    /// There is no timeout: the manager decides when a command is finished.
    pub async fn wait(
        self,
        api: &dyn ManagerApi,
        poll_interval: Duration,
    ) -> ClientResult<ApiCommand> {
        if self.is_synchronous() || !self.active {
            return Ok(self);
        }

        let id = self.id;
        loop {
            tokio::time::sleep(poll_interval).await;
            let cmd = api.get_command(id).await?;
            if !cmd.active {
                debug!(command_id = id, success = ?cmd.success, "Command finished");
                return Ok(cmd);
            }
        }
    }
}

/// Manager-side cluster
#[derive(Clone)]
pub struct RemoteCluster {
    session: ManagerSession,
    name: String,
}

impl RemoteCluster {
    pub fn new(session: ManagerSession, name: impl Into<String>) -> Self {
        Self {
            session,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> &ManagerSession {
        &self.session
    }

    pub fn get_service(&self, service: &str) -> RemoteService {
        RemoteService {
            session: Arc::clone(&self.session),
            cluster: self.name.clone(),
            name: service.to_string(),
        }
    }

    pub async fn start(&self) -> ClientResult<ApiCommand> {
        self.session.start_cluster(&self.name).await
    }

    pub async fn deploy_client_config(&self) -> ClientResult<ApiCommand> {
        self.session.deploy_cluster_client_config(&self.name).await
    }

    pub async fn remove_host(&self, host_id: &str) -> ClientResult<()> {
        self.session.remove_cluster_host(&self.name, host_id).await
    }
}

/// Manager-side service of a cluster
#[derive(Clone)]
pub struct RemoteService {
    session: ManagerSession,
    cluster: String,
    name: String,
}

impl RemoteService {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster
    }

    pub fn session(&self) -> &ManagerSession {
        &self.session
    }

    pub async fn create_role(
        &self,
        role_name: &str,
        role_type: &str,
        host_id: &str,
    ) -> ClientResult<RemoteRole> {
        let request = ApiRole {
            name: role_name.to_string(),
            role_type: role_type.to_string(),
            host_ref: Some(ApiHostRef {
                host_id: host_id.to_string(),
            }),
        };
        let role = self
            .session
            .create_role(&self.cluster, &self.name, &request)
            .await?;
        Ok(RemoteRole {
            session: Arc::clone(&self.session),
            cluster: self.cluster.clone(),
            service: self.name.clone(),
            role,
        })
    }

    pub async fn get_roles_by_type(&self, role_type: &str) -> ClientResult<Vec<ApiRole>> {
        let roles = self.session.get_roles(&self.cluster, &self.name).await?;
        Ok(roles
            .into_iter()
            .filter(|r| r.role_type == role_type)
            .collect())
    }

    pub async fn delete_role(&self, role_name: &str) -> ClientResult<ApiRole> {
        self.session
            .delete_role(&self.cluster, &self.name, role_name)
            .await
    }

    pub async fn decommission(&self, role_names: &[String]) -> ClientResult<ApiCommand> {
        self.session
            .decommission_roles(&self.cluster, &self.name, role_names)
            .await
    }

    pub async fn refresh(&self, role_names: &[String]) -> ClientResult<Vec<ApiCommand>> {
        let bulk = self
            .session
            .refresh_roles(&self.cluster, &self.name, role_names)
            .await?;
        Ok(self.unwrap_bulk("refresh", bulk))
    }

    pub async fn deploy_client_config(&self, role_names: &[String]) -> ClientResult<ApiCommand> {
        self.session
            .deploy_service_client_config(&self.cluster, &self.name, role_names)
            .await
    }

    pub async fn start(&self) -> ClientResult<ApiCommand> {
        self.session.start_service(&self.cluster, &self.name).await
    }

    pub async fn start_roles(&self, role_names: &[String]) -> ClientResult<Vec<ApiCommand>> {
        let bulk = self
            .session
            .start_roles(&self.cluster, &self.name, role_names)
            .await?;
        Ok(self.unwrap_bulk("start", bulk))
    }

    fn unwrap_bulk(&self, command: &str, bulk: ApiBulkCommandList) -> Vec<ApiCommand> {
        for error in &bulk.errors {
            warn!(service = %self.name, command, "Manager reported: {}", error);
        }
        bulk.items
    }
}

/// Role created on a service
#[derive(Clone)]
pub struct RemoteRole {
    session: ManagerSession,
    cluster: String,
    service: String,
    role: ApiRole,
}

impl RemoteRole {
    pub fn name(&self) -> &str {
        &self.role.name
    }

    pub fn role_type(&self) -> &str {
        &self.role.role_type
    }

    pub async fn update_config(&self, config: &HashMap<String, String>) -> ClientResult<()> {
        self.session
            .update_role_config(&self.cluster, &self.service, &self.role.name, config)
            .await
    }
}
