//! REST client for the cluster manager API

use super::types::*;
use super::{
    ClientError, ClientResult, ManagerApi, ManagerConnector, ManagerSession, SessionParams,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cluster manager API client
#[derive(Clone)]
pub struct CmClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl CmClient {
    /// Create a client for `http://<address>:<port>/api/v<version>`
    pub fn new(params: &SessionParams, timeout: Duration) -> ClientResult<Self> {
        let base_url = format!(
            "http://{}:{}/api/v{}",
            params.address, params.port, params.api_version
        );
        Self::with_base_url(&base_url, &params.username, &params.password, timeout)
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        debug!(method = "GET", path, "Manager API request");
        let response = self
            .client
            .get(self.url(path))
            .headers(self.headers())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// POST request
    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        debug!(method = "POST", path, "Manager API request");
        let response = self
            .client
            .post(self.url(path))
            .headers(self.headers())
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// PUT request
    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        debug!(method = "PUT", path, "Manager API request");
        let response = self
            .client
            .put(self.url(path))
            .headers(self.headers())
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// DELETE request
    async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        debug!(method = "DELETE", path, "Manager API request");
        let response = self
            .client
            .delete(self.url(path))
            .headers(self.headers())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else if status.as_u16() == 401 {
            Err(ClientError::AuthFailed)
        } else if status.as_u16() == 404 {
            let message = response.text().await.unwrap_or_default();
            Err(ClientError::NotFound(message))
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    fn service_path(cluster: &str, service: &str) -> String {
        format!(
            "/clusters/{}/services/{}",
            urlencoding::encode(cluster),
            urlencoding::encode(service)
        )
    }

    fn names(roles: &[String]) -> ApiList<String> {
        ApiList::new(roles.to_vec())
    }
}

#[async_trait]
impl ManagerApi for CmClient {
    async fn get_user(&self, username: &str) -> ClientResult<ApiUser> {
        self.get(&format!("/users/{}", urlencoding::encode(username)))
            .await
    }

    async fn update_user(&self, user: &ApiUser) -> ClientResult<ApiUser> {
        self.put(&format!("/users/{}", urlencoding::encode(&user.name)), user)
            .await
    }

    async fn get_cluster(&self, cluster: &str) -> ClientResult<ApiCluster> {
        self.get(&format!("/clusters/{}", urlencoding::encode(cluster)))
            .await
    }

    async fn start_cluster(&self, cluster: &str) -> ClientResult<ApiCommand> {
        self.post(
            &format!("/clusters/{}/commands/start", urlencoding::encode(cluster)),
            &serde_json::Value::Null,
        )
        .await
    }

    async fn deploy_cluster_client_config(&self, cluster: &str) -> ClientResult<ApiCommand> {
        self.post(
            &format!(
                "/clusters/{}/commands/deployClientConfig",
                urlencoding::encode(cluster)
            ),
            &serde_json::Value::Null,
        )
        .await
    }

    async fn remove_cluster_host(&self, cluster: &str, host_id: &str) -> ClientResult<()> {
        let _: ApiHostRef = self
            .delete(&format!(
                "/clusters/{}/hosts/{}",
                urlencoding::encode(cluster),
                urlencoding::encode(host_id)
            ))
            .await?;
        Ok(())
    }

    async fn get_all_hosts(&self, view: &str) -> ClientResult<Vec<ApiHost>> {
        let hosts: ApiList<ApiHost> = self
            .get(&format!("/hosts?view={}", urlencoding::encode(view)))
            .await?;
        Ok(hosts.items)
    }

    async fn delete_host(&self, host_id: &str) -> ClientResult<()> {
        let _: ApiHost = self
            .delete(&format!("/hosts/{}", urlencoding::encode(host_id)))
            .await?;
        Ok(())
    }

    async fn create_role(
        &self,
        cluster: &str,
        service: &str,
        role: &ApiRole,
    ) -> ClientResult<ApiRole> {
        let created: ApiList<ApiRole> = self
            .post(
                &format!("{}/roles", Self::service_path(cluster, service)),
                &ApiList::new(vec![role.clone()]),
            )
            .await?;
        created
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("created role {}", role.name)))
    }

    async fn update_role_config(
        &self,
        cluster: &str,
        service: &str,
        role: &str,
        config: &HashMap<String, String>,
    ) -> ClientResult<()> {
        let _: ApiList<ApiConfig> = self
            .put(
                &format!(
                    "{}/roles/{}/config",
                    Self::service_path(cluster, service),
                    urlencoding::encode(role)
                ),
                &config_list(config),
            )
            .await?;
        Ok(())
    }

    async fn delete_role(&self, cluster: &str, service: &str, role: &str) -> ClientResult<ApiRole> {
        self.delete(&format!(
            "{}/roles/{}",
            Self::service_path(cluster, service),
            urlencoding::encode(role)
        ))
        .await
    }

    async fn get_roles(&self, cluster: &str, service: &str) -> ClientResult<Vec<ApiRole>> {
        let roles: ApiList<ApiRole> = self
            .get(&format!("{}/roles", Self::service_path(cluster, service)))
            .await?;
        Ok(roles.items)
    }

    async fn decommission_roles(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiCommand> {
        self.post(
            &format!("{}/commands/decommission", Self::service_path(cluster, service)),
            &Self::names(roles),
        )
        .await
    }

    async fn refresh_roles(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiBulkCommandList> {
        self.post(
            &format!("{}/roleCommands/refresh", Self::service_path(cluster, service)),
            &Self::names(roles),
        )
        .await
    }

    async fn deploy_service_client_config(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiCommand> {
        self.post(
            &format!(
                "{}/commands/deployClientConfig",
                Self::service_path(cluster, service)
            ),
            &Self::names(roles),
        )
        .await
    }

    async fn start_service(&self, cluster: &str, service: &str) -> ClientResult<ApiCommand> {
        self.post(
            &format!("{}/commands/start", Self::service_path(cluster, service)),
            &serde_json::Value::Null,
        )
        .await
    }

    async fn start_roles(
        &self,
        cluster: &str,
        service: &str,
        roles: &[String],
    ) -> ClientResult<ApiBulkCommandList> {
        self.post(
            &format!("{}/roleCommands/start", Self::service_path(cluster, service)),
            &Self::names(roles),
        )
        .await
    }

    async fn create_mgmt_service(&self, setup: &ApiServiceSetupInfo) -> ClientResult<()> {
        let _: serde_json::Value = self.put("/cm/service", setup).await?;
        Ok(())
    }

    async fn restart_mgmt_service(&self) -> ClientResult<ApiCommand> {
        self.post("/cm/service/commands/restart", &serde_json::Value::Null)
            .await
    }

    async fn hosts_start_roles(&self, hostnames: &[String]) -> ClientResult<ApiCommand> {
        self.post("/cm/commands/hostsStartRoles", &Self::names(hostnames))
            .await
    }

    async fn get_command(&self, id: i64) -> ClientResult<ApiCommand> {
        self.get(&format!("/commands/{}", id)).await
    }
}

/// Connector that opens REST sessions
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ManagerConnector for HttpConnector {
    fn connect(&self, params: &SessionParams) -> ClientResult<ManagerSession> {
        let client = CmClient::new(params, self.timeout)?;
        Ok(Arc::new(client))
    }
}
