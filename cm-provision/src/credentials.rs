//! Operator password storage

use crate::error::Result;
use async_trait::async_trait;
use cm_common::Cluster;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// Supplies the per-cluster manager password
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_cm_password(&self, cluster: &Cluster) -> Result<String>;
}

/// In-process store keyed by cluster id.
///
/// A cluster that has no password yet gets a freshly generated one on first
/// read, which is then returned on every later read.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    passwords: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_cm_password(&self, cluster_id: &str, password: &str) {
        let mut passwords = self.passwords.write().await;
        passwords.insert(cluster_id.to_string(), password.to_string());
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_cm_password(&self, cluster: &Cluster) -> Result<String> {
        {
            let passwords = self.passwords.read().await;
            if let Some(password) = passwords.get(&cluster.id) {
                return Ok(password.clone());
            }
        }

        let mut passwords = self.passwords.write().await;
        let password = passwords
            .entry(cluster.id.clone())
            .or_insert_with(|| {
                info!(cluster = %cluster.name, "Generated manager password");
                uuid::Uuid::new_v4().to_string()
            })
            .clone();
        Ok(password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(id: &str) -> Cluster {
        Cluster {
            id: id.to_string(),
            name: format!("cluster-{}", id),
            plugin_version: None,
            cluster_configs: Default::default(),
            node_groups: vec![],
        }
    }

    #[tokio::test]
    async fn test_generated_password_is_stable() {
        let store = MemoryCredentialStore::new();
        let first = store.get_cm_password(&cluster("a")).await.unwrap();
        let second = store.get_cm_password(&cluster("a")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 36);

        let other = store.get_cm_password(&cluster("b")).await.unwrap();
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn test_seeded_password() {
        let store = MemoryCredentialStore::new();
        store.set_cm_password("a", "s3cret").await;
        assert_eq!(store.get_cm_password(&cluster("a")).await.unwrap(), "s3cret");
    }
}
