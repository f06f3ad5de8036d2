//! Common types shared between cm-provision and its callers
//!
//! The cluster model is supplied by the orchestration layer and is read-only
//! from the point of view of the provisioning adapter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-target configuration map: `target -> option name -> value`
pub type ConfigMap = HashMap<String, HashMap<String, serde_json::Value>>;

/// A cluster as described by the orchestration layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plugin_version: Option<String>,
    #[serde(default)]
    pub cluster_configs: ConfigMap,
    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
}

/// A group of identically configured instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGroup {
    pub name: String,
    #[serde(default)]
    pub node_processes: Vec<String>,
    #[serde(default)]
    pub node_configs: ConfigMap,
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
}

/// A provisioned node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub instance_name: String,
    pub internal_hostname: String,
    pub fqdn: String,
    pub management_ip: String,
    #[serde(default)]
    pub internal_ip: Option<String>,
}

impl InstanceRecord {
    /// Short hostname (the fqdn up to the first dot)
    pub fn hostname(&self) -> &str {
        self.fqdn.split('.').next().unwrap_or(&self.fqdn)
    }
}

/// Handle to one instance of a cluster.
///
/// Holds the owning cluster plus indices so that an instance can reach its
/// node group and cluster without the model carrying back-references.
#[derive(Debug, Clone)]
pub struct Instance {
    cluster: Arc<Cluster>,
    group: usize,
    index: usize,
}

impl Instance {
    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster.id
    }

    pub fn node_group(&self) -> &NodeGroup {
        &self.cluster.node_groups[self.group]
    }

    pub fn record(&self) -> &InstanceRecord {
        &self.node_group().instances[self.index]
    }

    pub fn node_processes(&self) -> &[String] {
        &self.node_group().node_processes
    }

    pub fn fqdn(&self) -> &str {
        &self.record().fqdn
    }

    pub fn instance_name(&self) -> &str {
        &self.record().instance_name
    }

    pub fn management_ip(&self) -> &str {
        &self.record().management_ip
    }
}

impl std::ops::Deref for Instance {
    type Target = InstanceRecord;

    fn deref(&self) -> &Self::Target {
        self.record()
    }
}

impl Cluster {
    /// All instances of the cluster, in node group order
    pub fn instances(self: &Arc<Self>) -> Vec<Instance> {
        self.node_groups
            .iter()
            .enumerate()
            .flat_map(|(group, ng)| {
                (0..ng.instances.len()).map(move |index| Instance {
                    cluster: Arc::clone(self),
                    group,
                    index,
                })
            })
            .collect()
    }

    /// Instances whose node group runs `process`
    pub fn instances_with_process(self: &Arc<Self>, process: &str) -> Vec<Instance> {
        self.instances()
            .into_iter()
            .filter(|i| i.node_processes().iter().any(|p| p == process))
            .collect()
    }

    /// Look up an instance by fully qualified hostname
    pub fn instance_by_fqdn(self: &Arc<Self>, fqdn: &str) -> Option<Instance> {
        self.instances().into_iter().find(|i| i.fqdn() == fqdn)
    }

    /// Read a cluster-level option, if set
    pub fn config_value(&self, target: &str, name: &str) -> Option<&serde_json::Value> {
        self.cluster_configs.get(target).and_then(|c| c.get(name))
    }
}

/// Manager console details shown to operators
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagerConsole {
    #[serde(rename = "Web UI")]
    pub web_ui: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
}

/// Info surface returned to the orchestration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagerConsoleInfo {
    #[serde(rename = "Cloudera Manager")]
    pub cloudera_manager: ManagerConsole,
}

/// Common error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
