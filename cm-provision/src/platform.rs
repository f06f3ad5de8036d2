//! Platform strategy
//!
//! Host and role naming, manager lookup and per-role configuration differ
//! between platform versions. The adapter is handed one `PlatformUtils`
//! implementation and never assumes anything beyond this interface.

use crate::error::Result;
use cm_common::{Cluster, Error, Instance, InstanceRecord};
use std::collections::HashMap;
use std::sync::Arc;

pub const MANAGER_PROCESS: &str = "CLOUDERA_MANAGER";

/// Platform-specific helpers used by the adapter
pub trait PlatformUtils: Send + Sync {
    /// The instance running the cluster manager
    fn get_manager(&self, cluster: &Arc<Cluster>) -> Result<Instance>;

    /// Manager-side role name for `process` on `instance`
    fn get_role_name(&self, instance: &InstanceRecord, process: &str) -> String;

    /// Map a user-facing process name to the manager role name
    fn convert_role_showname(&self, showname: &str) -> String;

    /// Configuration pushed to a freshly created role
    fn get_configs(
        &self,
        process: &str,
        cluster: &Cluster,
        instance: &Instance,
    ) -> HashMap<String, String>;
}

const ROLE_SHORTCUTS: &[(&str, &str)] = &[
    ("ALERTPUBLISHER", "AP"),
    ("DATANODE", "DN"),
    ("EVENTSERVER", "ES"),
    ("HIVEMETASTORE", "HVM"),
    ("HIVESERVER2", "HVS"),
    ("HOSTMONITOR", "HM"),
    ("JOBHISTORY", "JS"),
    ("JOURNALNODE", "JN"),
    ("MASTER", "M"),
    ("NAMENODE", "NN"),
    ("NODEMANAGER", "NM"),
    ("OOZIE_SERVER", "OS"),
    ("REGIONSERVER", "RS"),
    ("RESOURCEMANAGER", "RM"),
    ("SECONDARYNAMENODE", "SNN"),
    ("SERVER", "S"),
    ("SERVICEMONITOR", "SM"),
    ("SPARK_YARN_HISTORY_SERVER", "SHS"),
    ("WEBHCAT", "WHC"),
    ("HDFS_GATEWAY", "HG"),
    ("YARN_GATEWAY", "YG"),
];

const SHOWNAMES: &[(&str, &str)] = &[
    ("CLOUDERA_MANAGER", "MANAGER"),
    ("HDFS_NAMENODE", "NAMENODE"),
    ("HDFS_DATANODE", "DATANODE"),
    ("HDFS_JOURNALNODE", "JOURNALNODE"),
    ("HDFS_SECONDARYNAMENODE", "SECONDARYNAMENODE"),
    ("YARN_RESOURCEMANAGER", "RESOURCEMANAGER"),
    ("YARN_NODEMANAGER", "NODEMANAGER"),
    ("YARN_JOBHISTORY", "JOBHISTORY"),
    ("YARN_STANDBYRM", "RESOURCEMANAGER"),
    ("OOZIE_SERVER", "OOZIE_SERVER"),
    ("HIVE_SERVER2", "HIVESERVER2"),
    ("HIVE_METASTORE", "HIVEMETASTORE"),
    ("HIVE_WEBHCAT", "WEBHCAT"),
    ("HUE_SERVER", "HUE_SERVER"),
    ("SPARK_YARN_HISTORY_SERVER", "SPARK_YARN_HISTORY_SERVER"),
    ("ZOOKEEPER_SERVER", "SERVER"),
    ("HBASE_MASTER", "MASTER"),
    ("HBASE_REGIONSERVER", "REGIONSERVER"),
];

/// Default CDH platform helpers
#[derive(Debug, Clone, Default)]
pub struct CdhPlatform;

impl CdhPlatform {
    pub fn new() -> Self {
        Self
    }
}

fn lookup<'a>(table: &'a [(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn config_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PlatformUtils for CdhPlatform {
    fn get_manager(&self, cluster: &Arc<Cluster>) -> Result<Instance> {
        cluster
            .instances_with_process(MANAGER_PROCESS)
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no {} instance in cluster {}",
                    MANAGER_PROCESS, cluster.name
                ))
                .into()
            })
    }

    fn get_role_name(&self, instance: &InstanceRecord, process: &str) -> String {
        // manager role names must match [_A-Za-z][-_A-Za-z0-9]{0,63}
        let prefix = lookup(ROLE_SHORTCUTS, process).unwrap_or(process);
        format!("{}_{}", prefix, instance.hostname().replace('-', "_"))
    }

    fn convert_role_showname(&self, showname: &str) -> String {
        lookup(SHOWNAMES, showname).unwrap_or(showname).to_string()
    }

    fn get_configs(
        &self,
        process: &str,
        cluster: &Cluster,
        instance: &Instance,
    ) -> HashMap<String, String> {
        let mut configs = HashMap::new();
        let layers = [
            cluster.cluster_configs.get(process),
            instance.node_group().node_configs.get(process),
        ];
        for layer in layers.into_iter().flatten() {
            for (name, value) in layer {
                configs.insert(name.clone(), config_string(value));
            }
        }
        configs
    }
}
