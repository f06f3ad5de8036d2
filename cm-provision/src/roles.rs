//! Static role tables
//!
//! Which manager service owns which role, which synthetic gateway roles are
//! implied by which processes, and which processes are never created as
//! roles by the adapter.

use crate::error::{ProvisionError, Result};
use std::collections::HashSet;

pub const HDFS_SERVICE_NAME: &str = "hdfs01";
pub const YARN_SERVICE_NAME: &str = "yarn01";
pub const OOZIE_SERVICE_NAME: &str = "oozie01";
pub const HIVE_SERVICE_NAME: &str = "hive01";
pub const HUE_SERVICE_NAME: &str = "hue01";
pub const SPARK_SERVICE_NAME: &str = "spark_on_yarn01";
pub const ZOOKEEPER_SERVICE_NAME: &str = "zookeeper01";
pub const HBASE_SERVICE_NAME: &str = "hbase01";

pub const YARN_GATEWAY: &str = "YARN_GATEWAY";
pub const HDFS_GATEWAY: &str = "HDFS_GATEWAY";
pub const GATEWAY_ROLE_TYPE: &str = "GATEWAY";

/// Role types of the manager's monitoring service
pub const MGMT_PROCESSES: [&str; 4] = [
    "SERVICEMONITOR",
    "HOSTMONITOR",
    "EVENTSERVER",
    "ALERTPUBLISHER",
];

/// role -> owning service
const SERVICE_BY_ROLE: &[(&str, &str)] = &[
    ("NAMENODE", HDFS_SERVICE_NAME),
    ("DATANODE", HDFS_SERVICE_NAME),
    ("SECONDARYNAMENODE", HDFS_SERVICE_NAME),
    (HDFS_GATEWAY, HDFS_SERVICE_NAME),
    ("RESOURCEMANAGER", YARN_SERVICE_NAME),
    ("NODEMANAGER", YARN_SERVICE_NAME),
    ("JOBHISTORY", YARN_SERVICE_NAME),
    (YARN_GATEWAY, YARN_SERVICE_NAME),
    ("OOZIE_SERVER", OOZIE_SERVICE_NAME),
    ("HIVESERVER2", HIVE_SERVICE_NAME),
    ("HIVEMETASTORE", HIVE_SERVICE_NAME),
    ("WEBHCAT", HIVE_SERVICE_NAME),
    ("HUE_SERVER", HUE_SERVICE_NAME),
    ("SPARK_YARN_HISTORY_SERVER", SPARK_SERVICE_NAME),
    ("SERVER", ZOOKEEPER_SERVICE_NAME),
    ("MASTER", HBASE_SERVICE_NAME),
    ("REGIONSERVER", HBASE_SERVICE_NAME),
];

/// gateway role -> processes that imply it
const EXTRA_ROLES: &[(&str, &[&str])] = &[
    (YARN_GATEWAY, &["YARN_NODEMANAGER"]),
    (
        HDFS_GATEWAY,
        &["HDFS_NAMENODE", "HDFS_DATANODE", "HDFS_SECONDARYNAMENODE"],
    ),
];

/// Provisioned through other paths, never created as roles here
const UNMANAGED_ROLES: [&str; 3] = ["CLOUDERA_MANAGER", "HDFS_JOURNALNODE", "YARN_STANDBYRM"];

/// Name of the service instance that owns `role`
pub fn service_for_role(role: &str) -> Result<&'static str> {
    SERVICE_BY_ROLE
        .iter()
        .find(|(r, _)| *r == role)
        .map(|(_, service)| *service)
        .ok_or_else(|| {
            ProvisionError::InvalidArgument(format!(
                "Process {} is not supported by CDH plugin",
                role
            ))
        })
}

/// Every role name the service table knows about
pub fn known_roles() -> impl Iterator<Item = &'static str> {
    SERVICE_BY_ROLE.iter().map(|(r, _)| *r)
}

/// Expand requested processes with the gateway roles they imply
pub fn roles_list<S: AsRef<str>>(node_processes: &[S]) -> HashSet<String> {
    let mut current: HashSet<String> = node_processes
        .iter()
        .map(|p| p.as_ref().to_string())
        .collect();

    for (gateway, triggers) in EXTRA_ROLES {
        if triggers.iter().any(|t| current.contains(*t)) {
            current.insert(gateway.to_string());
        }
    }

    current
}

/// Manager role type for a process; gateways share one generic type
pub fn role_type(process: &str) -> &str {
    match process {
        YARN_GATEWAY | HDFS_GATEWAY => GATEWAY_ROLE_TYPE,
        other => other,
    }
}

pub fn is_unmanaged_role(process: &str) -> bool {
    UNMANAGED_ROLES.contains(&process)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_role_maps_to_one_service() {
        let services = [
            HDFS_SERVICE_NAME,
            YARN_SERVICE_NAME,
            OOZIE_SERVICE_NAME,
            HIVE_SERVICE_NAME,
            HUE_SERVICE_NAME,
            SPARK_SERVICE_NAME,
            ZOOKEEPER_SERVICE_NAME,
            HBASE_SERVICE_NAME,
        ];
        for role in known_roles() {
            let service = service_for_role(role).unwrap();
            assert!(services.contains(&service), "{} -> {}", role, service);
        }
        assert_eq!(service_for_role("DATANODE").unwrap(), HDFS_SERVICE_NAME);
        assert_eq!(service_for_role("SERVER").unwrap(), ZOOKEEPER_SERVICE_NAME);
        assert_eq!(service_for_role("REGIONSERVER").unwrap(), HBASE_SERVICE_NAME);
    }

    #[test]
    fn test_unknown_role_is_unsupported() {
        let err = service_for_role("IMPALAD").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("IMPALAD is not supported"));

        // the table works on converted names only
        assert!(service_for_role("HDFS_DATANODE").is_err());
    }

    #[test]
    fn test_roles_list_adds_hdfs_gateway() {
        let roles = roles_list(&["HDFS_DATANODE"]);
        assert!(roles.contains(HDFS_GATEWAY));
        assert!(!roles.contains(YARN_GATEWAY));
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn test_roles_list_journalnode_is_not_a_trigger() {
        let roles = roles_list(&["HDFS_JOURNALNODE"]);
        assert_eq!(roles.len(), 1);
        assert!(roles.contains("HDFS_JOURNALNODE"));
    }

    #[test]
    fn test_roles_list_has_no_duplicates() {
        let roles = roles_list(&[
            "HDFS_NAMENODE",
            "HDFS_DATANODE",
            HDFS_GATEWAY,
            "YARN_NODEMANAGER",
            "YARN_NODEMANAGER",
        ]);
        assert_eq!(roles.len(), 5);
        assert!(roles.contains(YARN_GATEWAY));
    }

    #[test]
    fn test_role_type() {
        assert_eq!(role_type(YARN_GATEWAY), "GATEWAY");
        assert_eq!(role_type(HDFS_GATEWAY), "GATEWAY");
        assert_eq!(role_type("NODEMANAGER"), "NODEMANAGER");
    }

    #[test]
    fn test_unmanaged_roles() {
        assert!(is_unmanaged_role("CLOUDERA_MANAGER"));
        assert!(is_unmanaged_role("HDFS_JOURNALNODE"));
        assert!(is_unmanaged_role("YARN_STANDBYRM"));
        assert!(!is_unmanaged_role("HDFS_DATANODE"));
    }
}
