//! Manager REST API data types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Id reported by commands that completed synchronously
pub const SYNCHRONOUS_COMMAND_ID: i64 = -1;

/// Generic `{"items": [...]}` envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ApiList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Asynchronous command handle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiCommand {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub result_message: Option<String>,
    #[serde(default)]
    pub children: Option<ApiList<ApiCommand>>,
}

impl ApiCommand {
    pub fn is_synchronous(&self) -> bool {
        self.id == SYNCHRONOUS_COMMAND_ID
    }

    pub fn succeeded(&self) -> bool {
        self.success.unwrap_or(false)
    }

    pub fn message(&self) -> String {
        self.result_message.clone().unwrap_or_default()
    }
}

/// Commands issued in bulk, e.g. per-role commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApiBulkCommandList {
    #[serde(default)]
    pub items: Vec<ApiCommand>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiHostRef {
    pub host_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiHost {
    pub host_id: String,
    pub hostname: String,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiRole {
    pub name: String,
    #[serde(rename = "type")]
    pub role_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ref: Option<ApiHostRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiCluster {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    pub name: String,
    pub value: Option<String>,
}

/// Build a config update payload from name/value pairs
pub fn config_list(values: &HashMap<String, String>) -> ApiList<ApiConfig> {
    let mut items: Vec<ApiConfig> = values
        .iter()
        .map(|(name, value)| ApiConfig {
            name: name.clone(),
            value: Some(value.clone()),
        })
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    ApiList::new(items)
}

/// Role placement for a service that is being created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiRoleSetupInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub role_type: String,
    pub host_ref: ApiHostRef,
}

/// Service description used when creating a service with its roles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ApiServiceSetupInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub roles: Vec<ApiRoleSetupInfo>,
}

impl ApiServiceSetupInfo {
    pub fn add_role_info(&mut self, name: &str, role_type: &str, host_id: &str) {
        self.roles.push(ApiRoleSetupInfo {
            name: name.to_string(),
            role_type: role_type.to_string(),
            host_ref: ApiHostRef {
                host_id: host_id.to_string(),
            },
        });
    }
}
