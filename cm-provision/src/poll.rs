//! Generic condition polling with cluster-configurable timeouts

use crate::error::{ProvisionError, Result};
use cm_common::Cluster;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Timeout stored as a cluster option, with a fallback default
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutOption {
    pub applicable_target: String,
    pub name: String,
    pub default_secs: u64,
}

impl TimeoutOption {
    pub fn new(applicable_target: &str, name: &str, default_secs: u64) -> Self {
        Self {
            applicable_target: applicable_target.to_string(),
            name: name.to_string(),
            default_secs,
        }
    }

    /// Timeout for `cluster`; unparseable values fall back to the default
    pub fn resolve(&self, cluster: &Cluster) -> Duration {
        let secs = cluster
            .config_value(&self.applicable_target, &self.name)
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(self.default_secs);
        Duration::from_secs(secs)
    }
}

/// Poll `predicate` every `sleep` until it holds or `timeout` elapses
pub async fn poll_until<F, Fut>(
    description: &str,
    timeout: Duration,
    sleep: Duration,
    mut predicate: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    loop {
        if predicate().await? {
            debug!(
                operation = description,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Poll condition met"
            );
            return Ok(());
        }
        if start.elapsed() >= timeout {
            return Err(ProvisionError::Timeout {
                description: description.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        tokio::time::sleep(sleep).await;
    }
}

/// Poll with a timeout read from the cluster's options
pub async fn plugin_option_poll<F, Fut>(
    cluster: &Cluster,
    option: &TimeoutOption,
    description: &str,
    sleep: Duration,
    predicate: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    poll_until(description, option.resolve(cluster), sleep, predicate).await
}
