//! Cluster progress reporting
//!
//! Reporting is observational only; it never changes control flow.

use crate::error::Result;
use std::future::Future;
use tracing::{info, warn};

/// Receives provisioning steps and per-step events
pub trait ProgressReporter: Send + Sync {
    /// Declare a step expecting `total` events
    fn add_provisioning_step(&self, cluster_id: &str, step: &str, total: usize);

    fn add_successful_event(&self, cluster_id: &str, instance: Option<&str>);

    fn add_fail_event(&self, cluster_id: &str, instance: Option<&str>, error: &str);
}

/// Reporter that writes progress to the log
#[derive(Debug, Clone, Default)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn add_provisioning_step(&self, cluster_id: &str, step: &str, total: usize) {
        info!(cluster_id, step, total, "Provisioning step");
    }

    fn add_successful_event(&self, cluster_id: &str, instance: Option<&str>) {
        info!(cluster_id, instance = instance.unwrap_or("-"), "Step event succeeded");
    }

    fn add_fail_event(&self, cluster_id: &str, instance: Option<&str>, error: &str) {
        warn!(cluster_id, instance = instance.unwrap_or("-"), error, "Step event failed");
    }
}

/// Run a cluster-scoped operation as its own one-event step
pub async fn track_step<T, F>(
    reporter: &dyn ProgressReporter,
    cluster_id: &str,
    step: &str,
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    reporter.add_provisioning_step(cluster_id, step, 1);
    track_event(reporter, cluster_id, None, operation).await
}

/// Record the outcome of `operation` as one event of the current step
pub async fn track_event<T, F>(
    reporter: &dyn ProgressReporter,
    cluster_id: &str,
    instance: Option<&str>,
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match operation.await {
        Ok(value) => {
            reporter.add_successful_event(cluster_id, instance);
            Ok(value)
        }
        Err(e) => {
            reporter.add_fail_event(cluster_id, instance, &e.to_string());
            Err(e)
        }
    }
}
