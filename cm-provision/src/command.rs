//! Waiting on manager commands
//!
//! Every mutating manager call returns a command. A command that fails is
//! turned into a single `ProvisionError::Provision` carrying the most
//! specific message available: the first failed child's, else the parent's.

use crate::api::{ApiCommand, ClientResult, ManagerApi};
use crate::error::{ProvisionError, Result};
use std::time::Duration;
use tracing::warn;

/// Map a finished command to success or a provisioning error
pub fn check_command(cmd: &ApiCommand) -> Result<()> {
    if cmd.succeeded() {
        return Ok(());
    }

    let failed_child = cmd
        .children
        .as_ref()
        .and_then(|children| children.items.iter().find(|c| !c.succeeded()));

    let message = match failed_child {
        Some(child) => child.message(),
        None => cmd.message(),
    };

    warn!(command_id = cmd.id, command = %cmd.name, "Command failed: {}", message);
    Err(ProvisionError::Provision(message))
}

/// Waits for commands issued through one session
pub struct CommandWaiter<'a> {
    api: &'a dyn ManagerApi,
    poll_interval: Duration,
}

impl<'a> CommandWaiter<'a> {
    pub fn new(api: &'a dyn ManagerApi, poll_interval: Duration) -> Self {
        Self { api, poll_interval }
    }

    /// Wait for a command to finish and check its outcome
    pub async fn run(&self, cmd: ApiCommand) -> Result<()> {
        let finished = cmd.wait(self.api, self.poll_interval).await?;
        check_command(&finished)
    }

    /// Issue a command and wait for it
    pub async fn issue<F>(&self, step: F) -> Result<()>
    where
        F: std::future::Future<Output = ClientResult<ApiCommand>>,
    {
        let cmd = step.await?;
        self.run(cmd).await
    }

    /// Wait for commands in order, stopping at the first failure
    pub async fn run_all<I>(&self, commands: I) -> Result<()>
    where
        I: IntoIterator<Item = ApiCommand>,
    {
        for cmd in commands {
            self.run(cmd).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiList;

    fn finished(success: bool, message: &str) -> ApiCommand {
        ApiCommand {
            id: 1,
            name: "cmd".into(),
            active: false,
            success: Some(success),
            result_message: Some(message.into()),
            children: None,
        }
    }

    #[test]
    fn test_success_is_ok() {
        assert!(check_command(&finished(true, "done")).is_ok());
    }

    #[test]
    fn test_failed_child_message_wins() {
        let mut parent = finished(false, "parent failed");
        parent.children = Some(ApiList::new(vec![
            finished(true, "ok"),
            finished(false, "M"),
            finished(false, "later"),
        ]));

        let err = check_command(&parent).unwrap_err();
        assert_eq!(err.result_message(), Some("M"));
    }

    #[test]
    fn test_no_children_uses_parent_message() {
        let err = check_command(&finished(false, "parent failed")).unwrap_err();
        assert_eq!(err.result_message(), Some("parent failed"));
    }

    #[test]
    fn test_children_all_succeeded_uses_parent_message() {
        let mut parent = finished(false, "parent failed");
        parent.children = Some(ApiList::new(vec![finished(true, "ok")]));

        let err = check_command(&parent).unwrap_err();
        assert_eq!(err.result_message(), Some("parent failed"));
    }

    #[test]
    fn test_missing_success_flag_is_failure() {
        let cmd = ApiCommand {
            id: 3,
            result_message: Some("unknown".into()),
            ..Default::default()
        };
        assert!(check_command(&cmd).is_err());
    }
}
