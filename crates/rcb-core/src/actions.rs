//! Privileged host power operations.
//!
//! This is a trust boundary: callers have already obtained the operator's
//! confirmation. Commands are fired and not awaited; the host goes down (or to
//! sleep) shortly after.

use std::{process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;

use crate::{command::PowerAction, tools::spawn_error, Result};

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: PowerAction) -> Result<()>;
}

/// Program and arguments for one action.
pub type CommandLine = (String, Vec<String>);

type CommandFor = dyn Fn(PowerAction) -> CommandLine + Send + Sync;

/// Command line for each action, run through non-interactive `sudo`.
pub fn power_command(action: PowerAction) -> CommandLine {
    let verb = match action {
        PowerAction::Reboot => "reboot",
        PowerAction::Shutdown => "poweroff",
        PowerAction::Suspend => "suspend",
    };
    (
        "sudo".to_string(),
        ["-n", "systemctl", verb].map(str::to_string).to_vec(),
    )
}

pub struct SystemActionExecutor {
    delay: Duration,
    command: Box<CommandFor>,
}

impl SystemActionExecutor {
    pub fn new(delay: Duration) -> Self {
        Self::with_command(delay, power_command)
    }

    pub fn with_command(
        delay: Duration,
        command: impl Fn(PowerAction) -> CommandLine + Send + Sync + 'static,
    ) -> Self {
        Self {
            delay,
            command: Box::new(command),
        }
    }

    pub fn shared(delay: Duration) -> Arc<dyn ActionExecutor> {
        Arc::new(Self::new(delay))
    }
}

#[async_trait]
impl ActionExecutor for SystemActionExecutor {
    async fn execute(&self, action: PowerAction) -> Result<()> {
        // Give the "executing" reply time to leave the host.
        tokio::time::sleep(self.delay).await;

        let (program, args) = (self.command)(action);
        tracing::warn!(%action, %program, "issuing host power command");
        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(&program, e))?;
        Ok(())
    }
}
