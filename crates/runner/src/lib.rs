use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub mod command;
pub mod env;

pub use command::RunnerCommand;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to collect output of {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {after:?}")]
    TimedOut { program: String, after: Duration },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

/// Seam for invoking host utilities so callers can substitute a fake in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion and returns its captured stdout.
    async fn output(&self, command: &RunnerCommand) -> Result<Vec<u8>, RunnerError>;
}

/// Runs commands on the host. The child is killed if it outlives the
/// command's timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, command: &RunnerCommand) -> Result<Vec<u8>, RunnerError> {
        let env = env::sanitize_env(&inherited_env());
        let child = Command::new(&command.program)
            .args(&command.args)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        debug!(command = %command, timeout = ?command.timeout, "spawned command");

        let output = match tokio::time::timeout(command.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| RunnerError::Io {
                program: command.program.clone(),
                source,
            })?,
            Err(_) => {
                return Err(RunnerError::TimedOut {
                    program: command.program.clone(),
                    after: command.timeout,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(command = %command, stderr = %stderr.trim(), "command failed");
            return Err(RunnerError::Failed {
                program: command.program.clone(),
                status: output.status,
            });
        }

        Ok(output.stdout)
    }
}

fn inherited_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}
