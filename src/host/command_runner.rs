//! Command Runner
//!
//! Runs plan steps as child processes with inherited stdio.
//! The install step is awaited; the server step replaces this process
//! on Unix and is spawned and awaited elsewhere.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

use crate::core::{ProcessHost, Step};

/// Command runner errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// Binary not found in PATH
    #[error("Binary '{0}' not found. Install it or add to PATH.")]
    BinaryNotFound(String),

    /// Failed to launch process
    #[error("Failed to launch '{program}': {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error while waiting on the child
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ctrl-C arrived while a step was running
    #[error("Interrupted while running '{0}'")]
    Interrupted(String),
}

/// Runs steps on the local machine, on top of the inherited environment
#[derive(Debug, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }

    /// Find a binary in PATH
    pub fn which(binary: &str) -> Option<PathBuf> {
        which::which(binary).ok()
    }

    /// Resolve `binary` to something we can spawn. Bare names only match
    /// regular files in the working directory, otherwise PATH is searched.
    pub fn resolve(binary: &str) -> Result<PathBuf, CommandError> {
        let path = Path::new(binary);
        if path.components().count() > 1 || path.is_file() {
            return Ok(path.to_path_buf());
        }
        Self::which(binary).ok_or_else(|| CommandError::BinaryNotFound(binary.to_string()))
    }

    /// Build a std command for `step`
    fn command(&self, step: &Step) -> Result<std::process::Command, CommandError> {
        let binary_path = Self::resolve(&step.program)?;
        tracing::debug!("Resolved '{}' to {:?}", step.program, binary_path);

        let mut cmd = std::process::Command::new(binary_path);
        cmd.args(&step.args);
        cmd.envs(&step.env);
        Ok(cmd)
    }

    async fn run_and_wait(&self, step: &Step) -> Result<i32, CommandError> {
        let mut cmd = tokio::process::Command::from(self.command(step)?);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| CommandError::LaunchFailed {
            program: step.program.clone(),
            source,
        })?;

        tokio::select! {
            status = child.wait() => Ok(exit_code(status?)),
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, stopping {}", step.label);
                let _ = child.kill().await;
                Err(CommandError::Interrupted(step.label.clone()))
            }
        }
    }
}

#[async_trait]
impl ProcessHost for CommandRunner {
    async fn run(&self, step: &Step) -> Result<i32, CommandError> {
        self.run_and_wait(step).await
    }

    #[cfg(unix)]
    async fn hand_off(&self, step: &Step) -> Result<i32, CommandError> {
        use std::os::unix::process::CommandExt;

        let mut cmd = self.command(step)?;
        // exec only returns on failure
        let source = cmd.exec();
        Err(CommandError::LaunchFailed {
            program: step.program.clone(),
            source,
        })
    }

    #[cfg(not(unix))]
    async fn hand_off(&self, step: &Step) -> Result<i32, CommandError> {
        self.run_and_wait(step).await
    }
}

/// Map an exit status to a shell-style exit code (128 + signal when killed)
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
