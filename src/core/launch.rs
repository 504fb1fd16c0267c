//! Launch sequence: install dependencies, announce the mode, hand off to the server

use async_trait::async_trait;
use thiserror::Error;

use super::plan::{LaunchPlan, Step, RELOAD_FLAG};
use crate::host::CommandError;

/// Errors that stop a launch
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Install step exited with code {exit_code}")]
    InstallFailed { exit_code: i32 },

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Something that can run plan steps
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Run a step to completion and return its exit code
    async fn run(&self, step: &Step) -> Result<i32, CommandError>;

    /// Replace the current process with `step`.
    ///
    /// Only returns on failure, or with the exit code on platforms that
    /// cannot exec.
    async fn hand_off(&self, step: &Step) -> Result<i32, CommandError>;
}

/// Execute the plan. The install step always completes before the server starts.
pub async fn launch(plan: &LaunchPlan, host: &dyn ProcessHost) -> Result<i32, LaunchError> {
    tracing::info!(
        mode = %plan.mode,
        port = plan.server.arg_value("--port"),
        reload = plan.server.has_arg(RELOAD_FLAG),
        "Launching {}",
        plan.server.program
    );

    if plan.install.is_some() {
        run_install(plan, host).await?;
    }

    println!("{}", plan.banner);
    tracing::info!("Handing off to: {}", plan.server);

    let code = host.hand_off(&plan.server).await?;
    tracing::debug!("Server exited with code {}", code);
    Ok(code)
}

/// Run only the install step. A plan without one succeeds trivially.
pub async fn run_install(plan: &LaunchPlan, host: &dyn ProcessHost) -> Result<i32, LaunchError> {
    let Some(install) = &plan.install else {
        tracing::info!("Install step disabled, nothing to do");
        return Ok(0);
    };

    tracing::info!("Installing dependencies: {}", install);
    let exit_code = host.run(install).await?;

    if exit_code == 0 {
        tracing::debug!("Install step finished");
        return Ok(0);
    }

    if plan.continue_on_install_failure {
        tracing::warn!(
            exit_code,
            "Install step failed, continuing with the installed dependencies"
        );
        Ok(exit_code)
    } else {
        tracing::error!(exit_code, "Install step failed");
        Err(LaunchError::InstallFailed { exit_code })
    }
}
