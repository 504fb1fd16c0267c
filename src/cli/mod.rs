//! Command line interface

pub mod exit_codes;

use clap::{Args, Parser, Subcommand};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::core::Mode;
use crate::settings::Overrides;

#[derive(Debug, Parser)]
#[command(name = "appstart", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Config file (defaults to ./appstart.toml when present)
    #[arg(long, global = true, env = "APPSTART_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install dependencies, then hand off to the server (default)
    Run,
    /// Print what would be run without running anything
    Plan(PlanArgs),
    /// Run only the dependency install step
    Install,
}

/// Options shared by every subcommand that builds a plan
#[derive(Debug, Clone, Default, Args)]
pub struct LaunchArgs {
    /// Mode selector; "local" or "dev" selects development, anything else production
    #[arg(
        long = "mode-env",
        env = "ENV",
        value_name = "ENV",
        value_parser = clap::value_parser!(OsString),
        global = true
    )]
    pub mode_env: Option<OsString>,

    /// Port to bind and export as PORT; empty means the default
    #[arg(long, env = "PORT", value_parser = parse_port, global = true)]
    pub port: Option<PortArg>,

    /// Skip the dependency install step
    #[arg(long, global = true)]
    pub skip_install: bool,

    /// Start the server even if the install step fails
    #[arg(long, global = true)]
    pub continue_on_install_failure: bool,
}

/// A `PORT` value; `None` when it was given but empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortArg(pub Option<u16>);

fn parse_port(value: &str) -> Result<PortArg, String> {
    if value.trim().is_empty() {
        return Ok(PortArg(None));
    }
    value
        .parse::<u16>()
        .map(|port| PortArg(Some(port)))
        .map_err(|e| format!("invalid port '{}': {}", value, e))
}

impl LaunchArgs {
    /// Non-UTF-8 selectors can't equal "local" or "dev", so they select production
    pub fn mode(&self) -> Mode {
        Mode::from_selector(self.mode_env.as_deref().and_then(OsStr::to_str))
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port.and_then(|p| p.0),
            skip_install: self.skip_install,
            continue_on_install_failure: self.continue_on_install_failure,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Show secret env values instead of redacting them
    #[arg(long)]
    pub show_secrets: bool,
}
