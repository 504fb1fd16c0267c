//! appstart - launcher for an ASGI web service
//!
//! Prepares the environment, installs Python dependencies, and hands the
//! process off to uvicorn:
//! - `ENV=local` or `ENV=dev` launches with auto-reload
//! - anything else launches in production mode
//! - `appstart plan` shows the commands without running them

mod cli;
mod core;
mod host;
mod logging;
mod settings;

use clap::Parser;
use cli::{exit_codes, Cli, Commands, PlanArgs};
use crate::core::{LaunchError, LaunchPlan};
use host::{CommandError, CommandRunner};
use settings::Settings;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::CONFIG_ERROR;
        }
    };
    settings.apply(&cli.launch.overrides());

    // Initialize logging
    if let Err(e) = logging::init(cli.verbose, cli.json_output, &settings.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::CONFIG_ERROR;
    }

    let mode = cli.launch.mode();
    let plan = LaunchPlan::build(&settings, mode);
    tracing::debug!(%mode, steps = plan.steps().count(), "Built launch plan");

    if let Some(Commands::Plan(args)) = &cli.command {
        return match print_plan(&plan, args) {
            Ok(()) => exit_codes::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                exit_codes::UNEXPECTED_FAILURE
            }
        };
    }

    if settings.install.enabled && !settings.install.manifest.exists() {
        tracing::warn!(
            "Dependency manifest {:?} not found; the installer will likely fail",
            settings.install.manifest
        );
    }

    // Create tokio runtime for the child processes
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    let runner = CommandRunner::new();
    let result = rt.block_on(async {
        match cli.command {
            Some(Commands::Install) => crate::core::run_install(&plan, &runner).await,
            Some(Commands::Run) | None => crate::core::launch(&plan, &runner).await,
            Some(Commands::Plan(_)) => Ok(exit_codes::SUCCESS),
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            categorize_error(&e)
        }
    }
}

fn print_plan(plan: &LaunchPlan, args: &PlanArgs) -> anyhow::Result<()> {
    let shown = if args.show_secrets {
        plan.clone()
    } else {
        plan.redacted()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        print!("{}", shown.render(false));
    }
    Ok(())
}

/// Categorize a launch error into the appropriate exit code
fn categorize_error(e: &LaunchError) -> i32 {
    match e {
        LaunchError::InstallFailed { exit_code } => *exit_code,
        LaunchError::Command(CommandError::BinaryNotFound(_)) => exit_codes::BINARY_MISSING,
        LaunchError::Command(CommandError::Interrupted(_)) => exit_codes::INTERRUPTED,
        LaunchError::Command(_) => exit_codes::UNEXPECTED_FAILURE,
    }
}
