//! Launch plan - the commands appstart will run, in order
//!
//! Building a plan is pure: it only looks at [`Settings`] and the [`Mode`].
//! Nothing is spawned until the plan is handed to [`super::launch`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::mode::Mode;
use super::redactor;
use crate::settings::Settings;

pub const PORT_VAR: &str = "PORT";
pub const PYTHONPATH_VAR: &str = "PYTHONPATH";
pub const NO_BYTECODE_VAR: &str = "PYTHONDONTWRITEBYTECODE";

pub const RELOAD_FLAG: &str = "--reload";
pub const NO_SERVER_HEADER_FLAG: &str = "--no-server-header";

/// One external command and the environment it runs with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Short name used in logs ("install", "server")
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl Step {
    /// Check whether `flag` appears among the arguments
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Value following `flag`, e.g. `arg_value("--port")`
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Render as a shell command line, env assignments first
    pub fn command_line(&self, redact: bool) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, shell_quote(redactor::redact_env_value(k, v, redact))))
            .collect();
        parts.push(shell_quote(&self.program));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_line(true))
    }
}

/// Everything needed to bring the server up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub mode: Mode,
    pub banner: String,
    /// Dependency install, absent when disabled
    pub install: Option<Step>,
    pub server: Step,
    /// Keep going to the server when the install step fails
    pub continue_on_install_failure: bool,
}

impl LaunchPlan {
    pub fn build(settings: &Settings, mode: Mode) -> Self {
        let shared_env = shared_env(settings);

        let install = settings.install.enabled.then(|| {
            let install = &settings.install;
            let mut args = vec!["install".to_string()];
            if install.no_cache {
                args.push("--no-cache-dir".to_string());
            }
            if install.upgrade {
                args.push("--upgrade".to_string());
            }
            args.push("-r".to_string());
            args.push(install.manifest.to_string_lossy().into_owned());

            Step {
                label: "install".to_string(),
                program: install.program.clone(),
                args,
                env: shared_env.clone(),
            }
        });

        let server = &settings.server;
        let mut args = vec![
            server.app.clone(),
            "--host".to_string(),
            server.host.clone(),
            "--port".to_string(),
            server.port.to_string(),
        ];
        if mode.auto_reload() {
            args.push(RELOAD_FLAG.to_string());
        }
        args.push(NO_SERVER_HEADER_FLAG.to_string());
        args.extend(server.extra_args.iter().cloned());

        let mut server_env = shared_env;
        if mode.suppresses_bytecode() {
            server_env.insert(NO_BYTECODE_VAR.to_string(), "1".to_string());
        }

        Self {
            mode,
            banner: mode.banner().to_string(),
            install,
            server: Step {
                label: "server".to_string(),
                program: server.program.clone(),
                args,
                env: server_env,
            },
            continue_on_install_failure: settings.install.continue_on_failure,
        }
    }

    /// Steps in execution order: install (if any), then server
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.install.iter().chain(std::iter::once(&self.server))
    }

    /// Human-readable rendering for `appstart plan`
    pub fn render(&self, redact: bool) -> String {
        let mut out = format!("# mode: {}\n# {}\n", self.mode, self.banner);
        for (i, step) in self.steps().enumerate() {
            out.push_str(&format!("{}. [{}] {}\n", i + 1, step.label, step.command_line(redact)));
        }
        out
    }

    /// Copy of the plan with secret env values masked, for printing
    pub fn redacted(&self) -> Self {
        let mask = |step: &Step| Step {
            env: step
                .env
                .iter()
                .map(|(k, v)| (k.clone(), redactor::redact_env_value(k, v, true).to_string()))
                .collect(),
            ..step.clone()
        };

        Self {
            install: self.install.as_ref().map(mask),
            server: mask(&self.server),
            ..self.clone()
        }
    }
}

/// Configured extras plus `PORT` and `PYTHONPATH`. The built-ins always win
/// so the exported `PORT` matches the bound port.
fn shared_env(settings: &Settings) -> BTreeMap<String, String> {
    let mut env = settings.env.extra.clone();
    env.insert(PORT_VAR.to_string(), settings.server.port.to_string());
    env.insert(PYTHONPATH_VAR.to_string(), settings.env.python_path.clone());
    env
}

/// Quote an argument for POSIX shells when it needs it
fn shell_quote(arg: &str) -> String {
    let is_plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,[]".contains(c));
    if is_plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn plan_for(selector: Option<&str>) -> LaunchPlan {
        LaunchPlan::build(&Settings::default(), Mode::from_selector(selector))
    }

    #[test]
    fn test_reload_only_in_development() {
        assert!(plan_for(Some("local")).server.has_arg(RELOAD_FLAG));
        assert!(plan_for(Some("dev")).server.has_arg(RELOAD_FLAG));
        assert!(!plan_for(Some("prod")).server.has_arg(RELOAD_FLAG));
        assert!(!plan_for(None).server.has_arg(RELOAD_FLAG));
    }

    #[test]
    fn test_server_always_binds_and_hides_header() {
        for selector in [Some("local"), Some("dev"), Some("production"), None] {
            let plan = plan_for(selector);
            assert_eq!(plan.server.program, "uvicorn");
            assert_eq!(plan.server.args[0], "src.main:app");
            assert_eq!(plan.server.arg_value("--host"), Some("0.0.0.0"));
            assert_eq!(plan.server.arg_value("--port"), Some("5000"));
            assert!(plan.server.has_arg(NO_SERVER_HEADER_FLAG));
        }
    }

    #[test]
    fn test_port_matches_exported_env() {
        let mut settings = Settings::default();
        settings.server.port = 8123;
        let plan = LaunchPlan::build(&settings, Mode::Production);

        assert_eq!(plan.server.arg_value("--port"), Some("8123"));
        assert_eq!(plan.server.env.get(PORT_VAR).map(String::as_str), Some("8123"));
        let install = plan.install.as_ref().unwrap();
        assert_eq!(install.env.get(PORT_VAR).map(String::as_str), Some("8123"));
    }

    #[test]
    fn test_install_command() {
        let plan = plan_for(None);
        let install = plan.install.as_ref().unwrap();
        assert_eq!(install.program, "pip");
        assert_eq!(
            install.args,
            vec!["install", "--no-cache-dir", "--upgrade", "-r", "requirements.txt"]
        );
        assert_eq!(install.env.get(PYTHONPATH_VAR).map(String::as_str), Some("/app"));
    }

    #[test]
    fn test_install_flags_follow_settings() {
        let mut settings = Settings::default();
        settings.install.no_cache = false;
        settings.install.upgrade = false;
        let plan = LaunchPlan::build(&settings, Mode::Production);
        assert_eq!(
            plan.install.unwrap().args,
            vec!["install", "-r", "requirements.txt"]
        );
    }

    #[test]
    fn test_install_runs_first() {
        let plan = plan_for(Some("dev"));
        let labels: Vec<&str> = plan.steps().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["install", "server"]);
    }

    #[test]
    fn test_disabled_install_leaves_only_server() {
        let mut settings = Settings::default();
        settings.install.enabled = false;
        let plan = LaunchPlan::build(&settings, Mode::Production);
        assert!(plan.install.is_none());
        assert_eq!(plan.steps().count(), 1);
    }

    #[test]
    fn test_bytecode_suppression_only_on_dev_server() {
        let dev = plan_for(Some("local"));
        assert_eq!(dev.server.env.get(NO_BYTECODE_VAR).map(String::as_str), Some("1"));
        assert!(!dev.install.as_ref().unwrap().env.contains_key(NO_BYTECODE_VAR));

        let prod = plan_for(None);
        assert!(!prod.server.env.contains_key(NO_BYTECODE_VAR));
    }

    #[test]
    fn test_extra_env_cannot_override_port() {
        let mut settings = Settings::default();
        settings.env.extra.insert(PORT_VAR.to_string(), "1234".to_string());
        let plan = LaunchPlan::build(&settings, Mode::Production);
        assert_eq!(plan.server.env.get(PORT_VAR).map(String::as_str), Some("5000"));
    }

    #[test]
    fn test_extra_env_and_args() {
        let mut settings = Settings::default();
        settings
            .env
            .extra
            .insert("APP_STAGE".to_string(), "qa".to_string());
        settings.server.extra_args = vec!["--workers".to_string(), "4".to_string()];
        let plan = LaunchPlan::build(&settings, Mode::Production);

        assert_eq!(plan.server.env.get("APP_STAGE").map(String::as_str), Some("qa"));
        assert_eq!(plan.server.arg_value("--workers"), Some("4"));
        assert_eq!(plan.server.args.last().map(String::as_str), Some("4"));
    }

    #[test]
    fn test_command_line_rendering() {
        let plan = plan_for(Some("dev"));
        assert_eq!(
            plan.server.command_line(true),
            "PORT=5000 PYTHONDONTWRITEBYTECODE=1 PYTHONPATH=/app uvicorn src.main:app \
             --host 0.0.0.0 --port 5000 --reload --no-server-header"
        );
    }

    #[test]
    fn test_command_line_redacts_secrets() {
        let mut settings = Settings::default();
        settings
            .env
            .extra
            .insert("JWT_SECRET".to_string(), "s3cr3t".to_string());
        let plan = LaunchPlan::build(&settings, Mode::Production);

        let line = plan.server.to_string();
        assert!(line.contains("JWT_SECRET='[REDACTED]'") || line.contains("JWT_SECRET=[REDACTED]"));
        assert!(!line.contains("s3cr3t"));
        assert!(plan.server.command_line(false).contains("s3cr3t"));
    }

    #[test]
    fn test_redacted_plan() {
        let mut settings = Settings::default();
        settings
            .env
            .extra
            .insert("DB_PASSWORD".to_string(), "hunter2".to_string());
        let plan = LaunchPlan::build(&settings, Mode::Production).redacted();

        let json = serde_json::to_string(&plan).unwrap();
        assert!(!json.contains("hunter2"));
        assert_eq!(plan.server.env.get(PORT_VAR).map(String::as_str), Some("5000"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("src.main:app"), "src.main:app");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_render_lists_steps_in_order() {
        let rendered = plan_for(None).render(true);
        let install_pos = rendered.find("[install]").unwrap();
        let server_pos = rendered.find("[server]").unwrap();
        assert!(install_pos < server_pos);
        assert!(rendered.contains("# mode: production"));
    }

    #[test]
    fn test_plan_serializes() {
        let json = serde_json::to_value(plan_for(Some("local"))).unwrap();
        assert_eq!(json["mode"], "development");
        assert_eq!(json["server"]["program"], "uvicorn");
        assert_eq!(json["install"]["label"], "install");
    }
}
