//! Launcher settings
//!
//! Settings come from an optional TOML file. Every field has a default, and
//! the defaults launch uvicorn exactly the way the stock deployment does.
//! CLI flags and environment variables are layered on top through
//! [`Overrides`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "appstart.toml";

/// Errors that can occur while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub install: InstallSettings,
    pub env: EnvSettings,
    pub logging: LoggingSettings,
}

/// ASGI server invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server binary (resolved through PATH unless it is a path)
    pub program: String,
    /// Application import string passed to the server
    pub app: String,
    pub host: String,
    pub port: u16,
    /// Appended after the built-in flags
    pub extra_args: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            program: "uvicorn".to_string(),
            app: "src.main:app".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            extra_args: Vec::new(),
        }
    }
}

/// Dependency installation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    pub enabled: bool,
    /// Package manager binary
    pub program: String,
    /// Requirements manifest handed to the installer
    pub manifest: PathBuf,
    /// Pass `--no-cache-dir`
    pub no_cache: bool,
    /// Pass `--upgrade`
    pub upgrade: bool,
    /// Launch the server even when the install step fails
    pub continue_on_failure: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "pip".to_string(),
            manifest: PathBuf::from("requirements.txt"),
            no_cache: true,
            upgrade: true,
            continue_on_failure: false,
        }
    }
}

/// Environment exported to both steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvSettings {
    /// Value for `PYTHONPATH`
    pub python_path: String,
    /// Additional variables; `PORT` and `PYTHONPATH` entries here are ignored
    pub extra: BTreeMap<String, String>,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            python_path: "/app".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. "info" or "appstart=debug"
    pub level: Option<String>,
    pub json: bool,
}

/// Values taken from the command line or the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub skip_install: bool,
    pub continue_on_install_failure: bool,
}

impl Settings {
    /// Load settings from `explicit`, or from [`DEFAULT_CONFIG_FILE`] if present.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let settings = Self::from_toml(&contents).map_err(|source| SettingsError::Parse {
                    path: path.clone(),
                    source,
                })?;
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                Ok(Self::default())
            }
            Err(source) => Err(SettingsError::Read { path, source }),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply CLI/env overrides on top of file values
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if overrides.skip_install {
            self.install.enabled = false;
        }
        if overrides.continue_on_install_failure {
            self.install.continue_on_failure = true;
        }
    }
}
