//! Launch mode - development or production, selected by the `ENV` variable

use serde::{Deserialize, Serialize};

/// Selector values that turn on development mode
const DEVELOPMENT_SELECTORS: [&str; 2] = ["local", "dev"];

/// How the server should be launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Auto-reload on file change, no bytecode files written
    Development,
    /// Plain server, no reload
    Production,
}

impl Mode {
    /// Pick the mode from the raw `ENV` value.
    ///
    /// Only the exact strings `local` and `dev` select development; anything
    /// else, including an unset or empty value, is production.
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector {
            Some(value) if DEVELOPMENT_SELECTORS.contains(&value) => Mode::Development,
            _ => Mode::Production,
        }
    }

    /// Banner printed right before the launch
    pub fn banner(&self) -> &'static str {
        match self {
            Mode::Development => "Starting server in development mode (auto-reload enabled)",
            Mode::Production => "Starting server in production mode",
        }
    }

    pub fn auto_reload(&self) -> bool {
        matches!(self, Mode::Development)
    }

    /// Whether the server should run with `PYTHONDONTWRITEBYTECODE=1`
    pub fn suppresses_bytecode(&self) -> bool {
        matches!(self, Mode::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
