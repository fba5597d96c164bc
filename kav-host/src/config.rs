//! Viewer configuration
//!
//! Stored as JSON, by default at `~/.config/kav/config.json`:
//!
//! ```json
//! {
//!   "rakkess-path": "/opt/bin/rakkess",
//!   "kubectl-who-can-path": "/opt/bin/kubectl-who-can",
//!   "verbs": ["get", "list", "watch"],
//!   "styled-cells": false
//! }
//! ```
//!
//! Every key is optional.

use kav_api::CellStyle;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Verbs asked of `rakkess` unless configured otherwise
pub const DEFAULT_VERBS: [&str; 7] = ["get", "list", "watch", "create", "update", "delete", "proxy"];

/// Default `rakkess` binary, looked up on `PATH`
pub const RAKKESS_TOOL: &str = "rakkess";

/// Default `kubectl-who-can` binary, looked up on `PATH`
pub const WHO_CAN_TOOL: &str = "kubectl-who-can";

const APP_NAME: &str = "kav";
const CONFIG_FILE: &str = "config.json";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid verb list: {0}")]
    InvalidVerbs(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KavConfig {
    /// Override for the `rakkess` binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rakkess_path: Option<PathBuf>,

    /// Override for the `kubectl-who-can` binary
    #[serde(rename = "kubectl-who-can-path", skip_serializing_if = "Option::is_none")]
    pub who_can_path: Option<PathBuf>,

    /// Verbs to ask `rakkess` about, in column order
    pub verbs: Vec<String>,

    /// Render permission cells as colored HTML
    pub styled_cells: bool,
}

impl Default for KavConfig {
    fn default() -> Self {
        Self {
            rakkess_path: None,
            who_can_path: None,
            verbs: DEFAULT_VERBS.iter().map(|v| v.to_string()).collect(),
            styled_cells: false,
        }
    }
}

impl KavConfig {
    /// Load configuration from a file that must exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Default config file location for the current user
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        config_dir.join(APP_NAME).join(CONFIG_FILE)
    }

    /// Verbs must be non-empty words that can be joined with commas
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verbs.is_empty() {
            return Err(ConfigError::InvalidVerbs("no verbs configured".to_string()));
        }
        if let Some(bad) = self
            .verbs
            .iter()
            .find(|v| v.is_empty() || v.contains(',') || v.contains(char::is_whitespace))
        {
            return Err(ConfigError::InvalidVerbs(format!("'{bad}'")));
        }
        Ok(())
    }

    /// Binary to run for `rakkess`
    pub fn rakkess_program(&self) -> PathBuf {
        self.rakkess_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(RAKKESS_TOOL))
    }

    /// Binary to run for `kubectl-who-can`
    pub fn who_can_program(&self) -> PathBuf {
        self.who_can_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(WHO_CAN_TOOL))
    }

    /// Permission cell style for rendered matrices
    pub fn cell_style(&self) -> CellStyle {
        if self.styled_cells {
            CellStyle::Styled
        } else {
            CellStyle::Plain
        }
    }
}
