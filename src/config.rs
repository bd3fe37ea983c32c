//! IDS Configuration Types
//!
//! Resolved configuration consumed by the monitor and the sink setup.
//! Loading and merging configuration sources is left to the host; this
//! module only reads an already-resolved document.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// IDS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IdsConfig {
    /// General scanning options
    #[serde(default)]
    pub general: GeneralConfig,
    /// Report recording options
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IdsConfig {
    /// Parse a resolved JSON configuration document
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse IDS configuration")
    }

    /// Read a resolved JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&content)
    }

    /// Base path applied to relative targets, when enabled
    pub fn base_path(&self) -> Option<&Path> {
        match (&self.general.base_path, self.general.use_base_path) {
            (Some(base), true) if !base.as_os_str().is_empty() => Some(base.as_path()),
            _ => None,
        }
    }

    /// Effective file sink target
    pub fn log_file_path(&self) -> Option<PathBuf> {
        let path = self.logging.path.as_ref()?;
        Some(match self.base_path() {
            Some(base) => base.join(path),
            None => path.clone(),
        })
    }
}

/// General scanning options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GeneralConfig {
    /// Directory that relative targets are resolved against
    #[serde(default)]
    pub base_path: Option<PathBuf>,
    /// Whether `base_path` is applied
    #[serde(default)]
    pub use_base_path: bool,
    /// Fully-qualified parameter names (`scope.name`) that are never scanned
    #[serde(default)]
    pub exceptions: Vec<String>,
    /// Also evaluate parameter names against the catalog
    #[serde(default)]
    pub scan_keys: bool,
}

/// Sink kinds selectable by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    File,
    Database,
}

/// Report recording options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Sinks to enable, in dispatch order
    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkKind>,
    /// File sink target
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Database connection target, `sqlite:<path>`
    #[serde(default)]
    pub wrapper: Option<String>,
    /// Database table receiving one row per event
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            sinks: default_sinks(),
            path: None,
            wrapper: None,
            table: default_table(),
        }
    }
}

fn default_sinks() -> Vec<SinkKind> {
    vec![SinkKind::File]
}

fn default_table() -> String {
    "intrusions".to_string()
}
