//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/pastebin/config.toml)
//! 3. Environment variables (PASTEBIN_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix
const ENV_PREFIX: &str = "PASTEBIN";

/// Base URL used for share links when none is configured
const DEFAULT_SHARE_URL: &str = "http://localhost:5173";

/// Which gateway implementation backs the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Files under `data_dir`, no network
    #[default]
    Local,
    /// Hosted Firebase Auth and Firestore
    Firebase,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Firebase => write!(f, "firebase"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "firebase" => Ok(Backend::Firebase),
            other => bail!("Unknown backend '{}'. Use 'local' or 'firebase'.", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (pastes, accounts, session, logs)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub backend: Backend,

    /// Web API key of the Firebase project
    #[serde(default)]
    pub firebase_api_key: Option<String>,

    #[serde(default)]
    pub firebase_project_id: Option<String>,

    /// Origin that share links point at
    #[serde(default = "default_share_url")]
    pub share_url: String,

    /// Debug log destination (defaults to `<data_dir>/debug.log`)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::default(),
            firebase_api_key: None,
            firebase_project_id: None,
            share_url: default_share_url(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PASTEBIN_DATA_DIR, PASTEBIN_BACKEND, ...)
    /// 2. Config file (~/.config/pastebin/config.toml or PASTEBIN_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // PASTEBIN_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // PASTEBIN_BACKEND
        if let Ok(val) = std::env::var(format!("{}_BACKEND", ENV_PREFIX)) {
            self.backend = val
                .parse()
                .with_context(|| format!("Invalid {}_BACKEND", ENV_PREFIX))?;
        }

        // PASTEBIN_FIREBASE_API_KEY
        if let Ok(val) = std::env::var(format!("{}_FIREBASE_API_KEY", ENV_PREFIX)) {
            self.firebase_api_key = non_empty(val);
        }

        // PASTEBIN_FIREBASE_PROJECT_ID
        if let Ok(val) = std::env::var(format!("{}_FIREBASE_PROJECT_ID", ENV_PREFIX)) {
            self.firebase_project_id = non_empty(val);
        }

        // PASTEBIN_SHARE_URL
        if let Ok(val) = std::env::var(format!("{}_SHARE_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.share_url = val;
            }
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PASTEBIN_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pastebin")
            .join("config.toml")
    }

    /// Firebase API key and project id, both required for the firebase backend
    pub fn firebase_settings(&self) -> Result<(String, String)> {
        match (&self.firebase_api_key, &self.firebase_project_id) {
            (Some(key), Some(project)) => Ok((key.clone(), project.clone())),
            _ => bail!(
                "The firebase backend needs firebase_api_key and firebase_project_id.\n\
                 Set them with 'paste config set' or the {}_FIREBASE_* variables.",
                ENV_PREFIX
            ),
        }
    }

    /// Get the debug log path
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }

    /// Link under which a paste can be opened directly
    pub fn share_link(&self, id: &str) -> String {
        format!("{}/pastes/{}", self.share_url.trim_end_matches('/'), id)
    }
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pastebin")
}

fn default_share_url() -> String {
    DEFAULT_SHARE_URL.to_string()
}
