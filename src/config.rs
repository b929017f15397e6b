//! User configuration for modelink
//!
//! Read from `$XDG_CONFIG_HOME/modelink/config.json`; missing keys and a
//! missing file fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use modelink_session::SessionOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Undo steps kept per session
    pub max_history: usize,
    /// Glue range for dragged handles
    pub glue_distance: f64,
    /// Log filter used when `RUST_LOG` is not set
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        let options = SessionOptions::default();
        Self {
            max_history: options.max_history,
            glue_distance: options.glue_distance,
            log: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load from the config directory, or defaults if there is no file
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            });
        config_dir.join("modelink").join("config.json")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to save config {:?}", path))?;
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            max_history: self.max_history,
            glue_distance: self.glue_distance,
        }
    }
}
