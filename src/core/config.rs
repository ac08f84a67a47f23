use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 12800;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Extensions searched when a caller does not name any (CLI only)
    #[serde(default = "default_file_types")]
    pub file_types: Vec<String>,
    /// Directory names pruned from every walk
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
    #[serde(default)]
    pub respect_gitignore: bool,
    /// Per-request deadline; unset means a search may run as long as it needs
    #[serde(default)]
    pub search_timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_file_types() -> Vec<String> {
    vec!["tsx".to_string(), "jsx".to_string(), "html".to_string()]
}

fn default_ignore_dirs() -> Vec<String> {
    vec!["node_modules".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            file_types: default_file_types(),
            ignore_dirs: default_ignore_dirs(),
            respect_gitignore: false,
            search_timeout_ms: None,
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = match std::env::var_os("FEIC_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".feic"),
        };
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn state_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("state"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_ms.map(Duration::from_millis)
    }
}
