//! Persisted running flag, one JSON record per workspace

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Stopped,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Running => "running",
            Status::Stopped => "stopped",
            Status::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    pub is_running: bool,
    pub last_status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            is_running: false,
            last_status: Status::Stopped,
            updated_at: None,
        }
    }
}

impl ServerState {
    pub fn running() -> Self {
        Self::stamped(true, Status::Running)
    }

    pub fn stopped() -> Self {
        Self::stamped(false, Status::Stopped)
    }

    pub fn error() -> Self {
        Self::stamped(false, Status::Error)
    }

    fn stamped(is_running: bool, last_status: Status) -> Self {
        Self {
            is_running,
            last_status,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// File-backed store for a single `ServerState`
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store keyed by workspace path under `state_dir`
    pub fn for_workspace(state_dir: &Path, workspace: Option<&Path>) -> Self {
        let key = match workspace {
            Some(root) => workspace_key(root),
            None => "no-workspace".to_string(),
        };
        Self::at(state_dir.join(format!("{}.json", key)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state loads as the default
    pub fn load(&self) -> ServerState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return ServerState::default(),
        };
        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "discarding corrupt server state");
                ServerState::default()
            }
        }
    }

    pub fn save(&self, state: &ServerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

pub fn workspace_key(root: &Path) -> String {
    let canonical = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hex::encode(&hasher.finalize()[..8])
}
