pub mod config;
pub mod search;
pub mod serve;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::scanner::WorkspaceFiles;
use crate::core::search::SearchService;

/// Canonical workspace root, or `None` when `path` is not a directory
pub fn resolve_workspace(path: Option<&str>) -> Option<PathBuf> {
    let path = path.unwrap_or(".");
    match std::fs::canonicalize(path) {
        Ok(root) if root.is_dir() => Some(root),
        Ok(root) => {
            tracing::warn!(path = %root.display(), "workspace is not a directory");
            None
        }
        Err(err) => {
            tracing::warn!(path, error = %err, "workspace not found");
            None
        }
    }
}

pub fn search_service(config: &Config) -> SearchService {
    let files =
        WorkspaceFiles::new(&config.ignore_dirs).with_gitignore(config.respect_gitignore);
    SearchService::new(Arc::new(files))
}
