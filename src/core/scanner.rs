use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File listing and reading capability used by the search.
///
/// Listing order is whatever the implementation yields; callers only rely on
/// it being stable between two calls over an unchanged tree.
pub trait FileSource: Send + Sync {
    fn list_files(&self, root: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Filesystem-backed source that walks the workspace with `ignore`
pub struct WorkspaceFiles {
    ignore_dirs: Arc<HashSet<String>>,
    respect_gitignore: bool,
}

impl WorkspaceFiles {
    pub fn new(ignore_dirs: &[String]) -> Self {
        Self {
            ignore_dirs: Arc::new(ignore_dirs.iter().cloned().collect()),
            respect_gitignore: false,
        }
    }

    pub fn with_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }
}

impl FileSource for WorkspaceFiles {
    fn list_files(&self, root: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            ));
        }

        let wanted: HashSet<String> = extensions
            .iter()
            .filter_map(|e| normalize_extension(e))
            .collect();

        let ignore_dirs = Arc::clone(&self.ignore_dirs);
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().map_or(false, |t| t.is_dir());
                !(is_dir && ignore_dirs.contains(&*entry.file_name().to_string_lossy()))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let matches = path
                .extension()
                .map(|ext| wanted.contains(&ext.to_string_lossy().to_lowercase()))
                .unwrap_or(false);
            if matches {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// `".TSX"` and `"tsx"` name the same extension; blank names none.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}
