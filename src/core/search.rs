use fancy_regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::matcher::first_match_in_text;
use crate::core::scanner::{normalize_extension, FileSource};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid regex: {0}")]
    InvalidPattern(#[from] fancy_regex::Error),
    #[error("No workspace is open")]
    NoWorkspace,
    #[error("Failed to list files: {0}")]
    Enumerate(#[source] io::Error),
}

/// Body of a `POST /` lookup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchRequest {
    pub regex: String,
    #[serde(rename = "fileTypes")]
    pub file_types: Vec<String>,
}

impl SearchRequest {
    #[cfg(test)]
    pub fn new(regex: impl Into<String>, file_types: &[&str]) -> Self {
        Self {
            regex: regex.into(),
            file_types: file_types.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Normalized extensions, failing when none are usable
    pub fn extensions(&self) -> Result<Vec<String>, SearchError> {
        if self.file_types.is_empty() {
            return Err(SearchError::InvalidRequest(
                "fileTypes must list at least one extension".to_string(),
            ));
        }
        self.file_types
            .iter()
            .map(|ext| {
                normalize_extension(ext).ok_or_else(|| {
                    SearchError::InvalidRequest(format!("invalid file type {:?}", ext))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLocation {
    pub file_path: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for MatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_path.display(), self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    Found(MatchLocation),
    NotFound,
}

/// First-hit regex search over a workspace.
///
/// Holds no state between calls; every search re-lists and re-reads.
#[derive(Clone)]
pub struct SearchService {
    source: Arc<dyn FileSource>,
}

impl SearchService {
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        Self { source }
    }

    pub fn search(
        &self,
        request: &SearchRequest,
        root: Option<&Path>,
    ) -> Result<SearchResult, SearchError> {
        let root = root.ok_or(SearchError::NoWorkspace)?;
        let extensions = request.extensions()?;
        // Compile before touching the filesystem so a bad pattern fails fast
        let pattern = Regex::new(&request.regex)?;

        let files = self
            .source
            .list_files(root, &extensions)
            .map_err(SearchError::Enumerate)?;
        tracing::debug!(
            root = %root.display(),
            candidates = files.len(),
            regex = %request.regex,
            "scanning workspace"
        );

        for file in files {
            let content = match self.source.read_to_string(&file) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(path = %file.display(), error = %err, "failed to read file");
                    continue;
                }
            };

            if let Some((line, column)) = first_match_in_text(&content, &pattern)? {
                return Ok(SearchResult::Found(MatchLocation {
                    file_path: file,
                    line,
                    column,
                }));
            }
        }

        Ok(SearchResult::NotFound)
    }
}
