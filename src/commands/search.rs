use anyhow::Result;

use crate::core::config::Config;
use crate::core::search::{SearchRequest, SearchResult};
use crate::ui::status::{print_location, print_not_found};

use super::{resolve_workspace, search_service};

pub struct SearchOptions {
    pub pattern: String,
    pub path: Option<String>,
    pub file_types: Option<Vec<String>>,
}

/// One lookup without the HTTP round trip
pub async fn run(options: SearchOptions) -> Result<()> {
    let config = Config::load()?;
    let workspace = resolve_workspace(options.path.as_deref());
    let request = SearchRequest {
        regex: options.pattern,
        file_types: options
            .file_types
            .unwrap_or_else(|| config.file_types.clone()),
    };

    let service = search_service(&config);
    let result = service.search(&request, workspace.as_deref())?;

    match result {
        SearchResult::Found(location) => print_location(&location),
        SearchResult::NotFound => print_not_found(&request.regex),
    }

    Ok(())
}
