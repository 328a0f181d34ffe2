//! URL list input.
//!
//! One URL per line; lines are trimmed and blank lines skipped. No other
//! validation happens here: malformed URLs fail later, per URL.

use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};

/// Trimmed, non-empty lines of `contents`, in order.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the URL list at `path`. Failing to read it is fatal to the run.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_urls(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let urls = parse_url_list(&contents);
    info!(count = urls.len(), "Read URL list");
    Ok(urls)
}
