//! Command-line interface definitions.
//!
//! Two positional arguments, the URL list and the NDJSON output path, plus
//! an optional YAML config file.

use clap::Parser;
use std::path::PathBuf;

/// Crawl Wikipedia articles listed in a text file and write their extracted
/// text as newline-delimited JSON.
///
/// # Examples
///
/// ```sh
/// wiki_ndjson_crawler urls.txt corpus.ndjson
///
/// # With custom politeness settings
/// wiki_ndjson_crawler urls.txt corpus.ndjson --config crawler.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Text file with one URL per line
    pub input_urls: PathBuf,

    /// NDJSON file to create (truncated if it exists)
    pub output_ndjson: PathBuf,

    /// Optional path to a YAML crawler config
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
