//! # Wiki NDJSON Crawler
//!
//! An offline batch crawler that turns a list of Wikipedia article URLs into
//! a newline-delimited JSON corpus, one `{"url", "text", "crawled_at"}`
//! record per page.
//!
//! ## Usage
//!
//! ```sh
//! wiki_ndjson_crawler urls.txt corpus.ndjson
//! ```
//!
//! ## Architecture
//!
//! 1. **Input**: read and trim the URL list
//! 2. **Fetching**: allow-listed URLs are fetched two at a time, with a random
//!    delay of up to two seconds between dispatches
//! 3. **Extraction**: headings and paragraphs of `div.mw-parser-output` are
//!    joined, stripped of LaTeX-ish markup and whitespace-collapsed
//! 4. **Output**: each record is appended to the NDJSON file as one line
//!
//! Standard output carries one `Visiting: <url>` line per fetch and a final
//! summary line. Diagnostics go to standard error (`RUST_LOG` filters them).

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::error::Error;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod crawler;
mod error;
mod fetcher;
mod inputs;
mod models;
mod outputs;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::load_config;
use fetcher::{HttpTransport, RetryTransport};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            debug!(error = %e, "Invalid arguments");
            println!("{}", Cli::command().render_usage());
            return Ok(ExitCode::from(1));
        }
    };
    debug!(?args, "Parsed CLI arguments");

    let start_time = std::time::Instant::now();

    let config = load_config(args.config.as_deref()).await?;
    let transport = RetryTransport::new(
        HttpTransport::new(&config)?,
        config.max_retries,
        config.retry_base_delay(),
    );

    let stats = crawler::run(&args.input_urls, &args.output_ndjson, &config, transport).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        dispatched = stats.dispatched(),
        visited = stats.visited,
        written = stats.written,
        "Execution complete"
    );
    println!(
        "Crawl completed in {:?}. Output saved to {}",
        elapsed,
        args.output_ndjson.display()
    );

    Ok(ExitCode::SUCCESS)
}
