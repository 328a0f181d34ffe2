//! The crawl loop: URL list in, NDJSON records out.
//!
//! 1. **Admission**: each input URL is parsed and checked against the
//!    allow-list; repeats of an already admitted URL are dropped
//! 2. **Fetching**: admitted URLs are dispatched in input order, at most
//!    `parallelism` at a time, each paced and announced by the [`Fetcher`]
//! 3. **Extraction**: the article text is pulled out of each HTML response
//! 4. **Output**: a [`PageRecord`] is built and appended to the sink
//!
//! Every failure after admission is logged and costs only that URL's record.
//! Records are written as visits complete, so output order is unspecified.

use crate::config::CrawlerConfig;
use crate::fetcher::{Fetcher, Transport};
use crate::inputs::read_urls;
use crate::models::PageRecord;
use crate::outputs::ndjson::NdjsonSink;
use crate::scrapers::wikipedia::extract_article_text;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::error::Error;
use std::path::Path;
use tokio::io::AsyncWrite;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Per-run counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    /// Non-empty input lines.
    pub input: usize,
    /// Malformed URLs and URLs outside the allow-list.
    pub rejected: usize,
    /// Repeats of an already admitted URL.
    pub duplicates: usize,
    /// Network errors, non-2xx and non-HTML responses.
    pub failed: usize,
    /// Pages with no article body or no non-empty text element.
    pub empty: usize,
    /// Records that could not be written.
    pub dropped: usize,
    /// Records written.
    pub written: usize,
    /// `Visiting:` notices printed, one per fetch attempt.
    pub visited: usize,
}

impl CrawlStats {
    pub fn dispatched(&self) -> usize {
        self.input - self.rejected - self.duplicates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Written,
    Empty,
    Failed,
    Dropped,
}

/// Admit, deduplicate and dispatch `urls`, writing one record per page with
/// extractable text. Returns once every dispatched visit has finished.
#[instrument(level = "info", skip_all, fields(urls = urls.len()))]
pub async fn crawl<T, W>(urls: &[String], fetcher: &Fetcher<T>, sink: &NdjsonSink<W>) -> CrawlStats
where
    T: Transport,
    W: AsyncWrite + Unpin,
{
    let mut stats = CrawlStats {
        input: urls.len(),
        ..CrawlStats::default()
    };

    let mut admitted = Vec::with_capacity(urls.len());
    for raw in urls {
        match fetcher.admit(raw) {
            Ok(url) => admitted.push(url),
            Err(e) => {
                warn!(url = %raw, error = %e, "Skipping URL");
                stats.rejected += 1;
            }
        }
    }

    let admitted_count = admitted.len();
    let unique: Vec<Url> = admitted.into_iter().unique().collect();
    stats.duplicates = admitted_count - unique.len();
    if stats.duplicates > 0 {
        debug!(duplicates = stats.duplicates, "Dropped repeated URLs");
    }

    info!(
        dispatching = unique.len(),
        parallelism = fetcher.parallelism(),
        "Starting crawl"
    );

    let visited_before = fetcher.visited();
    let outcomes: Vec<Outcome> = stream::iter(unique)
        .map(|url| visit(fetcher, sink, url))
        .buffer_unordered(fetcher.parallelism())
        .collect()
        .await;

    for outcome in outcomes {
        match outcome {
            Outcome::Written => stats.written += 1,
            Outcome::Empty => stats.empty += 1,
            Outcome::Failed => stats.failed += 1,
            Outcome::Dropped => stats.dropped += 1,
        }
    }
    stats.visited = fetcher.visited() - visited_before;

    info!(
        input = stats.input,
        rejected = stats.rejected,
        duplicates = stats.duplicates,
        failed = stats.failed,
        empty = stats.empty,
        dropped = stats.dropped,
        written = stats.written,
        visited = stats.visited,
        "Crawl finished"
    );
    stats
}

/// Fetch, extract and record one page.
async fn visit<T, W>(fetcher: &Fetcher<T>, sink: &NdjsonSink<W>, url: Url) -> Outcome
where
    T: Transport,
    W: AsyncWrite + Unpin,
{
    let page = match fetcher.fetch(&url).await {
        Ok(page) => page,
        Err(e) => {
            error!(%url, error = %e, "Fetch failed");
            return Outcome::Failed;
        }
    };

    let Some(text) = extract_article_text(&page.body) else {
        debug!(%url, "No article text; skipping");
        return Outcome::Empty;
    };

    let record = PageRecord::new(&page.url, text);
    match sink.append(&record).await {
        Ok(()) => {
            debug!(url = %record.url, chars = record.text.len(), "Wrote record");
            Outcome::Written
        }
        Err(e) => {
            error!(url = %record.url, error = %e, "Failed to write record; dropping");
            Outcome::Dropped
        }
    }
}

/// Read the URL list, create the output, crawl everything and close the
/// output. Only the startup steps and the final close can fail the run.
#[instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
pub async fn run<T>(
    input: &Path,
    output: &Path,
    config: &CrawlerConfig,
    transport: T,
) -> Result<CrawlStats, Box<dyn Error>>
where
    T: Transport,
{
    let urls = read_urls(input).await?;
    let sink = NdjsonSink::create(output).await?;
    let fetcher = Fetcher::new(transport, config);

    let stats = crawl(&urls, &fetcher, &sink).await;

    sink.close().await?;
    Ok(stats)
}
