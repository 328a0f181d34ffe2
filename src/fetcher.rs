//! Page fetching with allow-listing, politeness pacing and optional retries.
//!
//! # Architecture
//!
//! - [`Transport`]: performs one HTTP GET and returns the raw response
//! - [`HttpTransport`]: the `reqwest` implementation
//! - [`RetryTransport`]: decorator that retries transient failures with
//!   exponential backoff and jitter
//! - [`Pacer`]: spaces out consecutive dispatches to the same host by a
//!   uniformly random delay
//! - [`Fetcher`]: checks the allow-list, waits on the pacer, announces the
//!   visit and validates the response
//!
//! The concurrency cap is not enforced here; the crawl loop never has more
//! than `parallelism` fetches outstanding.

use crate::config::CrawlerConfig;
use crate::error::{FetchError, is_transient_status};
use crate::models::FetchedPage;
use rand::{Rng, rng};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, error, instrument, warn};
use url::Url;

/// A way of performing a single GET request.
///
/// Non-2xx responses are returned as pages, not errors; the [`Fetcher`]
/// decides what to accept.
pub trait Transport {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

impl<T> Transport for Arc<T>
where
    T: Transport,
{
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.as_ref().get(url).await
    }
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with the configured User-Agent, timeout and redirect
    /// policy. Redirects to hosts outside the allow-list are refused.
    pub fn new(config: &CrawlerConfig) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            client: client_builder(config).build()?,
        })
    }

    /// Same policy as [`HttpTransport::new`], ignoring proxy settings, for
    /// talking to a local test server.
    #[cfg(test)]
    pub fn direct(config: &CrawlerConfig) -> Self {
        Self {
            client: client_builder(config).no_proxy().build().unwrap(),
        }
    }
}

fn client_builder(config: &CrawlerConfig) -> reqwest::ClientBuilder {
    let allowed = config.allowed_domains.clone();
    let max_redirects = config.max_redirects;
    let policy = Policy::custom(move |attempt| {
        // `previous` includes the original URL.
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("stopped after {max_redirects} redirects"));
        }
        let host = attempt.url().host_str().unwrap_or_default().to_string();
        if is_allowed_host(&allowed, &host) {
            attempt.follow()
        } else {
            attempt.error(format!("redirect to forbidden domain: {host}"))
        }
    });

    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .redirect(policy);
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder
}

impl Transport for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Error bodies are never extracted, so don't download them.
        let body = if response.status().is_success() {
            response.text().await?
        } else {
            String::new()
        };

        debug!(status, final_url = %final_url, bytes = body.len(), "Received response");
        Ok(FetchedPage {
            url: final_url,
            status,
            content_type,
            body,
        })
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Transport`].
///
/// Transport errors and 408/429/5xx responses are retried. The delay before
/// retry `n` is:
/// ```text
/// delay = min(base_delay * 2^(n-1), max_delay) + random_jitter(0..250ms)
/// ```
/// With `max_retries == 0` every result is returned as-is.
pub struct RetryTransport<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryTransport<T>
where
    T: Transport,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTransport")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Transport for RetryTransport<T>
where
    T: Transport,
{
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let total_t0 = std::time::Instant::now();
        let mut attempt = 0usize;

        loop {
            let result = self.inner.get(url).await;
            let transient = match &result {
                Ok(page) => is_transient_status(page.status),
                Err(e) => e.is_transient(),
            };
            if !transient {
                return result;
            }

            attempt += 1;
            if attempt > self.max_retries {
                if self.max_retries > 0 {
                    error!(
                        %url,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        "fetch exhausted retries"
                    );
                }
                return result;
            }

            let delay = self.backoff(attempt);
            match &result {
                Ok(page) => warn!(
                    %url,
                    attempt,
                    max = self.max_retries,
                    ?delay,
                    status = page.status,
                    "fetch attempt failed; backing off"
                ),
                Err(e) => warn!(
                    %url,
                    attempt,
                    max = self.max_retries,
                    ?delay,
                    error = %e,
                    "fetch attempt failed; backing off"
                ),
            }
            sleep(delay).await;
        }
    }
}

/// Spaces out dispatches to the same host.
///
/// Each call to [`Pacer::wait`] draws a delay uniformly from
/// `[0, max_delay]` and sleeps until that long after the previous dispatch
/// to the host. The first dispatch to a host goes out immediately. Waiters
/// queue on a single lock, so dispatches leave one at a time.
///
/// The delay paces dispatch, not completion: it is measured from the
/// previous dispatch, so time already spent since then (for example waiting
/// on a slow in-flight request) counts towards it. A drawn delay that has
/// already elapsed adds nothing.
#[derive(Debug)]
pub struct Pacer {
    max_delay: Duration,
    last_dispatch: Mutex<HashMap<String, Instant>>,
}

impl Pacer {
    pub fn new(max_delay: Duration) -> Self {
        Self {
            max_delay,
            last_dispatch: Mutex::new(HashMap::new()),
        }
    }

    fn random_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..=max_ms))
    }

    /// Block until a request to `host` may be dispatched, then record it.
    pub async fn wait(&self, host: &str) {
        let mut last_dispatch = self.last_dispatch.lock().await;
        if let Some(previous) = last_dispatch.get(host).copied() {
            let delay = self.random_delay();
            let ready_at = previous + delay;
            if ready_at > Instant::now() {
                debug!(host, ?delay, "Pacing dispatch");
                sleep_until(ready_at).await;
            }
        }
        last_dispatch.insert(host.to_string(), Instant::now());
    }
}

fn is_allowed_host(allowed: &[String], host: &str) -> bool {
    allowed.iter().any(|d| d.eq_ignore_ascii_case(host))
}

/// Fetches single pages under the crawl's allow-list and politeness rules.
#[derive(Debug)]
pub struct Fetcher<T> {
    transport: T,
    pacer: Pacer,
    allowed_domains: Vec<String>,
    parallelism: usize,
    visited: AtomicUsize,
}

impl<T> Fetcher<T>
where
    T: Transport,
{
    pub fn new(transport: T, config: &CrawlerConfig) -> Self {
        Self {
            transport,
            pacer: Pacer::new(config.random_delay()),
            allowed_domains: config.allowed_domains.clone(),
            parallelism: config.parallelism.max(1),
            visited: AtomicUsize::new(0),
        }
    }

    /// Number of `Visiting:` notices printed so far, one per dispatched fetch.
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::SeqCst)
    }

    /// Maximum number of fetches the crawl loop may keep in flight.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Parse `raw` and check it against the allow-list, before any I/O.
    pub fn admit(&self, raw: &str) -> Result<Url, FetchError> {
        let url = Url::parse(raw).map_err(|source| FetchError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme {
                url: raw.to_string(),
                scheme: url.scheme().to_string(),
            });
        }
        let host = url.host_str().unwrap_or_default();
        if !is_allowed_host(&self.allowed_domains, host) {
            return Err(FetchError::ForbiddenDomain {
                host: host.to_string(),
            });
        }
        Ok(url)
    }

    /// Pace, announce and perform the request for an admitted URL.
    ///
    /// Succeeds only with a 2xx HTML response.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.pacer.wait(url.host_str().unwrap_or_default()).await;
        println!("Visiting: {url}");
        self.visited.fetch_add(1, Ordering::SeqCst);

        let page = self.transport.get(url).await?;
        if !page.is_success() {
            return Err(FetchError::Status {
                url: page.url.to_string(),
                status: page.status,
            });
        }
        if !page.is_html() {
            return Err(FetchError::NotHtml {
                url: page.url.to_string(),
                content_type: page.content_type,
            });
        }
        Ok(page)
    }
}
