//! Error types for per-URL fetch failures and sink writes.
//!
//! Startup failures (unreadable input, uncreatable output, bad config) travel
//! as `Box<dyn Error>` up to `main`. The two enums here cover the failures
//! that are recovered locally: a failed URL or a dropped record.

use thiserror::Error;

/// Why a single URL produced no page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The input line is not an absolute URL.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Only `http` and `https` URLs are fetched.
    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    /// The host is not on the allow-list.
    #[error("forbidden domain: {host}")]
    ForbiddenDomain { host: String },

    /// DNS, connection, TLS, redirect or body read failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The response is not an HTML document.
    #[error("unsupported content type {content_type:?} for {url}")]
    NotHtml {
        url: String,
        content_type: Option<String>,
    },
}

impl FetchError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(e) => !e.is_redirect() && !e.is_builder(),
            FetchError::Status { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// 408, 429 and every 5xx.
pub fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// A record that could not be appended to the output stream.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
