//! Data models for fetched pages and the records written to the NDJSON file.
//!
//! - [`FetchedPage`]: a raw HTTP response, alive only until extraction finishes
//! - [`PageRecord`]: one output line, `{"url", "text", "crawled_at"}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A response as delivered by a transport, before status and content checks.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL actually fetched, after following redirects.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body decoded as text.
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only HTML (including XHTML) documents are handed to the extractor.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("html"))
    }
}

/// One extracted page, serialized as a single NDJSON line.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PageRecord {
    /// The post-redirect URL of the response.
    pub url: String,
    /// Normalised article text.
    pub text: String,
    /// Wall-clock time at which the record was built.
    #[serde(with = "rfc3339_nanos")]
    pub crawled_at: DateTime<Utc>,
}

impl PageRecord {
    /// Build a record stamped with the current time.
    pub fn new(url: &Url, text: String) -> Self {
        Self {
            url: url.to_string(),
            text,
            crawled_at: Utc::now(),
        }
    }
}

/// RFC 3339 with nanosecond precision, e.g. `2024-01-02T15:04:05.123456789Z`.
mod rfc3339_nanos {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}
