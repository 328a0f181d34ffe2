//! Crawler settings.
//!
//! Every field has a default, so an absent config file and an empty one
//! behave the same: two parallel fetches, a random delay of up to two
//! seconds between dispatches to a host, `en.wikipedia.org` only, no retries.
//!
//! ```yaml
//! allowed_domains: ["en.wikipedia.org"]
//! parallelism: 2
//! random_delay_ms: 2000
//! max_retries: 3
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Politeness, transport and retry settings for one run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Hosts that may be fetched, compared exactly against the URL host.
    pub allowed_domains: Vec<String>,
    /// Maximum number of fetches in flight at once.
    pub parallelism: usize,
    /// Upper bound of the uniformly random delay between dispatches to one host.
    pub random_delay_ms: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Redirect hops followed before the request fails.
    pub max_redirects: usize,
    /// Whole-request timeout. `None` keeps the transport default.
    pub request_timeout_secs: Option<u64>,
    /// Retry attempts for transient failures. Zero disables retrying.
    pub max_retries: usize,
    /// First backoff delay; doubles with each attempt.
    pub retry_base_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            allowed_domains: vec!["en.wikipedia.org".to_string()],
            parallelism: 2,
            random_delay_ms: 2000,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            request_timeout_secs: None,
            max_retries: 0,
            retry_base_delay_ms: 1000,
        }
    }
}

impl CrawlerConfig {
    pub fn random_delay(&self) -> Duration {
        Duration::from_millis(self.random_delay_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Reject settings that would make the crawl stall or fetch nothing.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.parallelism == 0 {
            return Err("parallelism must be at least 1".into());
        }
        if self.allowed_domains.iter().all(|d| d.trim().is_empty()) {
            return Err("allowed_domains must name at least one host".into());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".into());
        }
        Ok(())
    }
}

/// Parse a YAML config document.
pub fn parse_config(yaml: &str) -> Result<CrawlerConfig, Box<dyn Error>> {
    // An empty document deserializes to unit, not to an empty mapping.
    let config = if yaml.trim().is_empty() {
        CrawlerConfig::default()
    } else {
        serde_yaml::from_str::<CrawlerConfig>(yaml)?
    };
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, or the defaults when no path is given.
#[instrument(level = "info", skip_all, fields(path = ?path))]
pub async fn load_config(path: Option<&Path>) -> Result<CrawlerConfig, Box<dyn Error>> {
    let config = match path {
        Some(path) => {
            let yaml = tokio::fs::read_to_string(path).await?;
            parse_config(&yaml)?
        }
        None => CrawlerConfig::default(),
    };
    info!(
        parallelism = config.parallelism,
        random_delay_ms = config.random_delay_ms,
        allowed_domains = ?config.allowed_domains,
        max_retries = config.max_retries,
        "Loaded crawler configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_politeness_policy() {
        let config = CrawlerConfig::default();
        assert_eq!(config.allowed_domains, vec!["en.wikipedia.org"]);
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.random_delay(), Duration::from_secs(2));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.request_timeout(), None);
        assert!(config.user_agent.starts_with("wiki_ndjson_crawler/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = parse_config("parallelism: 4\nmax_retries: 3\n").unwrap();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.random_delay_ms, 2000);
        assert_eq!(config.allowed_domains, vec!["en.wikipedia.org"]);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(parse_config("").unwrap(), CrawlerConfig::default());
        assert_eq!(parse_config("  \n").unwrap(), CrawlerConfig::default());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        assert!(parse_config("parallelism: 0").is_err());
    }

    #[test]
    fn test_empty_allow_list_rejected() {
        assert!(parse_config("allowed_domains: []").is_err());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(parse_config("parallelism: [not, a, number]").is_err());
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "random_delay_ms: 0").unwrap();
        writeln!(file, "request_timeout_secs: 30").unwrap();

        let config = load_config(Some(file.path())).await.unwrap();
        assert_eq!(config.random_delay(), Duration::ZERO);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_load_config_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(load_config(Some(&missing)).await.is_err());
    }

    #[tokio::test]
    async fn test_load_config_without_path() {
        assert_eq!(load_config(None).await.unwrap(), CrawlerConfig::default());
    }
}
