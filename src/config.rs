//! Runtime configuration injected into the aggregator, collector and sources.
//!
//! Every field has a default so an empty (or absent) YAML file yields a
//! usable configuration. The CLI layer applies its overrides on top of the
//! loaded value; nothing below this module reads the process environment.
//!
//! # Example
//!
//! ```yaml
//! aggregate_timeout_secs: 40
//! collector:
//!   deadline_secs: 25
//! media:
//!   width: 600
//!   height: 300
//! twitter:
//!   user_id: "428333"
//! rss:
//!   feeds:
//!     - http://rss.cnn.com/rss/cnn_latest.rss
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on the whole race, in seconds.
    pub aggregate_timeout_secs: u64,
    pub collector: CollectorConfig,
    pub http: HttpConfig,
    pub media: MediaConfig,
    pub twitter: TwitterConfig,
    pub rss: RssConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggregate_timeout_secs: 40,
            collector: CollectorConfig::default(),
            http: HttpConfig::default(),
            media: MediaConfig::default(),
            twitter: TwitterConfig::default(),
            rss: RssConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Wall-clock budget for enriching one source's batch.
    pub deadline_secs: u64,
    /// Cap on simultaneously running enrichment tasks. `None` means one
    /// task per item with no cap.
    pub max_in_flight: Option<usize>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 25,
            max_in_flight: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("breaking_news/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Preview image settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaConfig {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
    /// CSS selector locating the preview image tag on a linked page.
    pub selector: String,
    /// Attribute of the selected element holding the image URL.
    pub attribute: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 300,
            jpeg_quality: 80,
            selector: "meta[property='og:image']".to_string(),
            attribute: "content".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TwitterConfig {
    /// v2 API bearer token. The source is skipped when unset.
    pub bearer_token: Option<String>,
    /// Account whose timeline is read (428333 is @cnnbrk).
    pub user_id: String,
    pub endpoint: String,
    pub max_results: u32,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            user_id: "428333".to_string(),
            endpoint: "https://api.twitter.com/2".to_string(),
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RssConfig {
    pub feeds: Vec<String>,
    /// Newest items kept across all feeds.
    pub max_items: usize,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            max_items: 20,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid YAML for this schema.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|error| ConfigError::Read {
            path: path_str.clone(),
            error,
        })?;
        let config = Self::from_yaml(&raw).map_err(|error| ConfigError::Parse {
            path: path_str,
            error,
        })?;
        info!("Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Reject values that would make the pipeline degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregate_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "aggregate_timeout_secs must be positive".to_string(),
            ));
        }
        if self.collector.deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "collector.deadline_secs must be positive".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be positive".to_string(),
            ));
        }
        if self.collector.max_in_flight == Some(0) {
            return Err(ConfigError::Invalid(
                "collector.max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.media.width == 0 || self.media.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "media size {}x{} must be non-zero",
                self.media.width, self.media.height
            )));
        }
        if !(1..=100).contains(&self.media.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "media.jpeg_quality {} is outside 1..=100",
                self.media.jpeg_quality
            )));
        }
        if scraper::Selector::parse(&self.media.selector).is_err() {
            return Err(ConfigError::Invalid(format!(
                "media.selector {:?} is not a valid CSS selector",
                self.media.selector
            )));
        }
        Ok(())
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate_timeout_secs)
    }
}

impl CollectorConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
