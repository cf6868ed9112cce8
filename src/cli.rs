//! Command-line interface definitions for Breaking News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Flags override values loaded from the optional YAML config file; secrets
//! can also come from environment variables.

use crate::config::Config;
use clap::Parser;

/// Command-line arguments for the Breaking News application.
///
/// # Examples
///
/// ```sh
/// # Race the Twitter timeline against two RSS feeds, print JSON to stdout
/// breaking_news --twitter-bearer-token $TOKEN \
///     --rss-feed http://rss.cnn.com/rss/cnn_latest.rss \
///     --rss-feed https://feeds.npr.org/1001/rss.xml
///
/// # Load settings from a file and write ./out/report.json
/// breaking_news -c breaking_news.yaml -o ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory to write report.json into (stdout when omitted)
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Overall deadline for the source race, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Deadline for enriching one source's batch, in seconds
    #[arg(long)]
    pub collect_deadline_secs: Option<u64>,

    /// Maximum enrichment tasks running at once per source
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Twitter API v2 bearer token
    #[arg(long, env = "TWITTER_V2_BEARER_TOKEN", hide_env_values = true)]
    pub twitter_bearer_token: Option<String>,

    /// Twitter user id whose timeline is read
    #[arg(long)]
    pub twitter_user_id: Option<String>,

    /// RSS feed URL to race (repeatable)
    #[arg(long = "rss-feed")]
    pub rss_feeds: Vec<String>,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(secs) = self.timeout_secs {
            config.aggregate_timeout_secs = secs;
        }
        if let Some(secs) = self.collect_deadline_secs {
            config.collector.deadline_secs = secs;
        }
        if self.max_in_flight.is_some() {
            config.collector.max_in_flight = self.max_in_flight;
        }
        if let Some(token) = &self.twitter_bearer_token {
            config.twitter.bearer_token = Some(token.clone());
        }
        if let Some(user_id) = &self.twitter_user_id {
            config.twitter.user_id = user_id.clone();
        }
        if !self.rss_feeds.is_empty() {
            config.rss.feeds = self.rss_feeds.clone();
        }
        config
    }
}
