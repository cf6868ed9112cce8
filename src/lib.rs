//! # Breaking News
//!
//! Races several independent news sources and returns the first complete,
//! time-ordered report, with each item's story preview image cropped and
//! embedded inline.
//!
//! ## Architecture
//!
//! The pipeline is built from smallest to largest:
//! 1. **Enrichment** ([`enrich`]): resolve one item's story page, find its
//!    preview image, crop and encode it
//! 2. **Collection** ([`collector`]): enrich a whole batch concurrently under
//!    a deadline, keeping whatever finished
//! 3. **Sources** ([`sources`]): fetch a batch from one origin and collect it
//! 4. **Aggregation** ([`aggregate`]): race all sources, first report wins
//!
//! Data flows back up: enriched items form a source's report, and the first
//! source to finish decides the result.

use std::sync::Arc;
use tracing::{info, warn};

pub mod aggregate;
pub mod cli;
pub mod collector;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod media;
pub mod models;
pub mod outputs;
pub mod page;
pub mod sources;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::aggregate;
pub use config::Config;
pub use error::{AggregateError, SourceError};
pub use models::{Item, RawItem, Report};

use collector::Collector;
use enrich::ImageEnricher;
use fetch::Fetcher;
use sources::Source;
use sources::rss::RssFeeds;
use sources::twitter::TwitterTimeline;

/// Build every source the configuration enables, sharing one fetcher and
/// one collector between them.
///
/// The Twitter timeline is enabled by a bearer token, the RSS source by at
/// least one feed URL.
pub fn build_sources(config: &Config, fetcher: Arc<dyn Fetcher>) -> Vec<Arc<dyn Source>> {
    let enricher = Arc::new(ImageEnricher::new(Arc::clone(&fetcher), config.media.clone()));
    let collector = Arc::new(
        Collector::new(enricher, config.collector.deadline())
            .with_max_in_flight(config.collector.max_in_flight),
    );

    let mut sources: Vec<Arc<dyn Source>> = Vec::new();
    if config.twitter.bearer_token.is_some() {
        sources.push(Arc::new(TwitterTimeline::new(
            config.twitter.clone(),
            Arc::clone(&fetcher),
            Arc::clone(&collector),
        )));
    } else {
        warn!("No Twitter bearer token configured; skipping Twitter source");
    }
    if !config.rss.feeds.is_empty() {
        sources.push(Arc::new(RssFeeds::new(
            config.rss.clone(),
            Arc::clone(&fetcher),
            Arc::clone(&collector),
        )));
    }

    let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
    info!(?names, "Configured sources");
    sources
}

/// Version tag stamped on every report: the crate version and, when the
/// build provided one through `BREAKING_NEWS_COMMIT`, the commit id.
pub fn version_tag() -> String {
    format!(
        "{}.{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("BREAKING_NEWS_COMMIT").unwrap_or("unknown")
    )
}
