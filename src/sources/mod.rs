//! News sources that can compete in the aggregation race.
//!
//! Each source follows the same three-step pattern:
//!
//! 1. **Fetching**: Download a bounded batch of raw items from its origin
//! 2. **Filtering**: Drop raw items that carry no outbound link
//! 3. **Collecting**: Hand the rest to a [`Collector`] for enrichment
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Twitter timeline | [`twitter`] | v2 REST API | Requires a bearer token |
//! | RSS feeds | [`rss`] | RSS 2.0 XML | Any number of feeds, fetched concurrently |
//!
//! A failure in step 1 fails the whole source with a [`SourceError`];
//! failures inside enrichment only degrade individual items.
//!
//! [`Collector`]: crate::collector::Collector

use crate::error::SourceError;
use crate::models::{RawItem, Report};
use async_trait::async_trait;

pub mod rss;
pub mod twitter;

/// A uniform capability over one origin of news items.
#[async_trait]
pub trait Source: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Produce a complete report, or fail if the origin could not be read.
    async fn fetch(&self) -> Result<Report, SourceError>;
}

/// Keep only the raw items that carry an outbound link.
pub fn with_links(raw_items: Vec<RawItem>) -> Vec<RawItem> {
    raw_items.into_iter().filter(RawItem::has_link).collect()
}
