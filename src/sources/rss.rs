//! RSS 2.0 feed source.
//!
//! Every configured feed is fetched concurrently. Items from all feeds are
//! merged, the newest `max_items` are kept, and the batch is handed to the
//! collector like any other source's. A single broken feed is logged and
//! skipped; the source only fails when no feed could be read.

use crate::collector::Collector;
use crate::config::RssConfig;
use crate::error::SourceError;
use crate::fetch::Fetcher;
use crate::models::{Link, RawItem, Report};
use crate::sources::{Source, with_links};
use async_trait::async_trait;
use chrono::DateTime;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

const SOURCE_NAME: &str = "rss";
const PARALLEL_FEEDS: usize = 8;

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Parse an RFC 2822 `pubDate` into unix seconds; unparseable dates sort last.
fn parse_pub_date(raw: &str) -> i64 {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

/// Collapse markup and whitespace out of a description.
fn plain_text(raw: &str) -> String {
    let without_tags = TAGS.replace_all(raw, " ");
    WHITESPACE.replace_all(&without_tags, " ").trim().to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<FeedItem> for RawItem {
    fn from(item: FeedItem) -> Self {
        let link = non_empty(item.link);
        let id = non_empty(item.guid.map(|g| g.value))
            .or_else(|| link.clone())
            .unwrap_or_default();
        let text = non_empty(item.title)
            .or_else(|| non_empty(item.description.as_deref().map(plain_text)))
            .unwrap_or_default();

        RawItem {
            id,
            create_time: item.pub_date.as_deref().map(parse_pub_date).unwrap_or(0),
            text,
            link: link.map(Link::new),
        }
    }
}

/// Parse an RSS document into raw items.
pub fn parse_feed(xml: &str) -> Result<Vec<RawItem>, quick_xml::de::DeError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    Ok(rss.channel.items.into_iter().map(RawItem::from).collect())
}

/// Breaking news from a set of RSS feeds.
pub struct RssFeeds {
    config: RssConfig,
    fetcher: Arc<dyn Fetcher>,
    collector: Arc<Collector>,
}

impl RssFeeds {
    pub fn new(config: RssConfig, fetcher: Arc<dyn Fetcher>, collector: Arc<Collector>) -> Self {
        Self {
            config,
            fetcher,
            collector,
        }
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch_feed(&self, feed_url: &str) -> Result<Vec<RawItem>, SourceError> {
        let response = self
            .fetcher
            .fetch(feed_url, &[])
            .await
            .map_err(|error| SourceError::Fetch {
                source_name: SOURCE_NAME.to_string(),
                error,
            })?;
        if !response.is_success() {
            return Err(SourceError::Status {
                source_name: SOURCE_NAME.to_string(),
                status: response.status,
            });
        }
        parse_feed(&response.text()).map_err(|e| SourceError::Decode {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_feed_logged(&self, feed_url: &str) -> Result<Vec<RawItem>, SourceError> {
        let result = self.fetch_feed(feed_url).await;
        if let Err(e) = &result {
            error!(error = %e, %feed_url, "RSS feed fetch failed");
        }
        result
    }

    /// Fetch all feeds and merge their items, newest first, capped at
    /// `max_items`.
    async fn fetch_all(&self) -> Result<Vec<RawItem>, SourceError> {
        let attempted = self.config.feeds.len();
        let fetches = self
            .config
            .feeds
            .clone()
            .into_iter()
            .map(|feed_url| async move { self.fetch_feed_logged(&feed_url).await });
        let results: Vec<Result<Vec<RawItem>, SourceError>> = stream::iter(fetches)
            .buffer_unordered(PARALLEL_FEEDS)
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        if succeeded == 0 {
            return Err(SourceError::AllFeedsFailed {
                source_name: SOURCE_NAME.to_string(),
                attempted,
            });
        }

        let mut raw_items: Vec<RawItem> = results.into_iter().flatten().flatten().collect();
        raw_items.sort_by(|a, b| b.create_time.cmp(&a.create_time));
        raw_items.truncate(self.config.max_items);
        info!(feeds = attempted, succeeded, items = raw_items.len(), "Fetched RSS feeds");
        Ok(raw_items)
    }
}

#[async_trait]
impl Source for RssFeeds {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch(&self) -> Result<Report, SourceError> {
        let raw_items = self.fetch_all().await?;
        let items = self.collector.collect(with_links(raw_items)).await;
        Ok(Report::new(items))
    }
}
