//! Twitter v2 user timeline source.
//!
//! Reads the most recent tweets of one account (by default @cnnbrk, user id
//! 428333) from `GET /2/users/{id}/tweets` with `created_at` and `entities`
//! expanded. A tweet's first URL entity becomes the item's link: the
//! expanded URL is the story, and the shortened `t.co` URL is the token
//! stripped from the tweet text.

use crate::collector::Collector;
use crate::config::TwitterConfig;
use crate::error::SourceError;
use crate::fetch::Fetcher;
use crate::models::{Link, RawItem, Report};
use crate::sources::{Source, with_links};
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

const SOURCE_NAME: &str = "twitter";

/// Response envelope of a timeline request.
#[derive(Debug, Deserialize)]
struct TimelineResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    result_count: u32,
    newest_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entities: Entities,
}

#[derive(Debug, Default, Deserialize)]
struct Entities {
    #[serde(default)]
    urls: Vec<UrlEntity>,
}

#[derive(Debug, Deserialize)]
struct UrlEntity {
    /// The shortened link as it appears in the tweet text.
    url: String,
    expanded_url: Option<String>,
}

impl From<Tweet> for RawItem {
    fn from(tweet: Tweet) -> Self {
        let link = tweet.entities.urls.into_iter().next().map(|entity| {
            let target = entity
                .expanded_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| entity.url.clone());
            Link::new(target).with_display_token(entity.url)
        });
        RawItem {
            id: tweet.id,
            create_time: tweet.created_at.map(|t| t.timestamp()).unwrap_or_default(),
            text: tweet.text,
            link,
        }
    }
}

/// Breaking news from one account's Twitter timeline.
pub struct TwitterTimeline {
    config: TwitterConfig,
    fetcher: Arc<dyn Fetcher>,
    collector: Arc<Collector>,
}

impl TwitterTimeline {
    pub fn new(config: TwitterConfig, fetcher: Arc<dyn Fetcher>, collector: Arc<Collector>) -> Self {
        Self {
            config,
            fetcher,
            collector,
        }
    }

    fn timeline_url(&self) -> Result<Url, SourceError> {
        let base = format!(
            "{}/users/{}/tweets",
            self.config.endpoint.trim_end_matches('/'),
            self.config.user_id
        );
        let mut url = Url::parse(&base).map_err(|e| SourceError::Decode {
            source_name: SOURCE_NAME.to_string(),
            message: format!("invalid timeline url {base}: {e}"),
        })?;
        // The API accepts 5..=100 results per page.
        let max_results = self.config.max_results.clamp(5, 100);
        url.query_pairs_mut()
            .append_pair("tweet.fields", "created_at,entities")
            .append_pair("max_results", &max_results.to_string());
        Ok(url)
    }

    /// Fetch the raw timeline page.
    #[instrument(level = "info", skip_all, fields(user_id = %self.config.user_id))]
    async fn fetch_timeline(&self) -> Result<Vec<RawItem>, SourceError> {
        let token = self
            .config
            .bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SourceError::MissingCredential("TWITTER_V2_BEARER_TOKEN"))?;

        let url = self.timeline_url()?;
        let authorization = format!("Bearer {token}");
        let headers = [
            ("Content-Type", "application/json; charset=UTF-8"),
            ("Authorization", authorization.as_str()),
        ];

        let response = self
            .fetcher
            .fetch(url.as_str(), &headers)
            .await
            .map_err(|error| SourceError::Fetch {
                source_name: SOURCE_NAME.to_string(),
                error,
            })?;
        if !response.is_success() {
            warn!(
                status = response.status,
                body = %truncate_for_log(&response.text(), 300),
                "Twitter API returned an error status"
            );
            return Err(SourceError::Status {
                source_name: SOURCE_NAME.to_string(),
                status: response.status,
            });
        }

        let timeline: TimelineResponse =
            serde_json::from_slice(&response.body).map_err(|e| SourceError::Decode {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })?;
        debug!(
            result_count = timeline.meta.result_count,
            newest_id = ?timeline.meta.newest_id,
            "Decoded timeline"
        );

        Ok(timeline.data.into_iter().map(RawItem::from).collect())
    }
}

#[async_trait]
impl Source for TwitterTimeline {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch(&self) -> Result<Report, SourceError> {
        let raw_items = self.fetch_timeline().await?;
        let fetched = raw_items.len();
        let linked = with_links(raw_items);
        info!(fetched, with_links = linked.len(), "Fetched tweets");

        let items = self.collector.collect(linked).await;
        Ok(Report::new(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::ImageEnricher;
    use crate::config::MediaConfig;
    use crate::testing::{StaticFetcher, og_page, png_bytes};
    use std::time::Duration;

    const TIMELINE: &str = "https://api.example.com/2/users/428333/tweets?tweet.fields=created_at%2Centities&max_results=10";

    fn config(token: Option<&str>) -> TwitterConfig {
        TwitterConfig {
            bearer_token: token.map(str::to_string),
            endpoint: "https://api.example.com/2/".to_string(),
            ..TwitterConfig::default()
        }
    }

    fn timeline_body() -> String {
        serde_json::json!({
            "data": [
                {
                    "id": "1",
                    "text": "Older story https://t.co/one",
                    "created_at": "2024-03-01T10:00:00.000Z",
                    "entities": { "urls": [ {
                        "start": 12, "end": 32,
                        "url": "https://t.co/one",
                        "expanded_url": "https://news.example.com/one",
                        "display_url": "news.example.com/one"
                    } ] }
                },
                {
                    "id": "2",
                    "text": "No link at all",
                    "created_at": "2024-03-01T11:00:00.000Z"
                },
                {
                    "id": "3",
                    "text": "Newer story https://t.co/three",
                    "created_at": "2024-03-01T12:00:00.000Z",
                    "entities": { "urls": [ {
                        "url": "https://t.co/three",
                        "expanded_url": "https://news.example.com/three"
                    } ] }
                }
            ],
            "meta": { "result_count": 3, "newest_id": "3", "oldest_id": "1" }
        })
        .to_string()
    }

    fn source(fetcher: Arc<StaticFetcher>, token: Option<&str>) -> TwitterTimeline {
        let media = MediaConfig {
            width: 60,
            height: 30,
            ..MediaConfig::default()
        };
        let enricher = Arc::new(ImageEnricher::new(fetcher.clone(), media));
        let collector = Arc::new(Collector::new(enricher, Duration::from_secs(25)));
        TwitterTimeline::new(config(token), fetcher, collector)
    }

    #[test]
    fn test_timeline_url_encodes_fields() {
        let src = source(Arc::new(StaticFetcher::new()), Some("t"));
        assert_eq!(src.timeline_url().unwrap().as_str(), TIMELINE);
    }

    #[test]
    fn test_tweet_to_raw_item_uses_first_url() {
        let tweet: Tweet = serde_json::from_value(serde_json::json!({
            "id": "9",
            "text": "Two links https://t.co/a https://t.co/b",
            "created_at": "2024-01-01T00:00:10Z",
            "entities": { "urls": [
                { "url": "https://t.co/a", "expanded_url": "https://a.example.com" },
                { "url": "https://t.co/b", "expanded_url": "https://b.example.com" }
            ] }
        }))
        .unwrap();

        let raw = RawItem::from(tweet);

        assert_eq!(raw.create_time, 1_704_067_210);
        let link = raw.link.unwrap();
        assert_eq!(link.url, "https://a.example.com");
        assert_eq!(link.display_token.as_deref(), Some("https://t.co/a"));
    }

    #[tokio::test]
    async fn test_fetch_builds_sorted_report_from_linked_tweets() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .route(TIMELINE, 200, timeline_body())
                .route("https://news.example.com/one", 200, og_page("https://cdn.example.com/one.png"))
                .route("https://cdn.example.com/one.png", 200, png_bytes(80, 80))
                .route("https://news.example.com/three", 500, "oops"),
        );
        let src = source(fetcher.clone(), Some("secret"));

        let report = src.fetch().await.unwrap();

        let ids: Vec<&str> = report.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(report.items[0].text, "Newer story");
        assert!(report.items[0].media_url.is_empty());
        assert_eq!(report.items[1].story_url, "https://news.example.com/one");
        assert!(report.items[1].has_media());

        let requests = fetcher.requests.lock().unwrap();
        let (_, headers) = requests.iter().find(|(url, _)| url == TIMELINE).unwrap();
        assert!(headers.contains(&("Authorization".to_string(), "Bearer secret".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_without_token_fails_before_network() {
        let fetcher = Arc::new(StaticFetcher::new());
        let src = source(fetcher.clone(), Some("   "));

        let err = src.fetch().await.unwrap_err();

        assert!(matches!(err, SourceError::MissingCredential(_)));
        assert!(fetcher.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_source_fatal() {
        let fetcher = Arc::new(StaticFetcher::new().route(TIMELINE, 401, r#"{"title":"Unauthorized"}"#));
        let err = source(fetcher, Some("bad")).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_fetch_undecodable_body_is_source_fatal() {
        let fetcher = Arc::new(StaticFetcher::new().route(TIMELINE, 200, "<html>"));
        let err = source(fetcher, Some("t")).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_empty_timeline() {
        let fetcher = Arc::new(StaticFetcher::new().route(TIMELINE, 200, r#"{"meta":{"result_count":0}}"#));
        let report = source(fetcher, Some("t")).fetch().await.unwrap();
        assert!(report.items.is_empty());
    }
}
