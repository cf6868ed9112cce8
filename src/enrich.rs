//! Per-item enrichment: resolve the linked story and attach its preview image.
//!
//! Enrichment never fails. Every step after resolving the story link can go
//! wrong independently (page fetch, missing meta tag, image fetch, decode,
//! crop, encode); each failure is logged and leaves the media fields empty
//! while the rest of the item is still returned.

use crate::config::MediaConfig;
use crate::error::MediaError;
use crate::fetch::Fetcher;
use crate::media;
use crate::models::{Item, RawItem};
use crate::page;
use crate::utils::strip_link_token;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Turns a raw item into a finished [`Item`].
#[async_trait]
pub trait Enrich: Send + Sync {
    async fn enrich(&self, raw: RawItem) -> Item;
}

/// Enriches items with a cropped, inline JPEG of their story's preview image.
pub struct ImageEnricher {
    fetcher: Arc<dyn Fetcher>,
    media: MediaConfig,
}

impl ImageEnricher {
    pub fn new(fetcher: Arc<dyn Fetcher>, media: MediaConfig) -> Self {
        Self { fetcher, media }
    }

    /// Fetch a story page and pull the preview image URL out of it.
    ///
    /// Returns `None` both when the page has no preview tag and when the
    /// page could not be fetched; the latter is logged.
    #[instrument(level = "debug", skip(self))]
    async fn preview_image_url(&self, story_url: &str) -> Option<String> {
        let response = match self.fetcher.fetch(story_url, &[]).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Could not fetch story page");
                return None;
            }
        };
        if !response.is_success() {
            warn!(status = response.status, "Story page returned an error status");
            return None;
        }

        let found = page::preview_image_url(
            &response.text(),
            story_url,
            &self.media.selector,
            &self.media.attribute,
        );
        debug!(found = ?found, "Looked up preview image");
        found
    }

    /// Fetch the image and render it as an inline data URI.
    async fn media_data(&self, media_url: &str) -> Result<String, MediaError> {
        let response = self.fetcher.fetch(media_url, &[]).await?;
        if response.status != 200 {
            return Err(MediaError::Status(response.status));
        }

        let (width, height, quality) = (self.media.width, self.media.height, self.media.jpeg_quality);
        tokio::task::spawn_blocking(move || {
            media::render_preview(&response.body, width, height, quality)
        })
        .await
        .map_err(|e| MediaError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl Enrich for ImageEnricher {
    #[instrument(level = "info", skip_all, fields(id = %raw.id))]
    async fn enrich(&self, raw: RawItem) -> Item {
        let RawItem {
            id,
            create_time,
            text,
            link,
        } = raw;

        let mut item = Item {
            id,
            create_time,
            text: text.trim().to_string(),
            ..Default::default()
        };

        let Some(link) = link else {
            return item;
        };
        if let Some(token) = link.display_token.as_deref() {
            item.text = strip_link_token(&text, token);
        }
        item.story_url = link.url;

        let Some(media_url) = self.preview_image_url(&item.story_url).await else {
            return item;
        };
        match self.media_data(&media_url).await {
            Ok(data) => item.media_data = data,
            Err(e) => {
                error!(
                    error = %e,
                    id = %item.id,
                    media_url = %media_url,
                    "problem getting the encoded media data image"
                );
            }
        }
        item.media_url = media_url;
        item
    }
}
