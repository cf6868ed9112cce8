//! Data models for raw source items and the reports built from them.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`RawItem`]: An item as a source adapter fetched it, before enrichment
//! - [`Item`]: One enriched item with an optional inline preview image
//! - [`Report`]: The ordered collection of items returned to a caller
//!
//! The serialized field names are lowercase run-together words
//! (`createtime`, `mediaurl`, ...) to match the JSON consumed by existing
//! clients, hence the explicit `#[serde(rename)]` attributes.

use serde::{Deserialize, Serialize};

/// An outbound link carried by a raw item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The resolved destination the item points at.
    pub url: String,
    /// The literal text the link appears as inside the item's text
    /// (a shortened URL, for example). Stripped from the displayed text.
    pub display_token: Option<String>,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_token: None,
        }
    }

    pub fn with_display_token(mut self, token: impl Into<String>) -> Self {
        self.display_token = Some(token.into());
        self
    }
}

/// A news item as fetched from a source, before enrichment.
///
/// Source adapters translate their own wire formats into this shape so the
/// collector and the enrichment task never depend on a specific API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    /// Source-scoped identifier.
    pub id: String,
    /// Creation time in seconds since the unix epoch.
    pub create_time: i64,
    /// Display text, possibly containing the link's display token.
    pub text: String,
    /// The outbound link, if the item carries one.
    pub link: Option<Link>,
}

impl RawItem {
    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }
}

/// One enriched news item.
///
/// `media_data` is only ever populated together with `media_url`. A set
/// `media_url` with empty `media_data` means the image could not be
/// fetched or rendered in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Item {
    /// Source-scoped identifier. Not unique across sources.
    pub id: String,
    /// Creation time in seconds since the unix epoch; the sole sort key.
    #[serde(rename = "createtime")]
    pub create_time: i64,
    /// Display text with the link token stripped.
    pub text: String,
    /// Resolved preview image URL, empty when the page had none.
    #[serde(rename = "mediaurl")]
    pub media_url: String,
    /// Inline `data:` URI of the cropped preview image.
    #[serde(rename = "mediadata")]
    pub media_data: String,
    /// The page this item links to.
    #[serde(rename = "storyurl")]
    pub story_url: String,
}

impl Item {
    pub fn has_media(&self) -> bool {
        !self.media_data.is_empty()
    }
}

/// The aggregated, ordered result returned to a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Report {
    /// Items, most recent first.
    pub items: Vec<Item>,
    /// Build/version tag stamped on after aggregation.
    pub version: String,
}

impl Report {
    /// Build a report from items in any order. The items are sorted most
    /// recent first.
    pub fn new(mut items: Vec<Item>) -> Self {
        sort_items(&mut items);
        Self {
            items,
            version: String::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Sort items by `create_time`, most recent first.
///
/// The sort is stable: items with equal timestamps keep the order in which
/// they arrived.
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(|a, b| b.create_time.cmp(&a.create_time));
}
