//! Markup queries against fetched story pages.
//!
//! Story pages advertise their preview image through a meta tag such as
//! `<meta property="og:image" content="...">`. This module finds that tag
//! with `scraper` and resolves the value against the page URL.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Return the named attribute of the first element matching `selector`.
///
/// Returns `None` when the selector is invalid, nothing matches, or the
/// first match lacks the attribute or has it blank.
pub fn find_attribute(html: &str, selector: &str, attribute: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);
    let value = document
        .select(&selector)
        .next()?
        .value()
        .attr(attribute)?
        .trim();

    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Locate the preview image URL on a page.
///
/// Relative values are joined onto `page_url`; values that cannot be
/// resolved to an absolute URL are discarded.
pub fn preview_image_url(
    html: &str,
    page_url: &str,
    selector: &str,
    attribute: &str,
) -> Option<String> {
    let raw = find_attribute(html, selector, attribute)?;
    match Url::parse(&raw) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(_) => {
            let resolved = Url::parse(page_url).ok()?.join(&raw).ok()?;
            debug!(%raw, %resolved, "Resolved relative preview image url");
            Some(resolved.to_string())
        }
    }
}
