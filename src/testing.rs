//! In-memory doubles shared by unit tests.

use crate::error::FetchError;
use crate::fetch::{FetchResponse, Fetcher};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

/// Serves canned responses by URL. Unknown URLs fail like a refused
/// connection. Every request is recorded with its headers.
#[derive(Default)]
pub struct StaticFetcher {
    routes: HashMap<String, FetchResponse>,
    pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            url.to_string(),
            FetchResponse {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn requested(&self, url: &str) -> bool {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .any(|(requested, _)| requested == url)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<FetchResponse, FetchError> {
        self.requests.lock().unwrap().push((
            url.to_string(),
            headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Request {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

pub fn og_page(image_url: &str) -> String {
    format!(
        r#"<html><head><meta property="og:image" content="{image_url}"></head><body>story</body></html>"#
    )
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 90])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
