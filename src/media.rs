//! Preview image processing: decode, content-aware crop, resize and encode.
//!
//! The crop search works on a downscaled copy of the image. Each pixel gets
//! a saliency score made of local luminance contrast (edges) and colour
//! saturation; a summed-area table then lets every candidate window be
//! scored in constant time. Candidates have the target aspect ratio and are
//! tried at a few scales. A window scores by how much of the image's
//! saliency it captures, minus a penalty for the area it spends doing so,
//! with a slight pull toward the centre to break ties.
//!
//! Everything here is CPU bound and synchronous; async callers should run
//! it on a blocking thread.

use crate::error::MediaError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Longest side of the copy the crop analysis runs on.
const ANALYSIS_MAX_SIDE: u32 = 256;
/// Window scales tried, relative to the largest window that fits.
const CROP_SCALES: [f64; 4] = [1.0, 0.9, 0.8, 0.7];
const AREA_PENALTY: f64 = 0.5;
const CENTER_BIAS: f64 = 0.01;
const SATURATION_WEIGHT: f64 = 0.5;

/// A rectangle inside an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, MediaError> {
    image::load_from_memory(bytes).map_err(|e| MediaError::Decode(e.to_string()))
}

/// Find the region with the target aspect ratio that best covers the
/// salient parts of `img`.
///
/// # Errors
///
/// [`MediaError::InvalidTarget`] for a zero target dimension and
/// [`MediaError::EmptyImage`] for an image without pixels.
pub fn best_crop(img: &DynamicImage, width: u32, height: u32) -> Result<Region, MediaError> {
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidTarget { width, height });
    }
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 {
        return Err(MediaError::EmptyImage);
    }

    let (crop_w, crop_h) = largest_window(iw, ih, width, height);

    let scale = (ANALYSIS_MAX_SIDE as f64 / iw.max(ih) as f64).min(1.0);
    let aw = ((iw as f64 * scale).round() as u32).max(1);
    let ah = ((ih as f64 * scale).round() as u32).max(1);
    let analysis = if (aw, ah) == (iw, ih) {
        img.clone()
    } else {
        img.resize_exact(aw, ah, FilterType::Triangle)
    };

    let table = SummedArea::new(&saliency_map(&analysis), aw, ah);
    let total = table.sum(0, 0, aw, ah);
    if total <= f64::EPSILON {
        return Ok(centered(iw, ih, crop_w, crop_h));
    }

    let mut best: Option<(f64, Region)> = None;
    for crop_scale in CROP_SCALES {
        let ww = ((crop_w as f64 * scale * crop_scale).round() as u32).clamp(1, aw);
        let wh = ((crop_h as f64 * scale * crop_scale).round() as u32).clamp(1, ah);
        let step = (ww.min(wh) / 8).max(1);
        let area_fraction = (ww as f64 * wh as f64) / (aw as f64 * ah as f64);

        for y in positions(ah - wh, step) {
            for x in positions(aw - ww, step) {
                let captured = table.sum(x, y, ww, wh) / total;
                let dx = (x as f64 + ww as f64 / 2.0) / aw as f64 - 0.5;
                let dy = (y as f64 + wh as f64 / 2.0) / ah as f64 - 0.5;
                let score = captured
                    - AREA_PENALTY * area_fraction
                    - CENTER_BIAS * (dx * dx + dy * dy).sqrt();
                if best.is_none_or(|(s, _)| score > s) {
                    best = Some((
                        score,
                        Region {
                            x,
                            y,
                            width: ww,
                            height: wh,
                        },
                    ));
                }
            }
        }
    }

    let Some((_, window)) = best else {
        return Ok(centered(iw, ih, crop_w, crop_h));
    };
    Ok(to_source_coords(window, scale, iw, ih))
}

pub fn crop(img: &DynamicImage, region: Region) -> DynamicImage {
    img.crop_imm(region.x, region.y, region.width, region.height)
}

pub fn resize(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FilterType::Lanczos3)
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, MediaError> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(|e| MediaError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Wrap JPEG bytes in a self-describing `data:` URI.
pub fn data_uri(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

/// Decode, crop to the best `width`x`height` region, and return the result
/// as a JPEG `data:` URI.
pub fn render_preview(
    bytes: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<String, MediaError> {
    let img = decode(bytes)?;
    let region = best_crop(&img, width, height)?;
    let mut cropped = crop(&img, region);
    if cropped.width() != width || cropped.height() != height {
        cropped = resize(&cropped, width, height);
    }
    Ok(data_uri(&encode_jpeg(&cropped, quality)?))
}

/// Largest `target_w:target_h` window that fits in `iw`x`ih`.
fn largest_window(iw: u32, ih: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let ratio = target_w as f64 / target_h as f64;
    if iw as f64 / ih as f64 > ratio {
        (((ih as f64 * ratio).round() as u32).clamp(1, iw), ih)
    } else {
        (iw, ((iw as f64 / ratio).round() as u32).clamp(1, ih))
    }
}

fn centered(iw: u32, ih: u32, w: u32, h: u32) -> Region {
    Region {
        x: (iw - w) / 2,
        y: (ih - h) / 2,
        width: w,
        height: h,
    }
}

/// Offsets `0, step, 2*step, ...` up to and always including `max`.
fn positions(max: u32, step: u32) -> impl Iterator<Item = u32> {
    let regular = (0..=max).step_by(step as usize);
    let last = (max % step != 0).then_some(max);
    regular.chain(last)
}

fn to_source_coords(window: Region, scale: f64, iw: u32, ih: u32) -> Region {
    let width = ((window.width as f64 / scale).round() as u32).clamp(1, iw);
    let height = ((window.height as f64 / scale).round() as u32).clamp(1, ih);
    let x = ((window.x as f64 / scale).round() as u32).min(iw - width);
    let y = ((window.y as f64 / scale).round() as u32).min(ih - height);
    Region {
        x,
        y,
        width,
        height,
    }
}

/// Per-pixel saliency in row-major order.
fn saliency_map(img: &DynamicImage) -> Vec<f64> {
    let (w, h) = img.dimensions();
    let rgb = img.to_rgb8();
    let luma: Vec<f64> = rgb
        .pixels()
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .collect();
    let at = |x: i64, y: i64| -> f64 {
        let cx = x.clamp(0, w as i64 - 1) as usize;
        let cy = y.clamp(0, h as i64 - 1) as usize;
        luma[cy * w as usize + cx]
    };

    let mut out = Vec::with_capacity(luma.len());
    for (i, p) in rgb.pixels().enumerate() {
        let x = (i % w as usize) as i64;
        let y = (i / w as usize) as i64;
        let edge = (4.0 * at(x, y) - at(x - 1, y) - at(x + 1, y) - at(x, y - 1) - at(x, y + 1))
            .abs();
        let max = p.0.iter().copied().max().unwrap_or(0) as f64;
        let min = p.0.iter().copied().min().unwrap_or(0) as f64;
        let saturation = if max > 0.0 { (max - min) / max } else { 0.0 };
        out.push(edge + SATURATION_WEIGHT * saturation * 255.0);
    }
    out
}

struct SummedArea {
    stride: usize,
    table: Vec<f64>,
}

impl SummedArea {
    fn new(values: &[f64], w: u32, h: u32) -> Self {
        let stride = w as usize + 1;
        let mut table = vec![0.0; stride * (h as usize + 1)];
        for y in 0..h as usize {
            let mut row = 0.0;
            for x in 0..w as usize {
                row += values[y * w as usize + x];
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
            }
        }
        Self { stride, table }
    }

    fn sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        self.table[y1 * self.stride + x1] - self.table[y0 * self.stride + x1]
            - self.table[y1 * self.stride + x0]
            + self.table[y0 * self.stride + x0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Flat grey canvas with a high-contrast checkerboard patch.
    fn canvas_with_patch(w: u32, h: u32, patch_x: std::ops::Range<u32>) -> DynamicImage {
        let img = RgbImage::from_fn(w, h, |x, y| {
            if patch_x.contains(&x) && (h / 5..h - h / 5).contains(&y) {
                if (x / 4 + y / 4) % 2 == 0 {
                    Rgb([255, 0, 0])
                } else {
                    Rgb([0, 0, 255])
                }
            } else {
                Rgb([128, 128, 128])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_best_crop_follows_detail() {
        let img = canvas_with_patch(400, 100, 300..380);
        let region = best_crop(&img, 100, 100).unwrap();
        let center_x = region.x + region.width / 2;
        assert!(center_x > 250, "crop centred at {center_x}, expected near the patch");
        assert!(region.x + region.width <= 400);
        assert!(region.y + region.height <= 100);
    }

    #[test]
    fn test_best_crop_flat_image_is_centered() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 100, Rgb([10, 10, 10])));
        let region = best_crop(&img, 100, 100).unwrap();
        assert_eq!(
            region,
            Region {
                x: 100,
                y: 0,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn test_best_crop_keeps_target_aspect() {
        let img = canvas_with_patch(640, 480, 100..300);
        let region = best_crop(&img, 600, 300).unwrap();
        let ratio = region.width as f64 / region.height as f64;
        assert!((ratio - 2.0).abs() < 0.05, "aspect ratio was {ratio}");
    }

    #[test]
    fn test_best_crop_rejects_bad_input() {
        let img = DynamicImage::new_rgb8(10, 10);
        assert!(matches!(
            best_crop(&img, 0, 10),
            Err(MediaError::InvalidTarget { .. })
        ));
        let empty = DynamicImage::new_rgb8(0, 0);
        assert!(matches!(best_crop(&empty, 10, 10), Err(MediaError::EmptyImage)));
    }

    #[test]
    fn test_render_preview_produces_exact_size_jpeg() {
        let bytes = png_bytes(&canvas_with_patch(200, 150, 20..120));
        let uri = render_preview(&bytes, 60, 30, 80).unwrap();

        let payload = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let jpeg = STANDARD.decode(payload).unwrap();
        let decoded = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (60, 30));
    }

    #[test]
    fn test_render_preview_upscales_small_images() {
        let bytes = png_bytes(&canvas_with_patch(40, 40, 5..30));
        let uri = render_preview(&bytes, 60, 30, 80).unwrap();
        let payload = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
        let decoded = image::load_from_memory(&STANDARD.decode(payload).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (60, 30));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"<html>not an image</html>"),
            Err(MediaError::Decode(_))
        ));
    }

    #[test]
    fn test_positions_include_last_offset() {
        assert_eq!(positions(10, 4).collect::<Vec<_>>(), vec![0, 4, 8, 10]);
        assert_eq!(positions(8, 4).collect::<Vec<_>>(), vec![0, 4, 8]);
        assert_eq!(positions(0, 3).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_summed_area_sum() {
        let values: Vec<f64> = (1..=6).map(f64::from).collect();
        let table = SummedArea::new(&values, 3, 2);
        assert_eq!(table.sum(0, 0, 3, 2), 21.0);
        assert_eq!(table.sum(1, 1, 2, 1), 11.0);
    }
}
