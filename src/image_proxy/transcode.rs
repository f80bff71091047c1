//! Resize and JPEG re-encode of proxied images.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

use super::error::ProxyError;

pub const MIN_WIDTH: u32 = 16;
pub const MAX_WIDTH: u32 = 2048;
pub const MIN_QUALITY: u8 = 30;
pub const MAX_QUALITY: u8 = 95;
pub const DEFAULT_QUALITY: u8 = 78;

pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

pub fn clamp_width(width: u32) -> u32 {
    width.clamp(MIN_WIDTH, MAX_WIDTH)
}

pub fn clamp_quality(quality: Option<u32>) -> u8 {
    quality
        .map(|q| q.clamp(MIN_QUALITY as u32, MAX_QUALITY as u32) as u8)
        .unwrap_or(DEFAULT_QUALITY)
}

/// Target size for a `max_width` bound, preserving aspect ratio and never upscaling.
pub fn fit_to_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (height as u64 * max_width as u64 / width as u64).max(1);
    (max_width, scaled as u32)
}

/// Decodes `bytes`, shrinks to `width` when wider and re-encodes as JPEG.
///
/// `width` and `quality` are expected to be clamped already.
pub fn transcode(bytes: &[u8], width: u32, quality: u8) -> Result<Vec<u8>, ProxyError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| ProxyError::Transcode(e.to_string()))?;

    let (source_width, source_height) = decoded.dimensions();
    let (target_width, target_height) = fit_to_width(source_width, source_height, width);
    let resized = if (target_width, target_height) == (source_width, source_height) {
        decoded
    } else {
        decoded.resize_exact(target_width, target_height, FilterType::Lanczos3)
    };

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality)
        .encode_image(&rgb)
        .map_err(|e| ProxyError::Transcode(e.to_string()))?;
    Ok(encoded)
}
