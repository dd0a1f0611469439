//! Input decoding into the canonical RGB raster

use crate::error::DetectError;
use base64::Engine;
use image::DynamicImage;

/// Decode an encoded image blob (PNG, JPEG, BMP, ...)
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DetectError> {
    if bytes.is_empty() {
        return Err(DetectError::Decode("empty image payload".to_string()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| DetectError::Decode(format!("unreadable image: {}", e)))?;
    Ok(DynamicImage::ImageRgb8(image.into_rgb8()))
}

/// Decode a `<prefix>,<base64-payload>` data URL. Only the text after the
/// first comma is decoded.
pub fn decode_data_url(data_url: &str) -> Result<DynamicImage, DetectError> {
    let (_, payload) = data_url
        .split_once(',')
        .ok_or_else(|| DetectError::Decode("data URL has no payload segment".to_string()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| DetectError::Decode(format!("invalid base64 payload: {}", e)))?;

    decode_image(&bytes)
}
