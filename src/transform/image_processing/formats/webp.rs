use image::DynamicImage;
use tracing::debug;

use crate::transform::TransformError;

/// Encode as lossy WebP through libwebp
pub fn encode(image: &DynamicImage, quality: f32) -> Result<Vec<u8>, TransformError> {
    let (width, height) = (image.width(), image.height());
    let quality = quality.clamp(0.0, 100.0);

    let result = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(&rgba, width, height).encode_simple(false, quality)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(&rgb, width, height).encode_simple(false, quality)
    };
    let encoded =
        result.map_err(|e| TransformError::Encode(format!("WebP encoding failed: {:?}", e)))?;

    debug!("WebP encoded: {} bytes at quality {}", encoded.len(), quality);
    Ok(encoded.to_vec())
}
