use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use tracing::debug;

use crate::transform::TransformError;

/// Encode as baseline JPEG; quality is clamped to the encoder's 1-100 range
pub fn encode(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    // JPEG doesn't support alpha channel, so convert to RGB
    let rgb_image = image.to_rgb8();
    let quality = quality.clamp(1, 100);

    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, quality);
    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    debug!("JPEG encoded: {} bytes at quality {}", output.len(), quality);
    Ok(output)
}
