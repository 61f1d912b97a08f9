use image::{
    DynamicImage,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};
use tracing::debug;

use crate::transform::TransformError;

pub const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Map a 0-100 quality onto a zlib level: higher quality, lighter compression
pub fn compression_level(quality: u8) -> u8 {
    let level = (9.0 - 0.09 * f64::from(quality)).round();
    level.clamp(0.0, f64::from(MAX_COMPRESSION_LEVEL)) as u8
}

/// The encoder exposes presets rather than raw levels
fn compression_type(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encode as PNG, preserving the source color layout
pub fn encode(image: &DynamicImage, quality: Option<u8>) -> Result<Vec<u8>, TransformError> {
    let compression = match quality {
        Some(q) => {
            let level = compression_level(q);
            debug!("PNG quality {} maps to compression level {}", q, level);
            compression_type(level)
        }
        None => CompressionType::Default,
    };

    // The PNG encoder has no float sample support
    let converted;
    let image = match image {
        DynamicImage::ImageRgb32F(_) => {
            converted = DynamicImage::ImageRgb16(image.to_rgb16());
            &converted
        }
        DynamicImage::ImageRgba32F(_) => {
            converted = DynamicImage::ImageRgba16(image.to_rgba16());
            &converted
        }
        other => other,
    };

    let mut output = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut output, compression, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;

    Ok(output)
}
