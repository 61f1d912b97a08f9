pub mod avif;
pub mod gif;
pub mod jpeg;
pub mod png;
pub mod tiff;
pub mod webp;

use image::DynamicImage;

use crate::EncodingConfig;
use crate::transform::{ImageFormatKind, TransformError};

/// Whether this build can produce `kind`. SVG can be read but never written.
pub fn can_encode(kind: ImageFormatKind) -> bool {
    match kind {
        ImageFormatKind::Jpeg
        | ImageFormatKind::Png
        | ImageFormatKind::WebP
        | ImageFormatKind::Gif
        | ImageFormatKind::Tiff => true,
        ImageFormatKind::Avif => avif::AVAILABLE,
        ImageFormatKind::Svg => false,
    }
}

/// Whether this build can read sources of `kind`
pub fn can_decode(kind: ImageFormatKind) -> bool {
    match kind {
        ImageFormatKind::Jpeg
        | ImageFormatKind::Png
        | ImageFormatKind::WebP
        | ImageFormatKind::Gif
        | ImageFormatKind::Tiff
        | ImageFormatKind::Svg => true,
        ImageFormatKind::Avif => avif::DECODE_AVAILABLE,
    }
}

/// Encode into `format`, applying the format's quality semantics
pub fn encode(
    image: &DynamicImage,
    format: ImageFormatKind,
    quality: Option<u8>,
    defaults: &EncodingConfig,
) -> Result<Vec<u8>, TransformError> {
    match format {
        ImageFormatKind::Jpeg => jpeg::encode(image, quality.unwrap_or(defaults.jpeg_quality)),
        ImageFormatKind::Png => png::encode(image, quality),
        ImageFormatKind::WebP => webp::encode(
            image,
            quality.map(f32::from).unwrap_or(defaults.webp_quality),
        ),
        ImageFormatKind::Gif => gif::encode(image),
        ImageFormatKind::Avif => avif::encode(
            image,
            quality.unwrap_or(defaults.avif_quality),
            defaults.avif_speed,
        ),
        ImageFormatKind::Tiff => tiff::encode(image),
        ImageFormatKind::Svg => Err(TransformError::Encode(
            "SVG output is not supported".to_string(),
        )),
    }
}
