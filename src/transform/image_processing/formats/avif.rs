use image::DynamicImage;

use crate::transform::TransformError;

/// AVIF output is only compiled in with the `avif` feature
pub const AVAILABLE: bool = cfg!(feature = "avif");

/// AVIF input goes through dav1d and is only compiled in with `avif-decode`
pub const DECODE_AVAILABLE: bool = cfg!(feature = "avif-decode");

#[cfg(feature = "avif")]
pub fn encode(image: &DynamicImage, quality: u8, speed: u8) -> Result<Vec<u8>, TransformError> {
    use image::{ExtendedColorType, ImageEncoder, codecs::avif::AvifEncoder};
    use tracing::debug;

    let (width, height) = (image.width(), image.height());
    let quality = quality.clamp(1, 100);
    let speed = speed.clamp(1, 10);

    debug!(
        "Encoding AVIF: {}x{}, quality={}, speed={}",
        width, height, quality, speed
    );

    let mut output = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut output, speed, quality);
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        encoder.write_image(&rgba, width, height, ExtendedColorType::Rgba8)?;
    } else {
        let rgb = image.to_rgb8();
        encoder.write_image(&rgb, width, height, ExtendedColorType::Rgb8)?;
    }

    Ok(output)
}

#[cfg(not(feature = "avif"))]
pub fn encode(_image: &DynamicImage, _quality: u8, _speed: u8) -> Result<Vec<u8>, TransformError> {
    Err(TransformError::Encode(
        "AVIF support is not compiled into this build".to_string(),
    ))
}
