use image::{DynamicImage, codecs::tiff::TiffEncoder};
use std::io::Cursor;

use crate::transform::TransformError;

/// Encode as uncompressed TIFF; the encoder is lossless so there is no quality knob
pub fn encode(image: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let image = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let mut output = Cursor::new(Vec::new());
    image.write_with_encoder(TiffEncoder::new(&mut output))?;
    Ok(output.into_inner())
}
