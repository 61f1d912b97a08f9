use image::{DynamicImage, Frame, codecs::gif::GifEncoder};

use crate::transform::TransformError;

/// Encode a single-frame GIF. GIF has no quality setting.
pub fn encode(image: &DynamicImage) -> Result<Vec<u8>, TransformError> {
    let mut output = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut output);
        encoder.encode_frame(Frame::new(image.to_rgba8()))?;
    }
    Ok(output)
}
