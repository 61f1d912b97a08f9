// Image processing module - handles decoding, resizing and re-encoding of fetched sources
mod decode;
pub mod formats;
mod resize;

pub use decode::{check_source_dimensions, decode_image, looks_like_avif, looks_like_svg};
pub use resize::{Fit, ResizeSpec, resize_image};

use tracing::debug;

use super::{ImageFormatKind, TransformError};
use crate::{EncodingConfig, LimitsConfig};

/// Per-request options for the decode/resize/encode step
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    pub format: ImageFormatKind,
    pub resize: ResizeSpec,
    pub quality: Option<u8>,
    pub lenient: bool,
}

/// Decode `data`, apply the optional resize, and encode into the resolved format.
///
/// CPU bound; callers on the async runtime should run this on the blocking pool.
pub fn transform_image(
    data: &[u8],
    content_type: Option<&str>,
    options: &TransformOptions,
    encoding: &EncodingConfig,
    limits: &LimitsConfig,
) -> Result<Vec<u8>, TransformError> {
    let image = decode_image(data, content_type, options.lenient, limits)?;
    debug!(
        "Decoded source: {}x{} {:?}",
        image.width(),
        image.height(),
        image.color()
    );

    let image = if options.resize.is_noop() {
        image
    } else {
        resize_image(image, &options.resize, limits)?
    };

    // GIF never honors a quality setting
    let quality = match options.format {
        ImageFormatKind::Gif => None,
        _ => options.quality,
    };

    formats::encode(&image, options.format, quality, encoding)
}
