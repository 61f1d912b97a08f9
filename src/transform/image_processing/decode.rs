use image::{ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageReader, Limits};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use tracing::{debug, warn};

use super::formats;
use crate::LimitsConfig;
use crate::transform::{ImageFormatKind, TransformError};

/// Whether the payload is SVG markup rather than a raster image
pub fn looks_like_svg(data: &[u8], content_type: Option<&str>) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("svg")) {
        return true;
    }

    let head = &data[..data.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}

/// Whether the payload is an AVIF (ISO-BMFF `ftyp` box with an AVIF brand)
pub fn looks_like_avif(data: &[u8]) -> bool {
    data.len() >= 12 && &data[4..8] == b"ftyp" && matches!(&data[8..12], b"avif" | b"avis")
}

/// Reject sources whose declared size would blow the pixel budget
pub fn check_source_dimensions(
    width: u32,
    height: u32,
    limits: &LimitsConfig,
) -> Result<(), TransformError> {
    let pixels = u64::from(width) * u64::from(height);
    if width > limits.max_source_width
        || height > limits.max_source_height
        || pixels > limits.max_source_pixels
    {
        return Err(TransformError::source_too_large(
            width,
            height,
            limits.max_source_pixels,
        ));
    }
    Ok(())
}

fn decoder_limits(limits: &LimitsConfig) -> Limits {
    let mut decoder_limits = Limits::default();
    decoder_limits.max_image_width = Some(limits.max_source_width);
    decoder_limits.max_image_height = Some(limits.max_source_height);
    decoder_limits.max_alloc = Some(limits.max_alloc_bytes);
    decoder_limits
}

/// Decode source bytes into pixels.
///
/// Dimensions are checked against `limits` from the header alone, before any
/// pixel buffer exists. With `lenient` set, a decoder that gets past the header
/// but fails while reading pixels yields whatever was decoded so far instead of
/// an error.
pub fn decode_image(
    data: &[u8],
    content_type: Option<&str>,
    lenient: bool,
    limits: &LimitsConfig,
) -> Result<DynamicImage, TransformError> {
    if looks_like_svg(data, content_type) {
        return rasterize_svg(data, limits);
    }
    if looks_like_avif(data) && !formats::can_decode(ImageFormatKind::Avif) {
        return Err(TransformError::Decode(
            "AVIF input is not supported by this build".to_string(),
        ));
    }

    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(e.to_string()))?;
    debug!("Decoding source image, detected format: {:?}", reader.format());

    // Dimensions are checked below so oversized headers report their size
    let mut header_limits = Limits::default();
    header_limits.max_alloc = Some(limits.max_alloc_bytes);
    reader.limits(header_limits);

    let mut decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    check_source_dimensions(width, height, limits)?;

    let mut budget = decoder_limits(limits);
    decoder.set_limits(budget.clone())?;
    budget.reserve(decoder.total_bytes())?;

    if !lenient {
        return Ok(DynamicImage::from_decoder(decoder)?);
    }

    let color_type = decoder.color_type();
    let total_bytes = usize::try_from(decoder.total_bytes())
        .map_err(|_| TransformError::Decode("image too large".to_string()))?;
    let mut buffer = vec![0u8; total_bytes];

    if let Err(e) = decoder.read_image(&mut buffer) {
        warn!(
            "Ignoring decode error for {}x{} {:?} image: {}",
            width, height, color_type, e
        );
    }

    image_from_raw(width, height, color_type, buffer).ok_or_else(|| {
        TransformError::Decode(format!("unsupported pixel layout: {:?}", color_type))
    })
}

/// Build a `DynamicImage` from a native-endian sample buffer
fn image_from_raw(
    width: u32,
    height: u32,
    color_type: ColorType,
    buffer: Vec<u8>,
) -> Option<DynamicImage> {
    fn to_u16(buffer: &[u8]) -> Vec<u16> {
        buffer
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect()
    }

    fn to_f32(buffer: &[u8]) -> Vec<f32> {
        buffer
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    match color_type {
        ColorType::L8 => ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8),
        ColorType::La8 => {
            ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageLumaA8)
        }
        ColorType::Rgb8 => ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8),
        ColorType::Rgba8 => {
            ImageBuffer::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8)
        }
        ColorType::L16 => {
            ImageBuffer::from_raw(width, height, to_u16(&buffer)).map(DynamicImage::ImageLuma16)
        }
        ColorType::La16 => {
            ImageBuffer::from_raw(width, height, to_u16(&buffer)).map(DynamicImage::ImageLumaA16)
        }
        ColorType::Rgb16 => {
            ImageBuffer::from_raw(width, height, to_u16(&buffer)).map(DynamicImage::ImageRgb16)
        }
        ColorType::Rgba16 => {
            ImageBuffer::from_raw(width, height, to_u16(&buffer)).map(DynamicImage::ImageRgba16)
        }
        ColorType::Rgb32F => {
            ImageBuffer::from_raw(width, height, to_f32(&buffer)).map(DynamicImage::ImageRgb32F)
        }
        ColorType::Rgba32F => {
            ImageBuffer::from_raw(width, height, to_f32(&buffer)).map(DynamicImage::ImageRgba32F)
        }
        _ => None,
    }
}

/// Rasterize SVG markup at its intrinsic size
fn rasterize_svg(data: &[u8], limits: &LimitsConfig) -> Result<DynamicImage, TransformError> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|e| TransformError::Decode(format!("Failed to parse SVG: {}", e)))?;

    let size = tree.size().to_int_size();
    check_source_dimensions(size.width(), size.height(), limits)?;
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| TransformError::Decode("Failed to create pixmap".to_string()))?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha
    let pixels: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    ImageBuffer::from_raw(size.width(), size.height(), pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| TransformError::Decode("Failed to create image buffer".to_string()))
}
