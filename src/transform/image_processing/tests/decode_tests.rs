use crate::LimitsConfig;
use crate::transform::image_processing::formats;
use crate::transform::image_processing::{decode_image, looks_like_avif, looks_like_svg};
use crate::transform::{ImageFormatKind, TransformError};
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;

const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20">
<rect width="40" height="20" fill="#ff0000"/>
</svg>"##;

fn encoded(format: ImageFormat) -> Vec<u8> {
    let img = ImageBuffer::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 200]));
    let mut data = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut data), format)
        .unwrap();
    data
}

fn decode(data: &[u8], content_type: Option<&str>, lenient: bool) -> Result<DynamicImage, TransformError> {
    decode_image(data, content_type, lenient, &LimitsConfig::default())
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for byte in bytes {
        crc ^= u32::from(*byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xedb8_8320 & mask);
        }
    }
    !crc
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

/// A valid PNG header declaring a `width` x `height` 16-bit RGBA canvas with a
/// few bytes of pixel data behind it
fn png_header_only(width: u32, height: u32) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[16, 6, 0, 0, 0]);
    png_chunk(&mut data, b"IHDR", &ihdr);
    png_chunk(&mut data, b"IDAT", &[0x78, 0x9c, 0x63, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01]);
    data
}

#[test]
fn test_decodes_by_content_not_extension() {
    let img = decode(&encoded(ImageFormat::Png), Some("image/jpeg"), false).unwrap();
    assert_eq!(img.dimensions(), (64, 48));

    let img = decode(&encoded(ImageFormat::Jpeg), None, false).unwrap();
    assert_eq!(img.dimensions(), (64, 48));
}

#[test]
fn test_garbage_is_a_decode_error() {
    let result = decode(b"definitely not pixels", Some("image/png"), false);
    assert!(matches!(result, Err(TransformError::Decode(_))));

    // Lenient mode still needs a readable header
    let result = decode(b"definitely not pixels", Some("image/png"), true);
    assert!(matches!(result, Err(TransformError::Decode(_))));
}

#[test]
fn test_truncated_png_strict_vs_lenient() {
    let data = encoded(ImageFormat::Png);
    let truncated = &data[..data.len() * 2 / 3];

    assert!(decode(truncated, None, false).is_err());

    let img = decode(truncated, None, true).unwrap();
    assert_eq!(img.dimensions(), (64, 48));
}

#[test]
fn test_truncated_jpeg_lenient() {
    let data = encoded(ImageFormat::Jpeg);
    let truncated = &data[..data.len() / 2];

    let img = decode(truncated, None, true).unwrap();
    assert_eq!(img.dimensions(), (64, 48));
}

#[test]
fn test_huge_png_header_is_rejected_before_allocation() {
    let data = png_header_only(1_000_000, 1_000_000);
    assert_eq!(data.len(), 54);

    // The png reader may already refuse this canvas; either way it is an error, not an abort
    for lenient in [false, true] {
        let result = decode(&data, Some("image/png"), lenient);
        assert!(
            matches!(
                result,
                Err(TransformError::SourceTooLarge { .. }) | Err(TransformError::Decode(_))
            ),
            "lenient={}",
            lenient
        );
    }

    for lenient in [false, true] {
        let result = decode(&png_header_only(30_000, 30_000), None, lenient);
        assert!(matches!(
            result,
            Err(TransformError::SourceTooLarge {
                width: 30_000,
                height: 30_000,
                ..
            })
        ));
    }
}

#[test]
fn test_pixel_budget_applies_within_dimension_limits() {
    // Within both axis limits, over the pixel budget
    let limits = LimitsConfig {
        max_source_pixels: 1_000_000,
        ..LimitsConfig::default()
    };
    let result = decode_image(&png_header_only(2000, 2000), None, true, &limits);
    assert!(matches!(
        result,
        Err(TransformError::SourceTooLarge {
            pixels: 4_000_000,
            max_pixels: 1_000_000,
            ..
        })
    ));
}

#[test]
fn test_allocation_budget_is_enforced() {
    let limits = LimitsConfig {
        max_alloc_bytes: 1024,
        ..LimitsConfig::default()
    };

    // 64x48 RGB needs 9216 bytes
    for lenient in [false, true] {
        let result = decode_image(&encoded(ImageFormat::Png), None, lenient, &limits);
        assert!(matches!(result, Err(TransformError::Decode(_))));
    }
}

#[test]
fn test_svg_detection() {
    assert!(looks_like_svg(SVG.as_bytes(), None));
    assert!(looks_like_svg(b"", Some("image/svg+xml")));
    assert!(looks_like_svg(
        format!("<?xml version=\"1.0\"?>\n{}", SVG).as_bytes(),
        Some("text/xml")
    ));
    assert!(!looks_like_svg(&encoded(ImageFormat::Png), Some("image/png")));
}

#[test]
fn test_svg_is_rasterized() {
    let img = decode(SVG.as_bytes(), Some("image/svg+xml"), false).unwrap();
    assert_eq!(img.dimensions(), (40, 20));

    let pixel = img.to_rgba8().get_pixel(20, 10).0;
    assert_eq!(pixel, [255, 0, 0, 255]);
}

#[test]
fn test_huge_svg_is_rejected_before_rasterizing() {
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="200000" height="200000"/>"#;
    let result = decode(svg.as_bytes(), Some("image/svg+xml"), false);
    assert!(matches!(
        result,
        Err(TransformError::SourceTooLarge {
            width: 200_000,
            height: 200_000,
            ..
        })
    ));
}

#[test]
fn test_broken_svg_is_a_decode_error() {
    let result = decode(b"<svg><rect", Some("image/svg+xml"), false);
    assert!(matches!(result, Err(TransformError::Decode(_))));
}

#[test]
fn test_avif_input_follows_decode_capability() {
    let mut data = vec![0, 0, 0, 0x1c];
    data.extend_from_slice(b"ftypavif");
    data.extend_from_slice(&[0; 16]);
    assert!(looks_like_avif(&data));
    assert!(!looks_like_avif(&encoded(ImageFormat::Png)));

    let result = decode(&data, Some("image/avif"), false);
    if formats::can_decode(ImageFormatKind::Avif) {
        // Still not a real AVIF, but rejected by the decoder itself
        assert!(matches!(result, Err(TransformError::Decode(_))));
    } else {
        match result {
            Err(TransformError::Decode(message)) => {
                assert_eq!(message, "AVIF input is not supported by this build")
            }
            other => panic!("unexpected result: {:?}", other.map(|i| i.dimensions())),
        }
    }
}
