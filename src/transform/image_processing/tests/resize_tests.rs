use crate::LimitsConfig;
use crate::transform::TransformError;
use crate::transform::image_processing::{Fit, ResizeSpec, resize_image};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb};

fn source(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    }))
}

fn resize(img: DynamicImage, spec: &ResizeSpec) -> DynamicImage {
    resize_image(img, spec, &LimitsConfig::default()).unwrap()
}

fn resized(width: Option<u32>, height: Option<u32>, fit: Fit) -> (u32, u32) {
    resize(source(400, 300), &ResizeSpec::new(width, height, fit)).dimensions()
}

#[test]
fn test_fit_parse() {
    assert_eq!(Fit::parse(Some("contain")), Fit::Contain);
    assert_eq!(Fit::parse(Some("fill")), Fit::Fill);
    assert_eq!(Fit::parse(Some("inside")), Fit::Inside);
    assert_eq!(Fit::parse(Some("outside")), Fit::Outside);
    assert_eq!(Fit::parse(Some("cover")), Fit::Cover);
    assert_eq!(Fit::parse(Some("stretch")), Fit::Cover);
    assert_eq!(Fit::parse(Some("CONTAIN")), Fit::Cover);
    assert_eq!(Fit::parse(None), Fit::Cover);
}

#[test]
fn test_cover_crops_to_exact_box() {
    assert_eq!(resized(Some(200), Some(100), Fit::Cover), (200, 100));
    assert_eq!(resized(Some(100), Some(200), Fit::Cover), (100, 200));
}

#[test]
fn test_fill_stretches() {
    assert_eq!(resized(Some(50), Some(250), Fit::Fill), (50, 250));
}

#[test]
fn test_contain_pads_to_box() {
    let img = resize(source(400, 300), &ResizeSpec::new(Some(200), Some(200), Fit::Contain));
    assert_eq!(img.dimensions(), (200, 200));

    // 400x300 scales to 200x150, centered with 25px transparent bands
    let rgba = img.to_rgba8();
    assert_eq!(rgba.get_pixel(100, 0)[3], 0);
    assert_eq!(rgba.get_pixel(100, 199)[3], 0);
    assert_eq!(rgba.get_pixel(100, 100)[3], 255);
}

#[test]
fn test_inside_never_upscales() {
    assert_eq!(resized(Some(200), Some(200), Fit::Inside), (200, 150));
    assert_eq!(resized(Some(800), Some(800), Fit::Inside), (400, 300));
}

#[test]
fn test_outside_never_downscales() {
    assert_eq!(resized(Some(800), Some(800), Fit::Outside), (1067, 800));
    assert_eq!(resized(Some(100), Some(100), Fit::Outside), (400, 300));
}

#[test]
fn test_single_dimension_keeps_aspect_ratio() {
    assert_eq!(resized(Some(200), None, Fit::Cover), (200, 150));
    assert_eq!(resized(None, Some(150), Fit::Fill), (200, 150));
}

#[test]
fn test_zero_dimension_is_unconstrained() {
    let spec = ResizeSpec::new(Some(0), Some(0), Fit::Cover);
    assert!(spec.is_noop());
    assert_eq!(resize(source(400, 300), &spec).dimensions(), (400, 300));

    assert_eq!(resized(Some(0), Some(150), Fit::Cover), (200, 150));
}

#[test]
fn test_cover_keeps_center() {
    // Left half red, right half blue; a square crop straddles the boundary
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_fn(400, 100, |x, _| {
        if x < 200 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
    }));
    let out = resize(img, &ResizeSpec::new(Some(50), Some(50), Fit::Cover)).to_rgb8();
    assert_eq!(out.dimensions(), (50, 50));
    assert_eq!(out.get_pixel(2, 25).0, [255, 0, 0]);
    assert_eq!(out.get_pixel(47, 25).0, [0, 0, 255]);
}

#[test]
fn test_box_over_output_limit_is_rejected() {
    let spec = ResizeSpec::new(Some(1_000_000), Some(1_000_000), Fit::Fill);
    let result = resize_image(source(4, 4), &spec, &LimitsConfig::default());
    assert!(matches!(
        result,
        Err(TransformError::OutputTooLarge {
            width: 1_000_000,
            height: 1_000_000,
            ..
        })
    ));
}

#[test]
fn test_derived_axis_over_output_limit_is_rejected() {
    let spec = ResizeSpec::new(Some(5000), None, Fit::Cover);
    let result = resize_image(source(1, 1000), &spec, &LimitsConfig::default());
    assert!(matches!(
        result,
        Err(TransformError::OutputTooLarge {
            width: 5000,
            height: 5_000_000,
            ..
        })
    ));
}

#[test]
fn test_outside_overflow_is_checked() {
    // The box itself is allowed, the upscaled result is not
    let spec = ResizeSpec::new(Some(8000), Some(10), Fit::Outside);
    let result = resize_image(source(10, 1000), &spec, &LimitsConfig::default());
    assert!(matches!(result, Err(TransformError::OutputTooLarge { .. })));
}
