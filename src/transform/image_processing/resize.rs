use image::{DynamicImage, GenericImageView, Rgba, RgbaImage, imageops, imageops::FilterType};
use tracing::debug;

use crate::LimitsConfig;
use crate::transform::TransformError;

/// How the source is mapped onto the requested box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// Fill both dimensions, cropping overflow
    #[default]
    Cover,
    /// Fit within both dimensions, padding the remainder
    Contain,
    /// Stretch to exactly the given dimensions
    Fill,
    /// Downscale only, preserving aspect ratio
    Inside,
    /// Upscale only, preserving aspect ratio
    Outside,
}

impl Fit {
    /// Unknown or missing values fall back to `Cover`
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("cover") => Fit::Cover,
            Some("contain") => Fit::Contain,
            Some("fill") => Fit::Fill,
            Some("inside") => Fit::Inside,
            Some("outside") => Fit::Outside,
            _ => Fit::Cover,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Fit,
}

impl ResizeSpec {
    /// Zero on an axis is the same as leaving it unconstrained
    pub fn new(width: Option<u32>, height: Option<u32>, fit: Fit) -> Self {
        Self {
            width: width.filter(|w| *w > 0),
            height: height.filter(|h| *h > 0),
            fit,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Requested box with any missing axis derived from the source aspect ratio
    fn target_box(&self, src_width: u32, src_height: u32) -> Option<(u32, u32)> {
        let scale = |value: u32, num: u32, den: u32| -> u32 {
            ((value as f64 * num as f64 / den as f64).round() as u32).max(1)
        };

        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            (Some(w), None) => Some((w, scale(src_height, w, src_width))),
            (None, Some(h)) => Some((scale(src_width, h, src_height), h)),
            (None, None) => None,
        }
    }
}

/// Dimensions of `(width, height)` scaled by `factor`, never collapsing to zero
fn scaled(width: u32, height: u32, factor: f64) -> (u32, u32) {
    (
        ((width as f64 * factor).round() as u32).max(1),
        ((height as f64 * factor).round() as u32).max(1),
    )
}

/// Fail before allocating anything larger than the configured output box
fn check_output(width: u32, height: u32, limits: &LimitsConfig) -> Result<(), TransformError> {
    if width > limits.max_output_width || height > limits.max_output_height {
        return Err(TransformError::OutputTooLarge {
            width,
            height,
            max_width: limits.max_output_width,
            max_height: limits.max_output_height,
        });
    }
    Ok(())
}

pub fn resize_image(
    img: DynamicImage,
    spec: &ResizeSpec,
    limits: &LimitsConfig,
) -> Result<DynamicImage, TransformError> {
    let (src_width, src_height) = img.dimensions();
    let Some((box_width, box_height)) = spec.target_box(src_width, src_height) else {
        return Ok(img);
    };
    if src_width == 0 || src_height == 0 {
        return Ok(img);
    }
    check_output(box_width, box_height, limits)?;

    debug!(
        "Resizing {}x{} into {}x{} with {:?}",
        src_width, src_height, box_width, box_height, spec.fit
    );

    let width_ratio = box_width as f64 / src_width as f64;
    let height_ratio = box_height as f64 / src_height as f64;

    let resized = match spec.fit {
        Fit::Cover => {
            let cropped = crop_to_aspect(&img, box_width, box_height);
            cropped.resize_exact(box_width, box_height, FilterType::Lanczos3)
        }
        Fit::Fill => img.resize_exact(box_width, box_height, FilterType::Lanczos3),
        Fit::Contain => {
            let (width, height) = scaled(src_width, src_height, width_ratio.min(height_ratio));
            let fitted = img.resize_exact(width, height, FilterType::Lanczos3);
            if (width, height) == (box_width, box_height) {
                fitted
            } else {
                pad_to(&fitted, box_width, box_height)
            }
        }
        Fit::Inside => {
            if src_width <= box_width && src_height <= box_height {
                return Ok(img);
            }
            let (width, height) = scaled(src_width, src_height, width_ratio.min(height_ratio));
            img.resize_exact(width, height, FilterType::Lanczos3)
        }
        Fit::Outside => {
            if src_width >= box_width && src_height >= box_height {
                return Ok(img);
            }
            // Overflows the box on one axis, so it needs its own check
            let (width, height) = scaled(src_width, src_height, width_ratio.max(height_ratio));
            check_output(width, height, limits)?;
            img.resize_exact(width, height, FilterType::Lanczos3)
        }
    };

    Ok(resized)
}

/// Centered crop of `img` to the aspect ratio of `width` x `height`
fn crop_to_aspect(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (src_width, src_height) = img.dimensions();
    let target = width as f64 / height as f64;

    let (crop_width, crop_height) = if src_width as f64 / src_height as f64 > target {
        (
            ((src_height as f64 * target).round() as u32).clamp(1, src_width),
            src_height,
        )
    } else {
        (
            src_width,
            ((src_width as f64 / target).round() as u32).clamp(1, src_height),
        )
    };

    img.crop_imm(
        (src_width - crop_width) / 2,
        (src_height - crop_height) / 2,
        crop_width,
        crop_height,
    )
}

/// Center `img` on a transparent canvas of the given size
fn pad_to(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let x = (width.saturating_sub(img.width()) / 2) as i64;
    let y = (height.saturating_sub(img.height()) / 2) as i64;
    imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}
