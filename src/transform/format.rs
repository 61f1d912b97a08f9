use std::path::Path;
use tracing::debug;
use url::Url;

use super::error::TransformError;
use super::image_processing::formats;
use super::types::{FetchResult, ImageFormatKind};

/// Output formats advertised by this build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedFormats {
    formats: Vec<ImageFormatKind>,
}

impl SupportedFormats {
    /// Intersect the known formats with what the compiled codecs can encode
    pub fn detect() -> Self {
        Self::from_capability(formats::can_encode)
    }

    pub fn from_capability(can_encode: impl Fn(ImageFormatKind) -> bool) -> Self {
        Self {
            formats: ImageFormatKind::ALL
                .into_iter()
                .filter(|kind| can_encode(*kind))
                .collect(),
        }
    }

    pub fn contains(&self, kind: ImageFormatKind) -> bool {
        self.formats.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = ImageFormatKind> + '_ {
        self.formats.iter().copied()
    }

    pub fn describe(&self) -> String {
        self.formats
            .iter()
            .map(ImageFormatKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lowercased extension of the URL path's last segment, with `jpg`/`tif` aliased
fn extension_from_url(source_url: &str) -> Option<String> {
    let url = Url::parse(source_url).ok()?;
    let ext = Path::new(url.path())
        .extension()?
        .to_str()?
        .to_lowercase();

    match ext.as_str() {
        "" => None,
        "jpg" => Some("jpeg".to_string()),
        "tif" => Some("tiff".to_string()),
        _ => Some(ext),
    }
}

/// Subtype of the content-type header, e.g. `png` for `image/png; charset=binary`
fn subtype_from_content_type(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim();
    let subtype = essence.split('/').nth(1)?.trim();
    (!subtype.is_empty()).then(|| subtype.to_lowercase())
}

/// First of explicit format, URL extension, response content-type
pub fn candidate_format(
    explicit: Option<&str>,
    source_url: &str,
    fetched: &FetchResult,
) -> Option<String> {
    if let Some(explicit) = explicit.filter(|f| !f.is_empty()) {
        return Some(explicit.to_lowercase());
    }

    if let Some(ext) = extension_from_url(source_url) {
        return Some(ext);
    }

    fetched
        .content_type
        .as_deref()
        .and_then(subtype_from_content_type)
}

pub fn resolve_format(
    explicit: Option<&str>,
    source_url: &str,
    fetched: &FetchResult,
    supported: &SupportedFormats,
) -> Result<ImageFormatKind, TransformError> {
    let candidate = candidate_format(explicit, source_url, fetched);
    debug!("Format candidate for {}: {:?}", source_url, candidate);

    candidate
        .as_deref()
        .and_then(|c| c.parse::<ImageFormatKind>().ok())
        .filter(|kind| supported.contains(*kind))
        .ok_or_else(|| TransformError::UnsupportedFormat {
            attempted: candidate.clone(),
            supported: supported.describe(),
        })
}
