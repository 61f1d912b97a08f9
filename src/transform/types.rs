use bytes::Bytes;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::error::TransformError;
use super::image_processing::{Fit, ResizeSpec};
use super::url::normalize_url;
use crate::LimitsConfig;

/// Output formats the proxy knows about, before codec capability is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormatKind {
    Jpeg,
    Png,
    WebP,
    Gif,
    Avif,
    Tiff,
    Svg,
}

impl ImageFormatKind {
    pub const ALL: [ImageFormatKind; 7] = [
        ImageFormatKind::Jpeg,
        ImageFormatKind::Png,
        ImageFormatKind::WebP,
        ImageFormatKind::Gif,
        ImageFormatKind::Avif,
        ImageFormatKind::Tiff,
        ImageFormatKind::Svg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormatKind::Jpeg => "jpeg",
            ImageFormatKind::Png => "png",
            ImageFormatKind::WebP => "webp",
            ImageFormatKind::Gif => "gif",
            ImageFormatKind::Avif => "avif",
            ImageFormatKind::Tiff => "tiff",
            ImageFormatKind::Svg => "svg",
        }
    }

    /// Always `image/{identifier}`
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormatKind::Jpeg => "image/jpeg",
            ImageFormatKind::Png => "image/png",
            ImageFormatKind::WebP => "image/webp",
            ImageFormatKind::Gif => "image/gif",
            ImageFormatKind::Avif => "image/avif",
            ImageFormatKind::Tiff => "image/tiff",
            ImageFormatKind::Svg => "image/svg",
        }
    }
}

impl fmt::Display for ImageFormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers are case-sensitive lowercase; aliasing happens during resolution
impl FromStr for ImageFormatKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageFormatKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Raw query string of a transform request
#[derive(Debug, Default, Deserialize)]
pub struct TransformQuery {
    pub url: Option<String>,
    pub w: Option<String>,
    pub h: Option<String>,
    pub fit: Option<String>,
    pub q: Option<String>,
    pub format: Option<String>,
    pub filename: Option<String>,
    #[serde(rename = "ref")]
    pub referer: Option<String>,
    pub proxy: Option<String>,
    pub hide_error: Option<String>,
    pub he: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub source_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Fit,
    pub quality: Option<u8>,
    pub format: Option<String>,
    pub output_filename: Option<String>,
    pub referer: Option<String>,
    pub proxy_base: Option<String>,
    pub suppress_decode_errors: bool,
}

impl TransformRequest {
    /// Validate the query and normalize the source URL
    pub fn from_query(query: TransformQuery, limits: &LimitsConfig) -> Result<Self, TransformError> {
        let raw_url = non_empty(query.url).ok_or(TransformError::MissingParameter("url"))?;

        let quality = parse_number::<u8>("q", query.q.as_deref())?;
        if let Some(q) = quality
            && q > 100
        {
            return Err(TransformError::InvalidParameter {
                name: "q",
                value: q.to_string(),
            });
        }

        let width = parse_dimension("w", query.w.as_deref(), limits.max_output_width)?;
        let height = parse_dimension("h", query.h.as_deref(), limits.max_output_height)?;

        Ok(Self {
            source_url: normalize_url(&raw_url),
            width,
            height,
            fit: Fit::parse(query.fit.as_deref()),
            quality,
            format: non_empty(query.format),
            output_filename: non_empty(query.filename),
            referer: non_empty(query.referer),
            proxy_base: non_empty(query.proxy),
            suppress_decode_errors: query.hide_error.is_some() || query.he.is_some(),
        })
    }

    pub fn resize_spec(&self) -> ResizeSpec {
        ResizeSpec::new(self.width, self.height, self.fit)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Empty values count as absent, anything else must parse
fn parse_number<T: FromStr>(name: &'static str, value: Option<&str>) -> Result<Option<T>, TransformError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| TransformError::InvalidParameter {
                name,
                value: raw.to_string(),
            }),
    }
}

fn parse_dimension(
    name: &'static str,
    value: Option<&str>,
    max: u32,
) -> Result<Option<u32>, TransformError> {
    let dimension = parse_number::<u32>(name, value)?;
    match dimension {
        Some(d) if d > max => Err(TransformError::InvalidParameter {
            name,
            value: format!("{} (maximum is {})", d, max),
        }),
        _ => Ok(dimension),
    }
}

/// Upstream payload plus the response metadata the pipeline needs
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub data: Vec<u8>,
    pub format: ImageFormatKind,
    pub filename: String,
}
