use axum::http::StatusCode;
use thiserror::Error;

/// Failure of a single outbound fetch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchError {
    /// Upstream HTTP status, only present when the server answered
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == Some(StatusCode::FORBIDDEN.as_u16())
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(
        "Unsupported image format: {}. The formats supported by this server are: {supported}",
        .attempted.as_deref().unwrap_or("unknown")
    )]
    UnsupportedFormat {
        attempted: Option<String>,
        supported: String,
    },

    /// Source dimensions exceed the configured limits (image bomb protection)
    #[error("Image dimensions {width}x{height} ({pixels} pixels) exceed limit of {max_pixels} pixels")]
    SourceTooLarge {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    #[error("Requested output {width}x{height} exceeds limit of {max_width}x{max_height}")]
    OutputTooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransformError {
    pub fn source_too_large(width: u32, height: u32, max_pixels: u64) -> Self {
        TransformError::SourceTooLarge {
            width,
            height,
            pixels: u64::from(width) * u64::from(height),
            max_pixels,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TransformError::MissingParameter(_)
            | TransformError::InvalidParameter { .. }
            | TransformError::UnsupportedFormat { .. }
            | TransformError::OutputTooLarge { .. } => StatusCode::BAD_REQUEST,
            TransformError::InvalidUrl(_)
            | TransformError::SourceTooLarge { .. }
            | TransformError::Fetch(_)
            | TransformError::Decode(_)
            | TransformError::Encode(_)
            | TransformError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message line of the HTML error body; caller-supplied text is escaped
    pub fn to_html(&self) -> String {
        match self {
            TransformError::MissingParameter(name) => {
                format!("Missing required parameter: <u>{{{}}}</u>", escape_html(name))
            }
            TransformError::InvalidParameter { name, value } => format!(
                "Invalid value for parameter <u>{}</u>: <u>{}</u>",
                escape_html(name),
                escape_html(value)
            ),
            TransformError::UnsupportedFormat {
                attempted,
                supported,
            } => format!(
                "Unsupported image format: <u>{}</u>. The formats supported by this server are: <u>{}</u>",
                escape_html(attempted.as_deref().unwrap_or("unknown")),
                escape_html(supported)
            ),
            other => escape_html(&other.to_string()),
        }
    }
}

impl From<image::ImageError> for TransformError {
    fn from(err: image::ImageError) -> Self {
        match &err {
            image::ImageError::Encoding(_) => TransformError::Encode(err.to_string()),
            _ => TransformError::Decode(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for TransformError {
    fn from(err: tokio::task::JoinError) -> Self {
        TransformError::Internal(err.to_string())
    }
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
