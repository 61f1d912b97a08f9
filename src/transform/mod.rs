// Transform module - fetch a remote image and re-encode it on the fly
mod error;
mod fetch;
mod format;
mod handlers;
pub mod image_processing;
mod pipeline;
mod response;
mod types;
mod url;

// Re-export public items
pub use error::{FetchError, TransformError};
pub use fetch::{HttpFetcher, ImageFetcher, fetch_with_proxy_fallback};
pub use format::{SupportedFormats, candidate_format, resolve_format};
pub use handlers::transform_handler;
pub use pipeline::{FALLBACK_FILENAME, Pipeline, SharedPipeline, output_filename};
pub use response::{content_disposition, error_response, render_error_body};
pub use types::{FetchResult, ImageFormatKind, TransformOutput, TransformQuery, TransformRequest};
pub use url::{check_proxy_base, normalize_url, repair_scheme, validate_proxy_base};
