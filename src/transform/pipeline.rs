use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use super::error::TransformError;
use super::fetch::{ImageFetcher, fetch_with_proxy_fallback};
use super::format::{SupportedFormats, resolve_format};
use super::image_processing::{TransformOptions, transform_image};
use super::types::{FetchResult, TransformOutput, TransformRequest};
use crate::{EncodingConfig, LimitsConfig};

pub type SharedPipeline = Arc<Pipeline>;

/// Filename used when the source URL has no usable path segment
pub const FALLBACK_FILENAME: &str = "image";

/// Normalize, fetch, resolve and transform; one stateless run per request
pub struct Pipeline {
    fetcher: Arc<dyn ImageFetcher>,
    formats: SupportedFormats,
    encoding: EncodingConfig,
    limits: LimitsConfig,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        formats: SupportedFormats,
        encoding: EncodingConfig,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            fetcher,
            formats,
            encoding,
            limits,
        }
    }

    pub fn supported_formats(&self) -> &SupportedFormats {
        &self.formats
    }

    pub async fn run(&self, request: &TransformRequest) -> Result<TransformOutput, TransformError> {
        let fetched = fetch_with_proxy_fallback(
            self.fetcher.as_ref(),
            &request.source_url,
            request.referer.as_deref(),
            request.proxy_base.as_deref(),
        )
        .await?;

        let format = resolve_format(
            request.format.as_deref(),
            &request.source_url,
            &fetched,
            &self.formats,
        )?;

        let options = TransformOptions {
            format,
            resize: request.resize_spec(),
            quality: request.quality,
            lenient: request.suppress_decode_errors,
        };
        debug!("Transforming {} with {:?}", request.source_url, options);

        let (encoding, limits) = (self.encoding, self.limits);
        let FetchResult {
            body, content_type, ..
        } = fetched;
        let data = tokio::task::spawn_blocking(move || {
            transform_image(&body, content_type.as_deref(), &options, &encoding, &limits)
        })
        .await??;

        let filename = output_filename(&request.source_url, request.output_filename.as_deref());
        info!(
            "Transformed {} into {} bytes of {} ({}.{})",
            request.source_url,
            data.len(),
            format,
            filename,
            format
        );

        Ok(TransformOutput {
            data,
            format,
            filename,
        })
    }
}

/// Explicit override, else the source path's basename without its extension
pub fn output_filename(source_url: &str, explicit: Option<&str>) -> String {
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    Url::parse(source_url)
        .ok()
        .and_then(|url| {
            Path::new(url.path())
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{FetchError, ImageFormatKind, TransformQuery};
    use async_trait::async_trait;
    use bytes::Bytes;
    use image::{GenericImageView, ImageBuffer, Rgb};

    struct StaticFetcher {
        result: Result<FetchResult, FetchError>,
    }

    #[async_trait]
    impl ImageFetcher for StaticFetcher {
        async fn fetch(
            &self,
            _url: &str,
            _referer: Option<&str>,
        ) -> Result<FetchResult, FetchError> {
            self.result.clone()
        }
    }

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 128]));
        let mut data = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(data)
    }

    fn pipeline(result: Result<FetchResult, FetchError>) -> Pipeline {
        Pipeline::new(
            Arc::new(StaticFetcher { result }),
            SupportedFormats::detect(),
            EncodingConfig::default(),
            LimitsConfig::default(),
        )
    }

    fn request(params: &[(&str, &str)]) -> TransformRequest {
        let mut query = TransformQuery::default();
        for (key, value) in params {
            let value = Some(value.to_string());
            match *key {
                "url" => query.url = value,
                "w" => query.w = value,
                "h" => query.h = value,
                "fit" => query.fit = value,
                "q" => query.q = value,
                "format" => query.format = value,
                "filename" => query.filename = value,
                _ => panic!("unknown parameter {}", key),
            }
        }
        TransformRequest::from_query(query, &LimitsConfig::default()).unwrap()
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("https://host/dir/photo.jpg", None), "photo");
        assert_eq!(
            output_filename("https://host/dir/archive.tar.gz", None),
            "archive.tar"
        );
        assert_eq!(output_filename("https://host/dir/photo.jpg", Some("custom")), "custom");
        assert_eq!(output_filename("https://host/dir/photo.jpg", Some("")), "photo");
        assert_eq!(output_filename("https://host/", None), FALLBACK_FILENAME);
        assert_eq!(output_filename("https://not a host", None), FALLBACK_FILENAME);
    }

    #[tokio::test]
    async fn test_run_resizes_and_encodes() {
        let pipeline = pipeline(Ok(FetchResult {
            status: 200,
            content_type: Some("image/png".to_string()),
            body: png_bytes(400, 300),
        }));

        let output = pipeline
            .run(&request(&[
                ("url", "https://host/photo.jpg"),
                ("w", "200"),
                ("h", "100"),
            ]))
            .await
            .unwrap();

        assert_eq!(output.format, ImageFormatKind::Jpeg);
        assert_eq!(output.filename, "photo");
        let decoded = image::load_from_memory(&output.data).unwrap();
        assert_eq!(decoded.dimensions(), (200, 100));
    }

    #[tokio::test]
    async fn test_unsupported_format_stops_before_decode() {
        let pipeline = pipeline(Ok(FetchResult {
            status: 200,
            content_type: Some("image/png".to_string()),
            body: Bytes::from_static(b"not an image at all"),
        }));

        let err = pipeline
            .run(&request(&[("url", "https://host/a.bmp")]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_to_decode() {
        let pipeline = pipeline(Ok(FetchResult {
            status: 200,
            content_type: Some("image/png".to_string()),
            body: Bytes::from_static(b"not an image at all"),
        }));

        let err = pipeline
            .run(&request(&[("url", "https://host/a.png")]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Decode(_)));
    }

    #[tokio::test]
    async fn test_derived_dimension_over_limit_is_rejected() {
        let pipeline = pipeline(Ok(FetchResult {
            status: 200,
            content_type: Some("image/png".to_string()),
            body: png_bytes(1, 1000),
        }));

        // w=8000 on a 1x1000 source derives a height of 8,000,000
        let err = pipeline
            .run(&request(&[("url", "https://host/tall.png"), ("w", "8000")]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransformError::OutputTooLarge {
                width: 8000,
                height: 8_000_000,
                ..
            }
        ));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let pipeline = pipeline(Err(FetchError::new(Some(404), "Request failed with status code 404")));

        let err = pipeline
            .run(&request(&[("url", "https://host/a.png")]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status code 404");
    }
}
