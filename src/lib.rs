use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod startup_checks;
pub mod transform;

/// Route serving every transform request.
pub const TRANSFORM_ROUTE: &str = "/imgpa";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Upper bound for each outbound request (the proxy retry gets its own budget)
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Quality used when a request does not carry `q`
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct EncodingConfig {
    pub jpeg_quality: u8,
    pub webp_quality: f32,
    pub avif_quality: u8,
    pub avif_speed: u8,
}

/// Safety limits for decoding sources and sizing outputs
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_source_width: u32,
    pub max_source_height: u32,
    /// Maximum source width * height, checked before any pixel buffer is allocated
    pub max_source_pixels: u64,
    pub max_output_width: u32,
    pub max_output_height: u32,
    /// Upper bound for a single decode allocation
    pub max_alloc_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "imgpa".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("imgpa/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 80,
            webp_quality: 80.0,
            avif_quality: 50,
            avif_speed: 6,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_source_width: 10_000,
            max_source_height: 10_000,
            max_source_pixels: 100_000_000, // 100 megapixels
            max_output_width: 8192,
            max_output_height: 8192,
            max_alloc_bytes: 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::de::Error),
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Ok(toml_edit::de::from_str::<Config>(&content)?)
    }
}

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: transform::SharedPipeline,
    pub config: Config,
}

pub async fn create_app(config: Config) -> Result<Router, startup_checks::StartupCheckError> {
    let fetcher = transform::HttpFetcher::new(&config.fetch)?;
    let pipeline = transform::Pipeline::new(
        Arc::new(fetcher),
        transform::SupportedFormats::detect(),
        config.encoding,
        config.limits,
    );

    Ok(create_app_with_pipeline(config, Arc::new(pipeline)))
}

pub fn create_app_with_pipeline(config: Config, pipeline: transform::SharedPipeline) -> Router {
    tracing::info!(
        "Advertised output formats: {}",
        pipeline.supported_formats().describe()
    );
    let app_state = AppState { pipeline, config };

    Router::new()
        .route(
            TRANSFORM_ROUTE,
            axum::routing::get(transform::transform_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let method = request.method();
                    let uri = request.uri();
                    let headers = request.headers();
                    let user_agent = headers
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %method,
                        path = %uri.path(),
                        query = ?uri.query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %status,
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
