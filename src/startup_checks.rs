use crate::Config;
use crate::transform::{ImageFormatKind, image_processing::formats};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Fetch timeout must be at least one second")]
    InvalidFetchTimeout,

    #[error("Default {0} quality must be between 1 and 100, got {1}")]
    InvalidDefaultQuality(&'static str, f32),

    #[error("Invalid listen host: {0}")]
    InvalidHost(String),

    #[error("Limit {0} must be greater than zero")]
    InvalidLimit(&'static str),
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    if config.server.host.parse::<std::net::IpAddr>().is_err() {
        error!("Listen host is not an IP address: {}", config.server.host);
        errors.push(StartupCheckError::InvalidHost(config.server.host.clone()));
    }

    if config.fetch.timeout_secs == 0 {
        error!("Fetch timeout is zero, every upstream request would fail");
        errors.push(StartupCheckError::InvalidFetchTimeout);
    } else {
        info!("Upstream fetch timeout: {}s", config.fetch.timeout_secs);
    }

    let qualities = [
        ("jpeg", f32::from(config.encoding.jpeg_quality)),
        ("webp", config.encoding.webp_quality),
        ("avif", f32::from(config.encoding.avif_quality)),
    ];
    for (name, quality) in qualities {
        if !(1.0..=100.0).contains(&quality) {
            error!("Default {} quality out of range: {}", name, quality);
            errors.push(StartupCheckError::InvalidDefaultQuality(name, quality));
        }
    }

    let limits = [
        ("max_source_width", u64::from(config.limits.max_source_width)),
        ("max_source_height", u64::from(config.limits.max_source_height)),
        ("max_source_pixels", config.limits.max_source_pixels),
        ("max_output_width", u64::from(config.limits.max_output_width)),
        ("max_output_height", u64::from(config.limits.max_output_height)),
        ("max_alloc_bytes", config.limits.max_alloc_bytes),
    ];
    for (name, value) in limits {
        if value == 0 {
            error!("Limit {} is zero, every transform would be rejected", name);
            errors.push(StartupCheckError::InvalidLimit(name));
        }
    }
    info!(
        "Source limit {}x{} ({} pixels), output limit {}x{}",
        config.limits.max_source_width,
        config.limits.max_source_height,
        config.limits.max_source_pixels,
        config.limits.max_output_width,
        config.limits.max_output_height
    );

    // Codec capability table
    for kind in ImageFormatKind::ALL {
        info!(
            "Format {:<5} decode={:<5} encode={}",
            kind,
            formats::can_decode(kind),
            formats::can_encode(kind)
        );
    }
    if !formats::can_encode(ImageFormatKind::Avif) {
        warn!("AVIF output is disabled in this build");
    }
    if !formats::can_decode(ImageFormatKind::Avif) {
        warn!("AVIF sources will be rejected, build with the avif-decode feature to accept them");
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
