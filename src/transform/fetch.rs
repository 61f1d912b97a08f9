use async_trait::async_trait;
use reqwest::header;
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::FetchError;
use super::types::FetchResult;
use super::url::check_proxy_base;
use crate::FetchConfig;

/// Retrieves raw source bytes for the pipeline
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResult, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, timeout })
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            return FetchError::new(
                None,
                format!("Request timed out after {}s", self.timeout.as_secs()),
            );
        }

        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message = format!("{}: {}", message, cause);
            source = cause.source();
        }
        FetchError::new(err.status().map(|s| s.as_u16()), message)
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchResult, FetchError> {
        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(header::REFERER, referer);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                Some(status.as_u16()),
                format!("Request failed with status code {}", status.as_u16()),
            ));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        debug!(
            "Fetched {} bytes from {} (content-type: {:?})",
            body.len(),
            url,
            content_type
        );

        Ok(FetchResult {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Fetch `url`, retrying once through the proxy base when the direct fetch is forbidden.
///
/// A failed proxy attempt is only logged; the caller always sees the direct fetch error.
pub async fn fetch_with_proxy_fallback(
    fetcher: &dyn ImageFetcher,
    url: &str,
    referer: Option<&str>,
    proxy_base: Option<&str>,
) -> Result<FetchResult, FetchError> {
    let original = match fetcher.fetch(url, referer).await {
        Ok(result) => return Ok(result),
        Err(e) => e,
    };

    if !original.is_forbidden() {
        return Err(original);
    }
    let Some(base) = check_proxy_base(proxy_base) else {
        return Err(original);
    };

    let proxied_url = format!("{}{}", base, url);
    debug!("Direct fetch forbidden, retrying through proxy: {}", proxied_url);

    match fetcher.fetch(&proxied_url, referer).await {
        Ok(result) => Ok(result),
        Err(e) => {
            warn!("Proxy fetch failed: {}", e);
            Err(original)
        }
    }
}
