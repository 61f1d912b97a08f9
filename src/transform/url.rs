use tracing::{debug, warn};
use url::Url;

use super::error::TransformError;

/// Rewrite `http:/host` and `https:/host` (single slash) to the two-slash form
pub fn repair_scheme(raw: &str) -> String {
    for scheme in ["https", "http"] {
        let Some(prefix) = raw.get(..scheme.len() + 2) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(&format!("{scheme}:/")) {
            continue;
        }

        let rest = &raw[scheme.len() + 2..];
        if rest.is_empty() || rest.starts_with('/') {
            return raw.to_string();
        }
        return format!("{scheme}://{rest}");
    }

    raw.to_string()
}

fn has_http_scheme(url: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Produce an absolute http(s) URL; never rejects, bad hosts fail at fetch time
pub fn normalize_url(raw: &str) -> String {
    let repaired = repair_scheme(raw);
    if has_http_scheme(&repaired) {
        repaired
    } else {
        format!("https://{}", repaired)
    }
}

/// Validate a proxy base for use as a concatenation prefix
pub fn validate_proxy_base(raw: &str) -> Result<String, TransformError> {
    let mut base = if has_http_scheme(raw) {
        raw.to_string()
    } else {
        repair_scheme(raw)
    };

    Url::parse(&base).map_err(|e| TransformError::InvalidUrl(format!("{}: {}", base, e)))?;

    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(base)
}

/// Usable proxy base, or `None` when absent or malformed
pub fn check_proxy_base(raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|r| !r.is_empty())?;

    match validate_proxy_base(raw) {
        Ok(base) => {
            debug!("Using proxy base: {}", base);
            Some(base)
        }
        Err(e) => {
            warn!("Ignoring proxy base: {}", e);
            None
        }
    }
}
