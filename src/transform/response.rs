use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use super::error::{TransformError, escape_html};
use super::types::TransformOutput;

/// Two-line HTML error body: the message, then the source URL
pub fn render_error_body(message_html: &str, url: &str) -> String {
    format!(
        "<b>!! ERROR:</b> {}<br/><b>URL:</b> {}",
        message_html,
        escape_html(url)
    )
}

pub fn error_response(err: &TransformError, url: &str) -> Response {
    (
        err.status_code(),
        Html(render_error_body(&err.to_html(), url)),
    )
        .into_response()
}

/// `inline; filename="{name}.{ext}"` with characters that would break the quoting removed
pub fn content_disposition(filename: &str, extension: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();

    HeaderValue::from_str(&format!("inline; filename=\"{}.{}\"", safe, extension))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

impl IntoResponse for TransformOutput {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.format.mime_type()),
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            content_disposition(&self.filename, self.format.as_str()),
        );

        (StatusCode::OK, headers, Body::from(self.data)).into_response()
    }
}
