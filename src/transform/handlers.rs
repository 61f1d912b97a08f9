use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use super::error::TransformError;
use super::response::error_response;
use super::types::{TransformQuery, TransformRequest};
use super::url::normalize_url;
use crate::AppState;

pub async fn transform_handler(
    State(app_state): State<AppState>,
    query: Result<Query<TransformQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            let err = TransformError::InvalidParameter {
                name: "query",
                value: rejection.body_text(),
            };
            info!("Rejected transform request: {}", err);
            return error_response(&err, "");
        }
    };

    // Echoed back on failure, so normalize before anything can fail
    let echo_url = query
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(normalize_url)
        .unwrap_or_default();

    let result = match TransformRequest::from_query(query, &app_state.config.limits) {
        Ok(request) => app_state.pipeline.run(&request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => output.into_response(),
        Err(e) => {
            if e.status_code().is_server_error() {
                error!("Transform of {} failed: {}", echo_url, e);
            } else {
                info!("Rejected transform of {:?}: {}", echo_url, e);
            }
            error_response(&e, &echo_url)
        }
    }
}
