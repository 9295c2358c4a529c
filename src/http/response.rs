//! HTTP rendering of denied admissions.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::policy::Denial;

/// Seconds a client should wait, rounded up and never zero.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let retry_secs = retry_after_secs(self.retry_after);
        let body = serde_json::json!({
            "error": {
                "code": "rate_limited",
                "message": "Too many requests. Please slow down.",
                "details": {
                    "dimension": self.dimension,
                    "retryAfter": retry_secs
                }
            }
        });

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
        response
    }
}
