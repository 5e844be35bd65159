//! Request extraction and tagging.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) unless the client sent one
//! - Open one tracing span per request carrying that ID
//! - Parse JSON bodies, mapping rejections to JSON 400 errors
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The ID is echoed back in the response headers

use axum::{body::Body, extract::FromRequest, http::Request};
use tracing::Span;

use crate::http::response::ApiError;

pub use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: &str = "x-request-id";

/// `Json` extractor whose rejection is an [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Span factory for `TraceLayer`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// Treat missing and blank strings alike.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(&None), None);
        assert_eq!(non_blank(&Some("   ".into())), None);
        assert_eq!(non_blank(&Some(" a ".into())), Some("a"));
    }
}
