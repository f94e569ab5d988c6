//! Request ID middleware for request tracing and correlation.
//!
//! Each request gets an ID: the upstream proxy's `x-request-id` when it looks
//! sane, a fresh UUID v4 otherwise. The ID is recorded on the tracing span,
//! tagged on the Sentry scope and echoed in the response, so a shopper's
//! failed checkout can be matched to its order-service call.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request ID that is trusted.
const MAX_REQUEST_ID_LEN: usize = 128;

/// The upstream ID if it is short and printable.
fn upstream_request_id(request: &Request) -> Option<String> {
    let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then(|| value.to_owned())
}

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id =
        upstream_request_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request_with(id: &str) -> Request {
        Request::builder()
            .header(REQUEST_ID_HEADER, id)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_keeps_upstream_id() {
        let request = request_with("cf-8a1b2c3d.edge_1");
        assert_eq!(
            upstream_request_id(&request).as_deref(),
            Some("cf-8a1b2c3d.edge_1")
        );
    }

    #[test]
    fn test_rejects_odd_upstream_ids() {
        assert!(upstream_request_id(&request_with("has space")).is_none());
        assert!(upstream_request_id(&request_with(&"a".repeat(129))).is_none());
        assert!(upstream_request_id(&Request::new(Body::empty())).is_none());
    }
}
