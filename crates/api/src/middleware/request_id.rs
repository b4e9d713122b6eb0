//! Request ID middleware for request tracing and correlation.
//!
//! The storefront proxy forwards its own `x-request-id`; otherwise a UUID v4 is
//! generated. The id is recorded on the tracing span, tagged in Sentry and
//! echoed back in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest forwarded id accepted as is.
const MAX_FORWARDED_LEN: usize = 128;

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = forwarded_id(request.headers().get(REQUEST_ID_HEADER))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

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

/// A forwarded id, if it is short printable ASCII.
fn forwarded_id(header: Option<&HeaderValue>) -> Option<String> {
    header
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_FORWARDED_LEN)
        .filter(|id| id.chars().all(|c| c.is_ascii_graphic()))
        .map(ToOwned::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_id_kept() {
        let value = HeaderValue::from_static("req-42");
        assert_eq!(forwarded_id(Some(&value)), Some("req-42".to_string()));
    }

    #[test]
    fn test_bad_forwarded_ids_rejected() {
        assert_eq!(forwarded_id(None), None);
        assert_eq!(forwarded_id(Some(&HeaderValue::from_static("  "))), None);
        assert_eq!(forwarded_id(Some(&HeaderValue::from_static("a b"))), None);
        let long = HeaderValue::from_str(&"x".repeat(MAX_FORWARDED_LEN + 1)).unwrap();
        assert_eq!(forwarded_id(Some(&long)), None);
    }
}
