//! Request correlation IDs.
//!
//! Each request runs inside a `request` span tagged with its ID, so every
//! log line emitted while serving it carries `request_id`. The ID is taken
//! from the caller's `x-request-id` header when that value is usable and is
//! echoed back on the response.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::fmt;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied ID accepted as-is.
const MAX_LEN: usize = 128;

/// Correlation ID of one request, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a random (v4 UUID) ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Reuses a caller-supplied header value when it is short printable
    /// ASCII, otherwise generates a fresh ID.
    #[must_use]
    pub fn from_header(value: Option<&HeaderValue>) -> Self {
        value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_LEN)
            .filter(|id| id.bytes().all(|b| b.is_ascii_graphic()))
            .map_or_else(Self::generate, |id| Self(id.to_string()))
    }

    /// Returns the ID text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware: assigns the ID, runs the request in its span, echoes the ID.
pub async fn propagate(mut request: Request, next: Next) -> Response {
    let id = RequestId::from_header(request.headers().get(REQUEST_ID_HEADER));
    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = request.uri().path(),
    );
    request.extensions_mut().insert(id.clone());

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_id_is_kept() {
        let header = HeaderValue::from_static("abc-123");
        assert_eq!(RequestId::from_header(Some(&header)).as_str(), "abc-123");
    }

    #[test]
    fn test_unusable_ids_are_replaced() {
        let spaced = HeaderValue::from_static("two words");
        assert_ne!(RequestId::from_header(Some(&spaced)).as_str(), "two words");

        let long = HeaderValue::from_str(&"x".repeat(MAX_LEN + 1)).unwrap();
        assert_eq!(RequestId::from_header(Some(&long)).as_str().len(), 36);

        assert_eq!(RequestId::from_header(None).as_str().len(), 36);
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }
}
