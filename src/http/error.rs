//! Mapping of [`Error`] onto HTTP responses.

use crate::Error;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// JSON error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Numeric HTTP status.
    pub status_code: u16,
    /// Human-readable description.
    pub message: String,
    /// Reason phrase of the status.
    pub error: &'static str,
}

impl ErrorBody {
    /// Builds a body for `status` with `message`.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            error: status.canonical_reason().unwrap_or("Error"),
        }
    }
}

impl Error {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::WordNotFound(_) => StatusCode::NOT_FOUND,
            Self::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::InvalidInput(reason) => reason.clone(),
            Self::WordNotFound(_) => self.to_string(),
            Self::OperationFailed { operation, cause } => {
                tracing::error!(operation = %operation, cause = %cause, "Request failed");
                "Internal server error".to_string()
            },
        };
        (status, Json(ErrorBody::new(status, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Error::InvalidInput("bad".into()), StatusCode::BAD_REQUEST; "invalid input")]
    #[test_case(Error::WordNotFound("x".into()), StatusCode::NOT_FOUND; "not found")]
    #[test_case(Error::operation("q", "boom"), StatusCode::INTERNAL_SERVER_ERROR; "operation failed")]
    fn test_status(error: Error, expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[test]
    fn test_body_shape() {
        let body = serde_json::to_value(ErrorBody::new(StatusCode::NOT_FOUND, "Word \"x\" not found")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "statusCode": 404,
                "message": "Word \"x\" not found",
                "error": "Not Found",
            })
        );
    }
}
