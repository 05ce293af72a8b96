//! Mapping from library errors to HTTP responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::Error;

/// Error wrapper returned by every handler
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    /// Text safe to show the user
    message: &'static str,
    detail: String,
}

impl ApiError {
    /// Status code and stable error code for the wrapped error
    #[must_use]
    pub const fn status(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            Error::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Error::Misconfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "misconfigured"),
            Error::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Error::Endpoint { .. } | Error::Http(_) => (StatusCode::BAD_GATEWAY, "endpoint_error"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code, "request failed");
        } else {
            tracing::debug!(error = %self.0, code, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.0.user_message(),
                detail: self.0.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}
