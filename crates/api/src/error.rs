//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;

use crate::auth::AuthError;

/// Message returned for every storage failure. The cause is only logged.
const UNAVAILABLE_MESSAGE: &str = "service temporarily unavailable";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path, query or body.
    BadRequest(String),
    /// Missing, invalid or insufficient credentials.
    Auth(AuthError),
    /// Domain logic error.
    Domain(DomainError),
}

/// Non-standard status used when the client went away before the response.
fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Auth(err) => auth_error_to_response(err),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn auth_error_to_response(err: AuthError) -> (StatusCode, String) {
    match err {
        AuthError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
        AuthError::Internal(ref cause) => {
            tracing::error!(error = %cause, "token verifier failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
        AuthError::MissingToken | AuthError::InvalidToken | AuthError::Expired => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Conflict(_) | DomainError::InsufficientStock { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::Unavailable(cause) => {
            tracing::error!(error = %cause, "storage unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                UNAVAILABLE_MESSAGE.to_string(),
            )
        }
        DomainError::Canceled => (client_closed_request(), err.to_string()),
        DomainError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
        DomainError::Internal(cause) => {
            tracing::error!(error = %cause, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
