//! Error types for request handling.
//!
//! Every failure a handler can produce is a [`ServerError`], which renders
//! itself as an HTTP status plus a JSON body of the form
//! `{"error": "<message>"}`.
//!
//! # Error Types
//!
//! - [`ServerError::Unauthorized`] - no bearer token, or one that is unknown
//!   or expired. The two cases share one response so callers cannot probe
//!   whether a token ever existed.
//! - [`ServerError::InvalidCredentials`] - failed login.
//! - [`ServerError::Validation`] - request body failed validation.
//! - [`ServerError::NotFound`] - no such resource or route.
//! - [`ServerError::PayloadTooLarge`] - body over the size limit.
//! - [`ServerError::Internal`] - anything unexpected; details are logged,
//!   not returned.
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use eventdesk_server::error::ServerError;
//!
//! let err = ServerError::validation("title is required");
//! assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Body returned by the auth guard. Collaborators assert on it, so it must
/// not change.
pub const UNAUTHORIZED_MESSAGE: &str = "unauthorized";

/// Body returned for a failed login.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid password";

/// Body returned for unknown resources and routes.
pub const NOT_FOUND_MESSAGE: &str = "not found";

/// Body returned when a request body exceeds the configured limit.
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "request body too large";

/// Top-level error type for request handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Missing, malformed, unknown, or expired bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// The submitted password did not match, or the login body was unusable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The request body failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested resource or route does not exist.
    #[error("not found")]
    NotFound,

    /// The request body exceeded the size limit.
    #[error("payload too large")]
    PayloadTooLarge,

    /// Unexpected internal failure.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Creates a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eventdesk_server::error::ServerError;
    ///
    /// let err = ServerError::validation("date is required");
    /// assert!(matches!(err, ServerError::Validation(_)));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if the client made an invalid request.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns `true` if the failure is on the server side.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// The message placed in the response body.
    ///
    /// Internal errors get a generic message; their detail only goes to logs.
    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::NotFound => NOT_FOUND_MESSAGE.to_string(),
            Self::PayloadTooLarge => PAYLOAD_TOO_LARGE_MESSAGE.to_string(),
            Self::Internal(_) => "internal server error".to_string(),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref detail) = self {
            error!(error = %detail, "Internal error while handling request");
        }

        (
            self.status_code(),
            Json(ErrorResponse::new(self.public_message())),
        )
            .into_response()
    }
}

/// A specialized Result type for request handlers.
pub type Result<T> = std::result::Result<T, ServerError>;
