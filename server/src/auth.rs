//! Request-level authentication for the admin write surface.
//!
//! Protected routes accept a request only when it carries
//! `Authorization: Bearer <token>` with a token that
//! [`SessionManager::validate_session`] accepts.
//!
//! # Overview
//!
//! - [`extract_bearer_token`] pulls the token out of the headers.
//! - [`require_auth`] is the single authorization primitive: `None` means
//!   "proceed", `Some(response)` is a finished 401 the caller must return
//!   verbatim.
//! - [`AdminSession`] wraps `require_auth` as an axum extractor. Put it first
//!   in a handler's argument list so it runs before path and body parsing;
//!   an unauthenticated request with a bad body is a 401, not a 400.
//! - [`verify_password`] checks the login password in constant time.
//!
//! # Example
//!
//! ```rust
//! use axum::http::{header, HeaderMap, HeaderValue};
//! use eventdesk_server::auth::{extract_bearer_token, require_auth};
//! use eventdesk_server::session::SessionManager;
//!
//! let sessions = SessionManager::with_system_clock();
//! let token = sessions.create_session();
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(
//!     header::AUTHORIZATION,
//!     HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
//! );
//!
//! assert_eq!(extract_bearer_token(&headers), Some(token.as_str()));
//! assert!(require_auth(&sessions, &headers).is_none());
//! ```

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::ServerError;
use crate::routes::AppState;
use crate::session::SessionManager;

/// Scheme prefix of the `Authorization` header, matched case-sensitively.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Returns the bearer token from the `Authorization` header.
///
/// Yields `None` when the header is missing, not valid UTF-8, uses any
/// scheme other than exactly `Bearer`, or carries an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

/// Gate for protected operations.
///
/// Returns `None` iff the request presents a currently valid session token.
/// Every other case (missing header, wrong scheme, unknown token, expired
/// token) gets the same 401 response.
pub fn require_auth(sessions: &SessionManager, headers: &HeaderMap) -> Option<Response> {
    match extract_bearer_token(headers) {
        Some(token) if sessions.validate_session(token) => None,
        Some(_) => {
            debug!("Rejected request with invalid or expired session");
            Some(ServerError::Unauthorized.into_response())
        }
        None => {
            debug!("Rejected request without bearer token");
            Some(ServerError::Unauthorized.into_response())
        }
    }
}

/// Compares a submitted password against the configured one without
/// short-circuiting on the first differing byte.
pub fn verify_password(submitted: &str, expected: &str) -> bool {
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Proof that the request passed [`require_auth`].
///
/// Rejects with the guard's 401 response.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match require_auth(&state.sessions, &parts.headers) {
            Some(rejection) => Err(rejection),
            None => Ok(AdminSession),
        }
    }
}
