//! HTTP route handlers for the EventDesk server.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `POST /api/auth/login` - Exchange the admin password for a session token
//! - `GET /api/auth/me` - Report whether the presented token is valid
//! - `POST /api/auth/logout` - Drop the presented session
//! - `GET /api/events` - List upcoming events (`?all=true` includes past ones)
//! - `POST /api/events` - Create an event (admin)
//! - `GET /api/events/{id}` - Fetch one event
//! - `PUT /api/events/{id}` - Replace an event (admin)
//! - `DELETE /api/events/{id}` - Delete an event (admin)
//! - `GET /health` - Health check endpoint
//!
//! Any other method/path combination gets a JSON 404.
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`], which contains:
//! - Configuration (including the admin password)
//! - The session manager
//! - The event repository
//! - The clock every time-dependent decision reads from
//! - Server start time for uptime reporting
//!
//! # Example
//!
//! ```rust,no_run
//! use eventdesk_server::config::Config;
//! use eventdesk_server::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     let state = AppState::new(config);
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::auth::{extract_bearer_token, verify_password, AdminSession};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::events::{Event, EventInput, EventRepository, NewEvent};
use crate::session::SessionManager;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request body size (64 KiB).
const MAX_BODY_SIZE: usize = 64 * 1024;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
///
/// Every field is a cheap handle; cloning the state per request shares the
/// underlying stores.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Admin sessions.
    pub sessions: SessionManager,

    /// Event storage.
    pub events: EventRepository,

    /// Time source shared with the session manager.
    pub clock: Arc<dyn Clock>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates application state backed by wall-clock time.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eventdesk_server::config::Config;
    /// use eventdesk_server::routes::AppState;
    ///
    /// let state = AppState::new(Config::new("admin"));
    /// assert_eq!(state.sessions.session_count(), 0);
    /// ```
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates application state with a custom time source.
    ///
    /// Useful for tests that need to move time past the session TTL.
    #[must_use]
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionManager::new(Arc::clone(&clock)),
            events: EventRepository::new(),
            clock,
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("events", &self.events)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
///
/// # Example
///
/// ```rust
/// use eventdesk_server::config::Config;
/// use eventdesk_server::routes::{create_router, AppState};
///
/// let router = create_router(AppState::new(Config::new("admin")));
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(login).fallback(not_found))
        .route("/api/auth/me", get(me).fallback(not_found))
        .route("/api/auth/logout", post(logout).fallback(not_found))
        .route(
            "/api/events",
            get(list_events).post(create_event).fallback(not_found),
        )
        .route(
            "/api/events/{id}",
            get(get_event)
                .put(update_event)
                .delete(delete_event)
                .fallback(not_found),
        )
        .route("/health", get(get_health).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Catch-all for unknown routes and unsupported methods.
async fn not_found() -> ServerError {
    ServerError::NotFound
}

// ============================================================================
// Extractor Rejections
// ============================================================================
//
// Handlers take `Result<Extractor, Rejection>` and map the rejection through
// these helpers so every failure leaves as a `ServerError` JSON body.

/// Buffered request body, or the reason it could not be read.
type BodyResult = std::result::Result<Bytes, BytesRejection>;

/// Raw `{id}` path segment, or the reason it could not be decoded.
type IdPath = std::result::Result<Path<String>, PathRejection>;

fn body_rejection(rejection: BytesRejection) -> ServerError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge
    } else {
        ServerError::validation(rejection.body_text())
    }
}

/// A path segment that cannot be decoded cannot name an event either.
fn path_rejection(rejection: PathRejection) -> ServerError {
    debug!(error = %rejection.body_text(), "Undecodable event id in path");
    ServerError::NotFound
}

fn query_rejection(rejection: QueryRejection) -> ServerError {
    ServerError::validation(rejection.body_text())
}

// ============================================================================
// Auth Routes
// ============================================================================

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
struct LoginRequest {
    password: String,
}

/// Successful login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Response body for `GET /api/auth/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub authenticated: bool,
}

/// Response body for `POST /api/auth/logout`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub ok: bool,
}

/// POST /api/auth/login - Exchange the admin password for a session token.
///
/// # Request Body
///
/// `{"password": "<admin password>"}`
///
/// # Responses
///
/// - `200 OK` - `{"token": "..."}`
/// - `401 Unauthorized` - wrong password, or a body without a string
///   `password` field
/// - `413 Payload Too Large` - body over the size limit
async fn login(
    State(state): State<AppState>,
    body: BodyResult,
) -> Result<Json<LoginResponse>> {
    let body = body.map_err(|rejection| match body_rejection(rejection) {
        ServerError::PayloadTooLarge => ServerError::PayloadTooLarge,
        _ => ServerError::InvalidCredentials,
    })?;

    // Parse errors can echo the submitted value, so only the fact is logged.
    let Ok(request) = serde_json::from_slice::<LoginRequest>(&body) else {
        debug!(body_len = body.len(), "Login body could not be parsed");
        return Err(ServerError::InvalidCredentials);
    };

    if !verify_password(&request.password, &state.config.admin_password) {
        warn!("Admin login failed");
        return Err(ServerError::InvalidCredentials);
    }

    let token = state.sessions.create_session();
    info!(
        active_sessions = state.sessions.session_count(),
        "Admin login succeeded"
    );

    Ok(Json(LoginResponse { token }))
}

/// GET /api/auth/me - Report authentication status.
///
/// Always `200 OK`; this endpoint reports, it does not gate.
async fn me(State(state): State<AppState>, headers: HeaderMap) -> Json<MeResponse> {
    let authenticated = extract_bearer_token(&headers)
        .is_some_and(|token| state.sessions.validate_session(token));

    Json(MeResponse { authenticated })
}

/// POST /api/auth/logout - Drop the presented session, if any.
///
/// Always `200 OK` with `{"ok": true}`, whether or not the token existed.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<LogoutResponse> {
    match extract_bearer_token(&headers) {
        Some(token) => {
            if state.sessions.delete_session(token) {
                info!("Admin logged out");
            } else {
                debug!("Logout with unknown or already-ended session");
            }
        }
        None => debug!("Logout without bearer token"),
    }

    Json(LogoutResponse { ok: true })
}

// ============================================================================
// Event Routes
// ============================================================================

/// Query parameters for `GET /api/events`.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    /// `true` or `1` includes events that have already started.
    pub all: Option<String>,
}

impl ListEventsQuery {
    fn include_past(&self) -> bool {
        self.all
            .as_deref()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }
}

/// Parses an event id from the path. Anything that is not an integer
/// cannot name an event, so it is a 404 rather than a 400.
fn parse_event_id(raw: &str) -> Result<i64> {
    raw.parse().map_err(|_| ServerError::NotFound)
}

/// Decodes and validates an event body.
fn parse_event_body(body: &Bytes) -> Result<NewEvent> {
    let input: EventInput = serde_json::from_slice(body)
        .map_err(|err| ServerError::validation(format!("invalid event body: {err}")))?;
    input.validate()
}

/// GET /api/events - List events.
///
/// Public. Upcoming events only unless `?all=true`.
async fn list_events(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListEventsQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>> {
    let Query(query) = query.map_err(query_rejection)?;
    Ok(Json(state.events.list(query.include_past(), state.clock.now())))
}

/// GET /api/events/{id} - Fetch one event.
async fn get_event(
    State(state): State<AppState>,
    path: IdPath,
) -> Result<Json<Event>> {
    let Path(id) = path.map_err(path_rejection)?;
    let id = parse_event_id(&id)?;
    state.events.get(id).map(Json).ok_or(ServerError::NotFound)
}

/// POST /api/events - Create an event.
///
/// # Responses
///
/// - `201 Created` - the stored event
/// - `400 Bad Request` - body missing a title or date, or malformed
/// - `401 Unauthorized` - no valid admin session (checked first)
/// - `413 Payload Too Large` - body over the size limit
async fn create_event(
    _admin: AdminSession,
    State(state): State<AppState>,
    body: BodyResult,
) -> Result<impl IntoResponse> {
    let body = body.map_err(body_rejection)?;
    let new_event = parse_event_body(&body)?;
    let event = state.events.create(new_event, state.clock.now());
    info!(event_id = event.id, "Event created");

    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /api/events/{id} - Replace an event.
///
/// Auth, then body validation, then the existence check: a bad body for a
/// missing event is a 400.
async fn update_event(
    _admin: AdminSession,
    State(state): State<AppState>,
    path: IdPath,
    body: BodyResult,
) -> Result<Json<Event>> {
    let body = body.map_err(body_rejection)?;
    let new_event = parse_event_body(&body)?;
    let Path(id) = path.map_err(path_rejection)?;
    let id = parse_event_id(&id)?;

    let event = state
        .events
        .update(id, new_event, state.clock.now())
        .ok_or(ServerError::NotFound)?;
    info!(event_id = id, "Event updated");

    Ok(Json(event))
}

/// DELETE /api/events/{id} - Delete an event.
///
/// `204 No Content` on success, `404` if there was nothing to delete.
async fn delete_event(
    _admin: AdminSession,
    State(state): State<AppState>,
    path: IdPath,
) -> Result<StatusCode> {
    let Path(id) = path.map_err(path_rejection)?;
    let id = parse_event_id(&id)?;

    if !state.events.delete(id) {
        return Err(ServerError::NotFound);
    }
    info!(event_id = id, "Event deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,

    /// Stored sessions, including expired ones not yet swept.
    pub active_sessions: usize,
}

/// GET /health - Health check endpoint.
///
/// No authentication required.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.session_count(),
    })
}

// ============================================================================
// Tests
// ============================================================================
