//! Privacy tests for authentication data in logs.
//!
//! Neither session tokens nor the admin password may appear in log output,
//! even at TRACE level.
//!
//! # Test Approach
//!
//! 1. Use a custom tracing subscriber Layer to capture all log messages
//! 2. Exercise the session manager and the auth routes
//! 3. Verify that secrets do NOT appear in captured logs

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tower::ServiceExt;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use eventdesk_server::clock::ManualClock;
use eventdesk_server::config::Config;
use eventdesk_server::routes::{create_router, AppState, LoginResponse};
use eventdesk_server::session::{session_ttl, SessionManager};

const ADMIN_PASSWORD: &str = "correct-horse-battery-staple";

// ============================================================================
// Log Capture Infrastructure
// ============================================================================

/// A buffer for capturing log output during tests.
#[derive(Clone, Default)]
struct LogCapture {
    logs: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    fn get_logs(&self) -> String {
        self.logs.lock().unwrap().join("\n")
    }
}

/// A tracing Layer that captures log events for inspection.
struct CaptureLayer {
    capture: LogCapture,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = StringVisitor::default();
        event.record(&mut visitor);

        let message = format!(
            "[{}] {}: {}",
            event.metadata().level(),
            event.metadata().target(),
            visitor.parts.join(" ")
        );

        self.capture.logs.lock().unwrap().push(message);
    }
}

/// A visitor that collects all event fields into a string.
#[derive(Default)]
struct StringVisitor {
    parts: Vec<String>,
}

impl tracing::field::Visit for StringVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.parts.push(format!("{}={:?}", field.name(), value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.parts.push(format!("{}={}", field.name(), value));
    }
}

fn capturing_subscriber() -> (impl Subscriber + Send + Sync, LogCapture) {
    let capture = LogCapture::default();
    let layer = CaptureLayer {
        capture: capture.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(layer.with_filter(tracing_subscriber::filter::LevelFilter::TRACE));
    (subscriber, capture)
}

/// Runs `test_fn` with TRACE-level capture and returns its output plus logs.
fn with_log_capture<T>(test_fn: impl FnOnce() -> T) -> (T, String) {
    let (subscriber, capture) = capturing_subscriber();
    let output = tracing::subscriber::with_default(subscriber, test_fn);
    (output, capture.get_logs())
}

/// Async version of [`with_log_capture`].
///
/// Requires a current-thread runtime so the default subscriber stays in
/// scope for the whole future.
async fn with_log_capture_async<T, Fut>(test_fn: impl FnOnce() -> Fut) -> (T, String)
where
    Fut: std::future::Future<Output = T>,
{
    let (subscriber, capture) = capturing_subscriber();
    let _guard = tracing::subscriber::set_default(subscriber);
    let output = test_fn().await;
    (output, capture.get_logs())
}

fn assert_not_in_logs(logs: &str, secret: &str, context: &str) {
    assert!(
        !logs.contains(secret),
        "Secret found in logs during {context}!\nValue: {secret}\nLogs:\n{logs}"
    );
}

// ============================================================================
// Session Manager
// ============================================================================

#[test]
fn token_not_logged_on_creation() {
    let (tokens, logs) = with_log_capture(|| {
        let sessions = SessionManager::with_system_clock();
        vec![sessions.create_session(), sessions.create_session()]
    });

    for token in &tokens {
        assert_eq!(token.len(), 43);
        assert_not_in_logs(&logs, token, "session creation");
    }
}

#[test]
fn token_not_logged_on_validation() {
    let sessions = SessionManager::with_system_clock();
    let token = sessions.create_session();
    let unknown = "u".repeat(43);

    let ((), logs) = with_log_capture(|| {
        assert!(sessions.validate_session(&token));
        assert!(!sessions.validate_session(&unknown));
        assert!(!sessions.validate_session("short-token"));
    });

    assert_not_in_logs(&logs, &token, "session validation");
    assert_not_in_logs(&logs, &unknown, "unknown token validation");
    assert_not_in_logs(&logs, "short-token", "malformed token validation");
}

#[test]
fn token_not_logged_on_expiry_and_sweep() {
    let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
    let sessions = SessionManager::new(clock.clone());
    let first = sessions.create_session();
    let second = sessions.create_session();

    clock.advance(session_ttl() + Duration::seconds(1));

    let ((), logs) = with_log_capture(|| {
        assert!(!sessions.validate_session(&first));
        assert_eq!(sessions.sweep_expired(), 2);
    });

    assert_not_in_logs(&logs, &first, "expired validation");
    assert_not_in_logs(&logs, &second, "sweep");
}

#[test]
fn token_not_logged_on_delete() {
    let sessions = SessionManager::with_system_clock();
    let token = sessions.create_session();

    let ((), logs) = with_log_capture(|| {
        sessions.delete_session(&token);
        sessions.delete_session(&token);
    });

    assert_not_in_logs(&logs, &token, "session deletion");
}

// ============================================================================
// Auth Routes
// ============================================================================

async fn post_login(state: &AppState, password: &str) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "password": password }).to_string()))
        .unwrap();
    create_router(state.clone()).oneshot(request).await.unwrap()
}

async fn with_bearer(state: &AppState, method: &str, uri: &str, token: &str) -> StatusCode {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    create_router(state.clone())
        .oneshot(request)
        .await
        .unwrap()
        .status()
}

#[tokio::test(flavor = "current_thread")]
async fn password_and_token_not_logged_across_login_flow() {
    let state = AppState::new(Config::new(ADMIN_PASSWORD));

    let (token, logs) = with_log_capture_async(|| async {
        let response = post_login(&state, ADMIN_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let login: LoginResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(
            with_bearer(&state, "GET", "/api/auth/me", &login.token).await,
            StatusCode::OK
        );
        assert_eq!(
            with_bearer(&state, "POST", "/api/auth/logout", &login.token).await,
            StatusCode::OK
        );
        assert_eq!(
            with_bearer(&state, "DELETE", "/api/events/1", &login.token).await,
            StatusCode::UNAUTHORIZED
        );

        login.token
    })
    .await;

    assert!(logs.contains("Admin login succeeded"), "Logs:\n{logs}");
    assert_not_in_logs(&logs, ADMIN_PASSWORD, "login");
    assert_not_in_logs(&logs, &token, "login flow");
}

#[tokio::test(flavor = "current_thread")]
async fn submitted_password_not_logged_on_failed_login() {
    let state = AppState::new(Config::new(ADMIN_PASSWORD));
    let wrong = "guess-number-one-hundred";

    let (status, logs) = with_log_capture_async(|| async {
        let status = post_login(&state, wrong).await.status();

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .body(Body::from(r#"{"password": 8675309}"#))
            .unwrap();
        let malformed = create_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(malformed.status(), StatusCode::UNAUTHORIZED);

        status
    })
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(logs.contains("Admin login failed"), "Logs:\n{logs}");
    assert_not_in_logs(&logs, wrong, "failed login");
    assert_not_in_logs(&logs, "8675309", "malformed login");
    assert_not_in_logs(&logs, ADMIN_PASSWORD, "failed login");
}

#[tokio::test(flavor = "current_thread")]
async fn logout_audit_line_only_for_real_sessions() {
    let state = AppState::new(Config::new(ADMIN_PASSWORD));
    let token = state.sessions.create_session();

    let ((), logs) = with_log_capture_async(|| async {
        assert_eq!(
            with_bearer(&state, "POST", "/api/auth/logout", &"n".repeat(43)).await,
            StatusCode::OK
        );
    })
    .await;
    assert!(!logs.contains("Admin logged out"), "Logs:\n{logs}");

    let ((), logs) = with_log_capture_async(|| async {
        assert_eq!(
            with_bearer(&state, "POST", "/api/auth/logout", &token).await,
            StatusCode::OK
        );
        assert_eq!(
            with_bearer(&state, "POST", "/api/auth/logout", &token).await,
            StatusCode::OK
        );
    })
    .await;
    assert_eq!(logs.matches("Admin logged out").count(), 1, "Logs:\n{logs}");
    assert_not_in_logs(&logs, &token, "logout");
}
