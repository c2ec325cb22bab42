//! Session tokens for the single admin principal.
//!
//! A successful login mints an opaque bearer token that stays valid for a
//! fixed [`session_ttl`] (24 hours). Sessions carry no user identity: holding
//! a live token is the whole of being authenticated.
//!
//! # Architecture
//!
//! - [`SessionStore`] is the raw table mapping token to expiry time.
//! - [`SessionManager`] owns the token-generation and TTL policy and is the
//!   only thing handlers talk to.
//!
//! Both are constructed once at startup and handed to every request through
//! the router state. Nothing here is persisted; a restart logs everyone out.
//!
//! # Expiry policy
//!
//! Validation is compute-on-read: [`SessionManager::validate_session`]
//! compares the stored expiry with the clock every time and never removes
//! anything. An expired entry is harmless because it can never validate
//! again, so it may sit in the table until logout or the optional sweep
//! ([`SessionManager::spawn_sweep_task`]) drops it.
//!
//! # Token Format
//!
//! 32 bytes from the OS-seeded CSPRNG, base64-url encoded without padding:
//! 43 characters from `[A-Za-z0-9_-]`, safe to carry in an `Authorization`
//! header unescaped.
//!
//! # Example
//!
//! ```rust
//! use eventdesk_server::session::SessionManager;
//!
//! let sessions = SessionManager::with_system_clock();
//!
//! let token = sessions.create_session();
//! assert!(sessions.validate_session(&token));
//!
//! sessions.delete_session(&token);
//! assert!(!sessions.validate_session(&token));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};

/// Session lifetime in seconds (24 hours).
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Fixed lifetime of every session, measured from login.
pub fn session_ttl() -> Duration {
    Duration::seconds(SESSION_TTL_SECS)
}

/// Size of the random token in bytes.
const TOKEN_BYTES: usize = 32;

/// Length of a base64-url encoded token.
pub const TOKEN_LENGTH: usize = 43;

// ============================================================================
// Session Store
// ============================================================================

/// Thread-safe in-memory map of session token to expiry time.
///
/// The store has no policy of its own: it does not know about TTLs or
/// clocks beyond what [`purge_expired`](Self::purge_expired) is given.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the expiry for `token`.
    pub fn put(&self, token: String, expires_at: DateTime<Utc>) {
        self.sessions.write().unwrap().insert(token, expires_at);
    }

    /// Returns the expiry recorded for `token`, if any.
    pub fn get(&self, token: &str) -> Option<DateTime<Utc>> {
        self.sessions.read().unwrap().get(token).copied()
    }

    /// Removes `token`. Removing an absent token is a no-op.
    ///
    /// Returns `true` if an entry was present.
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.write().unwrap().remove(token).is_some()
    }

    /// Number of entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }

    /// Drops every entry whose expiry is at or before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let initial_len = sessions.len();
        sessions.retain(|_, expires_at| now < *expires_at);
        initial_len - sessions.len()
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.sessions.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("SessionStore")
            .field("session_count", &len)
            .finish()
    }
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Creates, validates and deletes admin sessions.
///
/// Cheap to clone; clones share the same store and clock.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Creates a manager with an empty store and the given time source.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        debug!(ttl_secs = SESSION_TTL_SECS, "Creating session manager");
        Self {
            store: Arc::new(SessionStore::new()),
            clock,
        }
    }

    /// Creates a manager backed by wall-clock time.
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Mints a new session token valid for [`session_ttl`].
    ///
    /// Each call yields an independent token; existing sessions are left
    /// alone, so concurrent logins never invalidate each other.
    pub fn create_session(&self) -> String {
        let token = generate_session_token();
        let expires_at = self.clock.now() + session_ttl();

        self.store.put(token.clone(), expires_at);
        trace!(expires_at = %expires_at, "Created session");

        token
    }

    /// Returns true iff `token` is known and the clock is before its expiry.
    ///
    /// Expired entries are reported invalid but left in place.
    pub fn validate_session(&self, token: &str) -> bool {
        if token.len() != TOKEN_LENGTH {
            trace!(token_len = token.len(), "Rejected token with unexpected length");
            return false;
        }

        match self.store.get(token) {
            Some(expires_at) => {
                let valid = self.clock.now() < expires_at;
                trace!(valid, "Session looked up");
                valid
            }
            None => {
                trace!("Session token not found");
                false
            }
        }
    }

    /// Forgets `token`. Safe to call on unknown or already-deleted tokens.
    ///
    /// Returns `true` if a stored session was removed.
    pub fn delete_session(&self, token: &str) -> bool {
        let removed = self.store.remove(token);
        if removed {
            trace!("Session removed");
        }
        removed
    }

    /// Number of stored sessions, which may include expired ones.
    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.store.purge_expired(self.clock.now());
        if removed > 0 {
            debug!(
                removed_count = removed,
                remaining_count = self.store.len(),
                "Swept expired sessions"
            );
        }
        removed
    }

    /// Spawns a background task that calls [`sweep_expired`](Self::sweep_expired)
    /// every `interval`.
    ///
    /// Validation never depends on this task; it only bounds memory.
    ///
    /// A zero `interval` disables the sweep: the returned task exits
    /// immediately.
    pub fn spawn_sweep_task(&self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let sessions = self.clone();

        if interval.is_zero() {
            warn!("Session sweep requested with a zero interval; not sweeping");
            return tokio::spawn(async {});
        }

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                sessions.sweep_expired();
            }
        })
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.store)
            .field("now", &self.clock.now())
            .finish()
    }
}

/// Generates a cryptographically secure session token.
fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
