//! Event listings and their in-memory repository.
//!
//! Events are the resource the admin session protects: anyone may read them,
//! only an authenticated admin may create, update or delete them.
//!
//! The repository keeps everything in memory, so listings share the session
//! store's lifetime and vanish on restart.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServerError;

/// Longest accepted title, in characters.
const MAX_TITLE_CHARS: usize = 200;

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub max_participants: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing an event.
///
/// Everything is optional at the wire level so that a body with missing
/// fields reaches [`EventInput::validate`] and produces a 400 with a
/// readable message instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub max_participants: Option<u32>,
}

/// A validated event, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub max_participants: Option<u32>,
}

impl EventInput {
    /// Checks required fields and normalizes optional ones.
    ///
    /// Blank optional strings are stored as `None`.
    ///
    /// # Errors
    ///
    /// [`ServerError::Validation`] when the title is blank or too long, the
    /// date is missing or not RFC 3339, the end date precedes the start, or
    /// `max_participants` is zero.
    pub fn validate(self) -> Result<NewEvent, ServerError> {
        let title = non_blank(self.title).ok_or_else(|| ServerError::validation("title is required"))?;
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ServerError::validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }

        let date = non_blank(self.date).ok_or_else(|| ServerError::validation("date is required"))?;
        let date = parse_timestamp("date", &date)?;

        let end_date = non_blank(self.end_date)
            .map(|raw| parse_timestamp("end_date", &raw))
            .transpose()?;
        if matches!(end_date, Some(end) if end < date) {
            return Err(ServerError::validation("end_date must not be before date"));
        }

        if self.max_participants == Some(0) {
            return Err(ServerError::validation(
                "max_participants must be greater than zero",
            ));
        }

        Ok(NewEvent {
            title,
            description: non_blank(self.description),
            date,
            end_date,
            location: non_blank(self.location),
            image_url: non_blank(self.image_url),
            max_participants: self.max_participants,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ServerError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ServerError::validation(format!("{field} must be an RFC 3339 timestamp")))
}

// ============================================================================
// Repository
// ============================================================================

#[derive(Default)]
struct RepositoryInner {
    events: BTreeMap<i64, Event>,
    next_id: i64,
}

/// Thread-safe in-memory event storage.
///
/// Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct EventRepository {
    inner: Arc<RwLock<RepositoryInner>>,
}

impl EventRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists events ordered by start date.
    ///
    /// Past events (starting before `now`) are skipped unless `include_past`.
    pub fn list(&self, include_past: bool, now: DateTime<Utc>) -> Vec<Event> {
        let inner = self.inner.read().unwrap();
        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|event| include_past || event.date >= now)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        events
    }

    pub fn get(&self, id: i64) -> Option<Event> {
        self.inner.read().unwrap().events.get(&id).cloned()
    }

    /// Stores a new event and returns it with its assigned id.
    pub fn create(&self, new: NewEvent, now: DateTime<Utc>) -> Event {
        let mut inner = self.inner.write().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;

        let event = Event {
            id,
            title: new.title,
            description: new.description,
            date: new.date,
            end_date: new.end_date,
            location: new.location,
            image_url: new.image_url,
            max_participants: new.max_participants,
            created_at: now,
            updated_at: now,
        };
        inner.events.insert(id, event.clone());
        debug!(event_id = id, "Stored event");

        event
    }

    /// Replaces the fields of an existing event, keeping `id` and `created_at`.
    ///
    /// Returns `None` if there is no such event.
    pub fn update(&self, id: i64, new: NewEvent, now: DateTime<Utc>) -> Option<Event> {
        let mut inner = self.inner.write().unwrap();
        let event = inner.events.get_mut(&id)?;

        event.title = new.title;
        event.description = new.description;
        event.date = new.date;
        event.end_date = new.end_date;
        event.location = new.location;
        event.image_url = new.image_url;
        event.max_participants = new.max_participants;
        event.updated_at = now;
        debug!(event_id = id, "Replaced event");

        Some(event.clone())
    }

    /// Removes an event. Returns `true` if it existed.
    pub fn delete(&self, id: i64) -> bool {
        let removed = self.inner.write().unwrap().events.remove(&id).is_some();
        if removed {
            debug!(event_id = id, "Removed event");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.inner.read().map(|i| i.events.len()).unwrap_or(0);
        f.debug_struct("EventRepository")
            .field("event_count", &len)
            .finish()
    }
}
