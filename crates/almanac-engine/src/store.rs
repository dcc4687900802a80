//! Store seams for the external collaborators.
//!
//! The engine itself is pure; persistence is behind two narrow traits. The
//! transport layer wires them to the real database. [`InMemoryStore`] is the
//! reference implementation used by the CLI dataset and the test suite.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::occurrence::{Event, Occurrence};

/// Calendar-scoped event lookup.
pub trait EventSource {
    fn event(&self, id: Uuid) -> Option<Event>;

    /// All events belonging to any of the given calendars.
    fn events_in(&self, calendars: &[Uuid]) -> Vec<Event>;
}

/// Persisted-exception lookup and the single write path.
///
/// Implementations must make `upsert` atomic per `(event_id,
/// original_start)` -- read current state, decide create-vs-update, write,
/// all under the backing store's transaction isolation -- so the
/// one-exception-per-slot invariant holds under concurrent mutations.
pub trait OccurrenceStore {
    fn find(&self, event_id: Uuid, original_start: DateTime<Utc>) -> Option<Occurrence>;

    fn exceptions_for(&self, event_id: Uuid) -> Vec<Occurrence>;

    /// Create or replace the exception at `(occurrence.event_id,
    /// occurrence.original_start)`.
    ///
    /// # Errors
    /// Returns `EngineError::Conflict` when a uniqueness race is detected at
    /// commit time.
    fn upsert(&mut self, occurrence: Occurrence) -> Result<Occurrence>;
}

/// A calendar in the grouping sense: events reference it by id. CRUD on
/// calendars is out of engine scope; the type exists so datasets are
/// self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: String,
    /// IANA timezone used for day/week/month window boundaries.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Serde-loadable store holding calendars, events and exceptions in memory.
///
/// Single-writer: callers serialize mutations themselves. Suitable for the
/// CLI and tests, not for concurrent serving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InMemoryStore {
    pub calendars: Vec<Calendar>,
    pub events: Vec<Event>,
    pub occurrences: Vec<Occurrence>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSource for InMemoryStore {
    fn event(&self, id: Uuid) -> Option<Event> {
        self.events.iter().find(|ev| ev.id == id).cloned()
    }

    fn events_in(&self, calendars: &[Uuid]) -> Vec<Event> {
        self.events
            .iter()
            .filter(|ev| calendars.contains(&ev.calendar_id))
            .cloned()
            .collect()
    }
}

impl OccurrenceStore for InMemoryStore {
    fn find(&self, event_id: Uuid, original_start: DateTime<Utc>) -> Option<Occurrence> {
        self.occurrences
            .iter()
            .find(|occ| occ.event_id == event_id && occ.original_start == original_start)
            .cloned()
    }

    fn exceptions_for(&self, event_id: Uuid) -> Vec<Occurrence> {
        self.occurrences
            .iter()
            .filter(|occ| occ.event_id == event_id)
            .cloned()
            .collect()
    }

    fn upsert(&mut self, occurrence: Occurrence) -> Result<Occurrence> {
        if let Some(existing) = self
            .occurrences
            .iter_mut()
            .find(|occ| {
                occ.event_id == occurrence.event_id
                    && occ.original_start == occurrence.original_start
            })
        {
            if existing.id != occurrence.id {
                return Err(EngineError::Conflict(format!(
                    "slot {} of event {} is already claimed by occurrence {}",
                    occurrence.original_start, occurrence.event_id, existing.id
                )));
            }
            *existing = occurrence.clone();
            return Ok(occurrence);
        }
        self.occurrences.push(occurrence.clone());
        Ok(occurrence)
    }
}
