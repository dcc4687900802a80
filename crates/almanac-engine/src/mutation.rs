//! The only path by which a virtual occurrence becomes a persisted
//! exception.
//!
//! An edit targets the *original scheduled start* of a virtual instance.
//! The first edit at a slot creates the exception, copying the virtual
//! start/end as immutable anchors; later edits update the stored record in
//! place. All reads elsewhere in the engine are computed on the fly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::expander::{slot_at, ExpandOptions};
use crate::occurrence::{Event, Occurrence};
use crate::store::OccurrenceStore;

/// An edit against one occurrence slot. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OccurrenceChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
    /// Retitle just this occurrence; the event's own title is untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OccurrenceChanges {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.cancelled.is_none()
            && self.title.is_none()
            && self.description.is_none()
    }
}

/// Apply `changes` to the occurrence of `event` at `original_start`,
/// creating the exception record on first edit.
///
/// The target slot must either be produced by the current rule or already
/// have a stored exception (a slot edited under an earlier rule remains
/// editable after the rule changed).
///
/// # Errors
/// - `EngineError::NotFound` when `original_start` matches neither the
///   expansion nor a stored exception.
/// - `EngineError::Conflict` when the resulting end is not after the start,
///   or the store detects a uniqueness race at commit.
/// - `EngineError::InvalidRule` when the event carries an invalid rule
///   (contract violation; rules are validated at write time).
pub fn mutate<S: OccurrenceStore>(
    event: &Event,
    original_start: DateTime<Utc>,
    changes: &OccurrenceChanges,
    store: &mut S,
) -> Result<Occurrence> {
    mutate_at(event, original_start, changes, store, Utc::now())
}

/// [`mutate`] with an explicit clock, for deterministic `created_at` in
/// tests and replays.
pub fn mutate_at<S: OccurrenceStore>(
    event: &Event,
    original_start: DateTime<Utc>,
    changes: &OccurrenceChanges,
    store: &mut S,
    now: DateTime<Utc>,
) -> Result<Occurrence> {
    let mut occurrence = match store.find(event.id, original_start) {
        Some(existing) => existing,
        None => {
            let Some(virt) = slot_at(event, original_start, &ExpandOptions::default())? else {
                return Err(EngineError::NotFound {
                    event_id: event.id,
                    original_start,
                });
            };
            Occurrence::from_virtual(event, &virt, now)
        }
    };

    if let Some(start) = changes.start {
        // A moved start keeps the current duration unless the edit also
        // sets an explicit end.
        let duration = occurrence.end - occurrence.start;
        occurrence.start = start;
        if changes.end.is_none() {
            occurrence.end = start + duration;
        }
    }
    if let Some(end) = changes.end {
        occurrence.end = end;
    }
    if let Some(cancelled) = changes.cancelled {
        occurrence.cancelled = cancelled;
    }
    if let Some(title) = &changes.title {
        occurrence.title = title.clone();
    }
    if let Some(description) = &changes.description {
        occurrence.description = description.clone();
    }

    if occurrence.end <= occurrence.start {
        return Err(EngineError::Conflict(format!(
            "occurrence end {} is not after start {}",
            occurrence.end, occurrence.start
        )));
    }

    store.upsert(occurrence)
}
