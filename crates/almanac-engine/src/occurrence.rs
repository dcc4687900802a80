//! Event and occurrence types.
//!
//! Virtual and persisted occurrences are deliberately two distinct types.
//! A [`VirtualOccurrence`] is computed on the fly by the expander and never
//! has an identity; an [`Occurrence`] is the persisted exception record that
//! overrides exactly one virtual slot. The reconciler merges the two into
//! [`ResolvedOccurrence`], the engine's only output shape.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::RecurrenceRule;

/// A calendar event: anchor start/end plus its recurrence rule.
///
/// The duration (`end - start`) is held constant across occurrences. The
/// rule is owned 1:1 and replaced atomically on edit; replacing it never
/// cascades deletion of existing exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub calendar_id: Uuid,
    /// Opaque to the engine.
    #[serde(default)]
    pub title: String,
    /// Opaque to the engine.
    #[serde(default)]
    pub description: String,
    /// Anchor start: the first occurrence per the rule.
    pub start: DateTime<Utc>,
    /// Anchor end; `end - start` is the duration of every occurrence.
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub rule: RecurrenceRule,
}

impl Event {
    /// Duration applied to every occurrence of this event.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// A computed-but-unpersisted instance of a recurring event.
///
/// Exists only transiently; produced by the expander, consumed by the
/// reconciler. Never has a primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualOccurrence {
    pub event_id: Uuid,
    /// The time this instance occurs per the rule at computation time.
    pub original_start: DateTime<Utc>,
    pub original_end: DateTime<Utc>,
    /// Index within the expansion, counted from the anchor.
    pub sequence: usize,
}

/// A persisted exception: overrides one virtual slot of its event.
///
/// `(event_id, original_start)` is unique -- at most one exception per slot.
/// `id` and `original_start`/`original_end` never change once persisted;
/// `start`, `end` and `cancelled` may be updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Snapshot of the event's title at creation; editable per occurrence.
    #[serde(default)]
    pub title: String,
    /// Snapshot of the event's description at creation; editable per
    /// occurrence.
    #[serde(default)]
    pub description: String,
    /// Immutable key: the scheduled slot this exception replaces.
    pub original_start: DateTime<Utc>,
    pub original_end: DateTime<Utc>,
    /// Current start, possibly diverging from `original_start`.
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Soft-delete flag; cancelled occurrences stay stored.
    #[serde(default)]
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl Occurrence {
    /// Promote a virtual slot to a persisted exception, initially identical
    /// to the virtual values, with title/description snapshotted from the
    /// event. This is the only constructor; every exception starts life as a
    /// copy of the slot it replaces.
    pub fn from_virtual(event: &Event, virt: &VirtualOccurrence, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id: virt.event_id,
            title: event.title.clone(),
            description: event.description.clone(),
            original_start: virt.original_start,
            original_end: virt.original_end,
            start: virt.original_start,
            end: virt.original_end,
            cancelled: false,
            created_at,
        }
    }
}

/// One entry in the reconciled occurrence timeline -- either a virtual
/// instance or a persisted exception, flattened to a single shape with
/// explicit flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOccurrence {
    pub event_id: Uuid,
    /// The exception's title when one overrides this slot, else the
    /// event's.
    pub title: String,
    pub description: String,
    /// The slot this entry corresponds to under the rule (or under a past
    /// version of the rule, for historical exceptions).
    pub original_start: DateTime<Utc>,
    /// Effective start: the exception's start if one exists, else the
    /// virtual `original_start`.
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cancelled: bool,
    /// True when a persisted exception overrides this slot.
    pub is_exception: bool,
    /// True when the exception's original slot is no longer generated by the
    /// current rule, yet the record is retained for auditability.
    pub is_historical: bool,
}

impl ResolvedOccurrence {
    pub(crate) fn from_virtual(event: &Event, virt: &VirtualOccurrence) -> Self {
        Self {
            event_id: virt.event_id,
            title: event.title.clone(),
            description: event.description.clone(),
            original_start: virt.original_start,
            start: virt.original_start,
            end: virt.original_end,
            cancelled: false,
            is_exception: false,
            is_historical: false,
        }
    }

    pub(crate) fn from_exception(exc: &Occurrence, is_historical: bool) -> Self {
        Self {
            event_id: exc.event_id,
            title: exc.title.clone(),
            description: exc.description.clone(),
            original_start: exc.original_start,
            start: exc.start,
            end: exc.end,
            cancelled: exc.cancelled,
            is_exception: true,
            is_historical,
        }
    }
}
