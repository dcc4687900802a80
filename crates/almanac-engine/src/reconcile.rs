//! Merge virtual occurrences with persisted exceptions.
//!
//! An exception overrides the virtual instance at its `original_start` slot.
//! Exceptions whose slot is no longer generated by the current rule (the
//! rule changed after the edit) are retained and flagged historical rather
//! than silently dropped: "is this slot still generated by the rule" is
//! decoupled from "was this slot ever promised to the user".

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::expander::{expand_with_options, ExpandOptions};
use crate::occurrence::{Event, Occurrence, ResolvedOccurrence, VirtualOccurrence};

/// Caller knobs for reconciliation.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Emit cancelled occurrences instead of omitting them.
    pub include_cancelled: bool,
}

/// Merge a window's virtual instances with the event's persisted exceptions
/// into one ordered timeline.
///
/// - A virtual instance whose slot has an exception takes the exception's
///   current start/end/cancelled/title/description, with `is_exception`
///   set; unclaimed virtuals carry the event's title and description.
/// - Cancelled entries are omitted unless `options.include_cancelled`.
/// - Exceptions unclaimed by any virtual slot are emitted as historical
///   when they fall inside the window by wall-clock comparison alone --
///   either their current `[start, end)` intersects it or their
///   `original_start` lies inside it.
/// - `is_historical` is window-relative: it marks "unclaimed by this
///   window's expansion". A slot the current rule still generates is
///   flagged historical too when the window excludes its original start
///   (an occurrence moved far from its slot, viewed through a window
///   around its new start). Callers needing "orphaned by a rule change"
///   specifically must expand a window covering the original start.
/// - Output is sorted by effective start, ties broken by event id then
///   `original_start`.
///
/// Reconciliation is idempotent: the same inputs always produce the same
/// timeline.
pub fn reconcile(
    event: &Event,
    virtuals: &[VirtualOccurrence],
    exceptions: &[Occurrence],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    options: &ReconcileOptions,
) -> Vec<ResolvedOccurrence> {
    let by_slot: HashMap<(Uuid, DateTime<Utc>), &Occurrence> = exceptions
        .iter()
        .map(|exc| ((exc.event_id, exc.original_start), exc))
        .collect();

    let mut resolved = Vec::with_capacity(virtuals.len());
    let mut claimed: HashSet<(Uuid, DateTime<Utc>)> = HashSet::new();

    for virt in virtuals {
        let slot = (virt.event_id, virt.original_start);
        if let Some(exc) = by_slot.get(&slot) {
            claimed.insert(slot);
            if exc.cancelled && !options.include_cancelled {
                continue;
            }
            resolved.push(ResolvedOccurrence::from_exception(exc, false));
        } else {
            resolved.push(ResolvedOccurrence::from_virtual(event, virt));
        }
    }

    // Exceptions the current rule no longer generates. Never dropped; the
    // edit was promised to the user under an earlier rule.
    for exc in exceptions {
        let slot = (exc.event_id, exc.original_start);
        if claimed.contains(&slot) {
            continue;
        }
        let current_intersects = exc.start < window_end && exc.end > window_start;
        let original_inside = exc.original_start >= window_start && exc.original_start <= window_end;
        if !current_intersects && !original_inside {
            continue;
        }
        if exc.cancelled && !options.include_cancelled {
            continue;
        }
        resolved.push(ResolvedOccurrence::from_exception(exc, true));
    }

    sort_timeline(&mut resolved);
    resolved
}

/// Expand an event's rule over the window and reconcile with its persisted
/// exceptions: the composition behind `GET occurrences`.
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the event's rule fails validation.
pub fn occurrences_between(
    event: &Event,
    exceptions: &[Occurrence],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    options: &ReconcileOptions,
) -> Result<Vec<ResolvedOccurrence>> {
    let expansion =
        expand_with_options(event, window_start, window_end, &ExpandOptions::default())?;
    Ok(reconcile(
        event,
        &expansion.instances,
        exceptions,
        window_start,
        window_end,
        options,
    ))
}

/// Sort by effective start, stable tie-break by event id then original
/// start. Shared with the upcoming query's cross-event merge.
pub(crate) fn sort_timeline(timeline: &mut [ResolvedOccurrence]) {
    timeline.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.event_id.cmp(&b.event_id))
            .then_with(|| a.original_start.cmp(&b.original_start))
    });
}
