//! Period-based queries across calendars: one merged, ordered timeline.
//!
//! Translates a requested period (day/week/month/custom) into absolute
//! window boundaries, runs expand + reconcile for every event in the
//! requested calendars, and merges the results.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::occurrence::ResolvedOccurrence;
use crate::reconcile::{occurrences_between, sort_timeline, ReconcileOptions};
use crate::store::{EventSource, OccurrenceStore};

/// The requested period kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodKind {
    Day,
    Week,
    Month,
    Year,
    Custom,
}

/// A query for the merged occurrence timeline of a set of calendars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingRequest {
    pub calendars: Vec<Uuid>,
    pub period: PeriodKind,
    /// The date the period is derived from (ignored for `Custom`).
    pub anchor_date: NaiveDate,
    /// Timezone in which day/week/month boundaries are computed.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// Explicit range, required when `period` is `Custom`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_end: Option<DateTime<Utc>>,
}

fn default_timezone() -> Tz {
    Tz::UTC
}

impl UpcomingRequest {
    /// Resolve the request to absolute window bounds.
    ///
    /// Day: local midnight up to (but excluding) the next. Week: Sunday
    /// 00:00 up to the next Sunday. Month: first of the month up to the
    /// first of the next. Year: Jan 1 up to the next Jan 1. The expander
    /// treats the window end as inclusive,
    /// so derived windows end one microsecond before the boundary midnight
    /// -- an occurrence landing exactly on the boundary belongs to the next
    /// period.
    ///
    /// # Errors
    /// `EngineError::InvalidWindow` for a `Custom` period with a missing
    /// range or `start >= end`.
    pub fn window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        match self.period {
            PeriodKind::Day => {
                let start = self.anchor_date;
                let end = start + TimeDelta::days(1);
                Ok((
                    local_midnight(start, self.timezone),
                    before_midnight(end, self.timezone),
                ))
            }
            PeriodKind::Week => {
                let back = i64::from(self.anchor_date.weekday().num_days_from_sunday());
                let sunday = self.anchor_date - TimeDelta::days(back);
                Ok((
                    local_midnight(sunday, self.timezone),
                    before_midnight(sunday + TimeDelta::days(7), self.timezone),
                ))
            }
            PeriodKind::Month => {
                let first = self
                    .anchor_date
                    .with_day(1)
                    .unwrap_or(self.anchor_date);
                let next_first = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                }
                .unwrap_or(first);
                Ok((
                    local_midnight(first, self.timezone),
                    before_midnight(next_first, self.timezone),
                ))
            }
            PeriodKind::Year => {
                let jan_first = NaiveDate::from_ymd_opt(self.anchor_date.year(), 1, 1)
                    .unwrap_or(self.anchor_date);
                let next_jan_first = NaiveDate::from_ymd_opt(self.anchor_date.year() + 1, 1, 1)
                    .unwrap_or(jan_first);
                Ok((
                    local_midnight(jan_first, self.timezone),
                    before_midnight(next_jan_first, self.timezone),
                ))
            }
            PeriodKind::Custom => {
                let (Some(start), Some(end)) = (self.custom_start, self.custom_end) else {
                    return Err(EngineError::InvalidWindow(
                        "a custom period requires an explicit start and end".to_string(),
                    ));
                };
                if start >= end {
                    return Err(EngineError::InvalidWindow(format!(
                        "custom range start {start} is not before end {end}"
                    )));
                }
                Ok((start, end))
            }
        }
    }
}

/// Compute the merged occurrence timeline for the requested calendars and
/// period. Ordered by effective start, stable tie-break by event id then
/// original start.
///
/// # Errors
/// - `EngineError::InvalidWindow` for a malformed custom range.
/// - `EngineError::InvalidRule` if a stored event carries an invalid rule
///   (contract violation).
pub fn upcoming<S>(
    store: &S,
    request: &UpcomingRequest,
    options: &ReconcileOptions,
) -> Result<Vec<ResolvedOccurrence>>
where
    S: EventSource + OccurrenceStore,
{
    let (window_start, window_end) = request.window()?;

    let mut timeline = Vec::new();
    for event in store.events_in(&request.calendars) {
        let exceptions = store.exceptions_for(event.id);
        timeline.extend(occurrences_between(
            &event,
            &exceptions,
            window_start,
            window_end,
            options,
        )?);
    }
    sort_timeline(&mut timeline);
    Ok(timeline)
}

/// One microsecond before local midnight of `date` in `tz`, as UTC.
fn before_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_midnight(date, tz) - TimeDelta::microseconds(1)
}

/// Local midnight of `date` in `tz`, as UTC. When a DST gap swallows
/// midnight, the first valid time after it is used.
fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let mut naive = date.and_time(NaiveTime::MIN);
    for _ in 0..4 {
        match tz.from_local_datetime(&naive) {
            chrono::LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            chrono::LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            chrono::LocalResult::None => naive += TimeDelta::hours(1),
        }
    }
    // Unreachable for real timezones; fall back to treating the naive
    // value as UTC.
    DateTime::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc)
}
