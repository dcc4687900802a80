//! Lazy expansion of a recurrence rule into virtual occurrence instances.
//!
//! [`Expander`] walks forward from the event's anchor start in steps of
//! `interval` units of the rule's frequency, applying by-day/by-month
//! filters, and yields the instances that intersect the requested window.
//! Expansion is a pure function of (event, rule, window): re-running it with
//! identical inputs yields an identical sequence.
//!
//! ## Calendar math
//!
//! Monthly and yearly stepping that lands on a nonexistent day-of-month
//! clamps to the last valid day of that month, deterministically: an anchor
//! on Jan 31 recurs on Feb 28 (29 in leap years) and again on Mar 31 -- the
//! anchor's day-of-month is remembered, not lost to the clamp. A Feb 29
//! yearly anchor recurs on Feb 28 in common years.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::occurrence::{Event, VirtualOccurrence};
use crate::rule::{Frequency, RecurrenceRule, Weekday};

/// Default lookahead span past the anchor for unbounded rules.
pub const DEFAULT_HORIZON_DAYS: i64 = 3653; // ten years

/// Default cap on instances admitted in a single expansion.
pub const DEFAULT_MAX_INSTANCES: usize = 10_000;

/// Hard cap on candidates examined per expansion, counting filtered-out
/// steps. Guarantees termination even when a filter never matches.
const MAX_CANDIDATE_SCAN: usize = 100_000;

/// Bounds on a single expansion run.
#[derive(Debug, Clone)]
pub struct ExpandOptions {
    /// Safety horizon: unbounded rules stop once a candidate lies further
    /// than this past the anchor.
    pub horizon: TimeDelta,
    /// Maximum instances admitted per expansion, bounded or not.
    pub max_instances: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            horizon: TimeDelta::days(DEFAULT_HORIZON_DAYS),
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }
}

/// The outcome of a bounded expansion.
///
/// `truncated` is the surfaced form of the internal safety-horizon signal:
/// the result is successful but incomplete because the horizon or instance
/// cap was hit. It is never an error.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub instances: Vec<VirtualOccurrence>,
    pub truncated: bool,
}

/// Expand an event's rule over `[window_start, window_end]`.
///
/// Instances are ordered by `original_start` ascending. An occurrence that
/// starts before the window but ends inside it is included; instances
/// admitted before the window still count toward the rule's `count`.
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the rule fails validation. This is
/// a contract violation -- rules are validated when attached to an event --
/// not a runtime user error.
pub fn expand(
    event: &Event,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<VirtualOccurrence>> {
    let expansion = expand_with_options(event, window_start, window_end, &ExpandOptions::default())?;
    Ok(expansion.instances)
}

/// Expand with explicit bounds, reporting whether the result was truncated
/// by the safety horizon or the instance cap.
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the rule fails validation.
pub fn expand_with_options(
    event: &Event,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    options: &ExpandOptions,
) -> Result<Expansion> {
    let mut expander = Expander::new(event, window_start, window_end, options)?;
    let instances: Vec<VirtualOccurrence> = expander.by_ref().collect();
    Ok(Expansion {
        instances,
        truncated: expander.truncated(),
    })
}

/// Find the virtual slot at exactly `at`, if the rule produces one.
///
/// Used by the mutation service to check that an edit targets a slot that
/// logically exists. Scans lazily from the anchor up to `at` (or the safety
/// horizon, whichever comes first).
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the rule fails validation.
pub fn slot_at(
    event: &Event,
    at: DateTime<Utc>,
    options: &ExpandOptions,
) -> Result<Option<VirtualOccurrence>> {
    let mut expander = Expander::new(event, at, at, options)?;
    Ok(expander.find(|virt| virt.original_start == at))
}

/// Lazy, ordered, restartable iterator over the virtual occurrences of one
/// event within a window.
#[derive(Debug)]
pub struct Expander {
    event_id: Uuid,
    anchor: DateTime<Utc>,
    duration: TimeDelta,
    rule: RecurrenceRule,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    horizon_end: DateTime<Utc>,
    max_instances: usize,

    cursor: Cursor,
    /// Occurrences admitted since the anchor, window-independent.
    admitted: usize,
    /// Candidates examined, including filtered-out ones.
    scanned: usize,
    truncated: bool,
    done: bool,
}

/// Position within the candidate stream.
#[derive(Debug)]
enum Cursor {
    /// `Frequency::None`: the anchor, then nothing.
    Single { emitted: bool },
    /// Daily/weekly-without-byday stepping: anchor + step_index * span.
    Linear { step_index: i64, span_days: i64 },
    /// Weekly with by-day refinements: (week, position in the sorted
    /// day-offset list). Weeks start on Monday.
    WeeklyByDay {
        week_monday: NaiveDate,
        week_index: i64,
        position: usize,
        offsets: Vec<i64>,
    },
    /// Monthly stepping over a zero-based month counter from year 0.
    Monthly { month_index: i64 },
    /// Yearly stepping.
    Yearly { year_offset: i64 },
}

impl Expander {
    /// Build an expander for `event` over `[window_start, window_end]`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRule` if the rule fails validation.
    pub fn new(
        event: &Event,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        options: &ExpandOptions,
    ) -> Result<Self> {
        event.rule.validate()?;

        let anchor = event.start;
        let interval = i64::from(event.rule.interval);
        let cursor = match event.rule.frequency {
            Frequency::None => Cursor::Single { emitted: false },
            Frequency::Daily => Cursor::Linear {
                step_index: 0,
                span_days: interval,
            },
            Frequency::Weekly if event.rule.by_weekdays.is_empty() => Cursor::Linear {
                step_index: 0,
                span_days: 7 * interval,
            },
            Frequency::Weekly => {
                let mut offsets: Vec<i64> = event
                    .rule
                    .by_weekdays
                    .iter()
                    .map(|wd| i64::from(wd.to_chrono().num_days_from_monday()))
                    .collect();
                offsets.sort_unstable();
                offsets.dedup();
                let week_monday = anchor.date_naive()
                    - TimeDelta::days(i64::from(anchor.weekday().num_days_from_monday()));
                Cursor::WeeklyByDay {
                    week_monday,
                    week_index: 0,
                    position: 0,
                    offsets,
                }
            }
            Frequency::Monthly => Cursor::Monthly { month_index: 0 },
            Frequency::Yearly => Cursor::Yearly { year_offset: 0 },
        };

        Ok(Self {
            event_id: event.id,
            anchor,
            duration: event.duration(),
            rule: event.rule.clone(),
            window_start,
            window_end,
            horizon_end: anchor + options.horizon,
            max_instances: options.max_instances,
            cursor,
            admitted: 0,
            scanned: 0,
            truncated: false,
            done: false,
        })
    }

    /// Whether iteration stopped at the safety horizon or instance cap
    /// rather than at a rule or window bound.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Produce the next raw candidate start time and advance the cursor.
    /// Candidates are strictly ascending. `None` means the stream itself is
    /// finite and exhausted (only the `Frequency::None` case).
    fn next_candidate(&mut self) -> Option<DateTime<Utc>> {
        let anchor = self.anchor;
        let interval = i64::from(self.rule.interval);
        match &mut self.cursor {
            Cursor::Single { emitted } => {
                if *emitted {
                    None
                } else {
                    *emitted = true;
                    Some(anchor)
                }
            }
            Cursor::Linear {
                step_index,
                span_days,
            } => {
                let candidate = anchor + TimeDelta::days(*step_index * *span_days);
                *step_index += 1;
                Some(candidate)
            }
            Cursor::WeeklyByDay {
                week_monday,
                week_index,
                position,
                offsets,
            } => {
                loop {
                    if *position >= offsets.len() {
                        *week_index += 1;
                        *position = 0;
                    }
                    let monday = *week_monday + TimeDelta::days(7 * interval * *week_index);
                    let date = monday + TimeDelta::days(offsets[*position]);
                    *position += 1;
                    let candidate = at_anchor_time(date, anchor);
                    // Days in the anchor week that precede the anchor are
                    // not part of the recurrence.
                    if candidate >= anchor {
                        return Some(candidate);
                    }
                }
            }
            Cursor::Monthly { month_index } => {
                let months_from_anchor = *month_index * interval;
                *month_index += 1;
                let total = i64::from(anchor.year()) * 12
                    + i64::from(anchor.month0())
                    + months_from_anchor;
                let year = i32::try_from(total.div_euclid(12)).ok()?;
                let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
                let date = clamped_date(year, month, anchor.day());
                Some(at_anchor_time(date, anchor))
            }
            Cursor::Yearly { year_offset } => {
                let year = i64::from(anchor.year()) + *year_offset * interval;
                *year_offset += 1;
                let year = i32::try_from(year).ok()?;
                let date = clamped_date(year, anchor.month(), anchor.day());
                Some(at_anchor_time(date, anchor))
            }
        }
    }

    /// Apply by-day/by-month filters. A skipped candidate is not an
    /// occurrence and does not count toward the rule's `count`.
    fn admits(&self, candidate: DateTime<Utc>) -> bool {
        if !self.rule.by_months.is_empty() && !self.rule.by_months.contains(&candidate.month()) {
            return false;
        }
        // Weekly by-day is structural (the cursor only produces listed
        // days); for other frequencies it filters.
        if !matches!(self.cursor, Cursor::WeeklyByDay { .. })
            && !self.rule.by_weekdays.is_empty()
            && !self
                .rule
                .by_weekdays
                .contains(&Weekday::from_chrono(candidate.weekday()))
        {
            return false;
        }
        true
    }
}

impl Iterator for Expander {
    type Item = VirtualOccurrence;

    fn next(&mut self) -> Option<VirtualOccurrence> {
        if self.done {
            return None;
        }
        loop {
            if let Some(count) = self.rule.count {
                if self.admitted >= count as usize {
                    self.done = true;
                    return None;
                }
            }
            if self.admitted >= self.max_instances || self.scanned >= MAX_CANDIDATE_SCAN {
                self.truncated = true;
                self.done = true;
                return None;
            }

            let Some(candidate) = self.next_candidate() else {
                self.done = true;
                return None;
            };
            self.scanned += 1;

            if let Some(until) = self.rule.until {
                if candidate > until {
                    self.done = true;
                    return None;
                }
            }
            if self.rule.is_unbounded() && candidate > self.horizon_end {
                self.truncated = true;
                self.done = true;
                return None;
            }
            if candidate > self.window_end {
                // Candidates are ascending; nothing later can intersect.
                self.done = true;
                return None;
            }
            if !self.admits(candidate) {
                continue;
            }

            let sequence = self.admitted;
            self.admitted += 1;

            let original_end = candidate + self.duration;
            if original_end < self.window_start {
                // Before the window: counted toward `count`, not emitted.
                continue;
            }
            return Some(VirtualOccurrence {
                event_id: self.event_id,
                original_start: candidate,
                original_end,
                sequence,
            });
        }
    }
}

/// Combine a date with the anchor's time of day, in UTC.
fn at_anchor_time(date: NaiveDate, anchor: DateTime<Utc>) -> DateTime<Utc> {
    let time = anchor.time();
    DateTime::from_naive_utc_and_offset(date.and_time(time), Utc)
}

/// The date (year, month, day), with `day` clamped to the last valid day of
/// that month when it does not exist (Jan 31 -> Feb 28/29).
fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| {
        let last = last_day_of_month(year, month);
        // `last` is always a valid day of (year, month).
        NaiveDate::from_ymd_opt(year, month, last)
            .unwrap_or(NaiveDate::MAX)
    })
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    // Day 0 of the next month is the last day of this month.
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .map_or(31, |first| first.pred_opt().map_or(31, |d| d.day()))
}
