//! Recurrence rule model -- pure data plus validation.
//!
//! A rule describes how an event repeats: a frequency, an interval, an
//! optional count/until bound, and optional by-day/by-month refinements.
//! Rules are validated before being attached to an event; the expander
//! treats a validated rule as a contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// How often an event repeats.
///
/// `None` means the event does not recur -- exactly one occurrence exists,
/// at the event's anchor start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Day of the week, in iCalendar two-letter form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
    Su,
}

impl Weekday {
    /// Convert to the chrono weekday for calendar arithmetic.
    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Mo => chrono::Weekday::Mon,
            Weekday::Tu => chrono::Weekday::Tue,
            Weekday::We => chrono::Weekday::Wed,
            Weekday::Th => chrono::Weekday::Thu,
            Weekday::Fr => chrono::Weekday::Fri,
            Weekday::Sa => chrono::Weekday::Sat,
            Weekday::Su => chrono::Weekday::Sun,
        }
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Mo,
            chrono::Weekday::Tue => Weekday::Tu,
            chrono::Weekday::Wed => Weekday::We,
            chrono::Weekday::Thu => Weekday::Th,
            chrono::Weekday::Fri => Weekday::Fr,
            chrono::Weekday::Sat => Weekday::Sa,
            chrono::Weekday::Sun => Weekday::Su,
        }
    }
}

/// Declarative description of how an event repeats.
///
/// Invariants (enforced by [`RecurrenceRule::validate`]):
/// - `interval >= 1`
/// - at most one of `count` / `until` is set; both absent means an unbounded
///   recurrence capped by the expansion safety horizon
/// - `frequency = None` implies exactly one occurrence, so `count`, if
///   present, must be 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Step size in units of `frequency`. Defaults to 1.
    pub interval: u32,
    /// Total number of occurrences, including the first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Absolute end time; no occurrence may start after it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    /// Restricts which weekdays are valid within a period.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub by_weekdays: Vec<Weekday>,
    /// Restricts which months (1..=12) are valid within a period.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub by_months: Vec<u32>,
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self {
            frequency: Frequency::None,
            interval: 1,
            count: None,
            until: None,
            by_weekdays: Vec::new(),
            by_months: Vec::new(),
        }
    }
}

impl RecurrenceRule {
    /// A rule that never repeats: the anchor occurrence only.
    pub fn once() -> Self {
        Self::default()
    }

    /// A repeating rule with the given frequency and an interval of 1.
    pub fn every(frequency: Frequency) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    /// Check the rule invariants.
    ///
    /// Runs before a rule is attached to an event. The expander calls this
    /// too, but a failure there is a programming-contract violation rather
    /// than a user error.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRule` when:
    /// - `interval` is 0
    /// - both `count` and `until` are set
    /// - `count` is 0
    /// - `frequency` is `None` with a `count` other than 1
    /// - a `by_months` value is outside 1..=12
    pub fn validate(&self) -> Result<()> {
        if self.interval < 1 {
            return Err(EngineError::InvalidRule(
                "interval must be at least 1".to_string(),
            ));
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(EngineError::InvalidRule(
                "at most one of count and until may be set".to_string(),
            ));
        }
        if self.count == Some(0) {
            return Err(EngineError::InvalidRule(
                "count must be at least 1".to_string(),
            ));
        }
        if self.frequency == Frequency::None {
            if let Some(count) = self.count {
                if count != 1 {
                    return Err(EngineError::InvalidRule(format!(
                        "a non-repeating rule has exactly one occurrence, got count={count}"
                    )));
                }
            }
        }
        if let Some(month) = self.by_months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(EngineError::InvalidRule(format!(
                "by-month value {month} is outside 1..=12"
            )));
        }
        Ok(())
    }

    /// Whether the rule has neither a count nor an until bound.
    pub fn is_unbounded(&self) -> bool {
        self.frequency != Frequency::None && self.count.is_none() && self.until.is_none()
    }
}
