//! Tests for rule expansion: frequencies, bounds, filters, and the
//! calendar-math edge cases (month-end clamping, leap years).

use almanac_engine::{
    expand, expand_with_options, Event, ExpandOptions, Frequency, RecurrenceRule, Weekday,
};
use chrono::{TimeDelta, TimeZone, Utc};
use uuid::Uuid;

fn event_with_rule(
    start: chrono::DateTime<Utc>,
    duration_minutes: i64,
    rule: RecurrenceRule,
) -> Event {
    Event {
        id: Uuid::new_v4(),
        calendar_id: Uuid::new_v4(),
        title: "test event".to_string(),
        description: String::new(),
        start,
        end: start + TimeDelta::minutes(duration_minutes),
        rule,
    }
}

// ---------------------------------------------------------------------------
// Baseline scenario: DAILY, count=5
// ---------------------------------------------------------------------------

#[test]
fn daily_count_five_within_window() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        60,
        RecurrenceRule {
            count: Some(5),
            ..RecurrenceRule::every(Frequency::Daily)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert_eq!(result.len(), 5, "count=5 should produce 5 instances");
    for (i, virt) in result.iter().enumerate() {
        let day = 1 + i as u32;
        assert_eq!(
            virt.original_start,
            Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
            "instance {} should fall on Jan {} at 09:00",
            i,
            day
        );
        assert_eq!(virt.sequence, i);
    }
}

#[test]
fn count_tracks_occurrences_since_anchor_not_in_window() {
    // Same rule, but the window starts at Jan 4: only instances 4 and 5 are
    // emitted -- the counter still runs from the anchor, so nothing appears
    // on Jan 6+.
    let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        60,
        RecurrenceRule {
            count: Some(5),
            ..RecurrenceRule::every(Frequency::Daily)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert_eq!(result.len(), 2, "only Jan 4 and Jan 5 fall in the window");
    assert_eq!(
        result[0].original_start,
        Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap()
    );
    assert_eq!(result[0].sequence, 3, "Jan 4 is the 4th occurrence overall");
    assert_eq!(
        result[1].original_start,
        Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Non-repeating events
// ---------------------------------------------------------------------------

#[test]
fn frequency_none_yields_exactly_the_anchor() {
    let anchor = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let event = event_with_rule(anchor, 30, RecurrenceRule::once());

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].original_start, anchor);
    assert_eq!(result[0].original_end, anchor + TimeDelta::minutes(30));
}

#[test]
fn frequency_none_outside_window_yields_nothing() {
    let anchor = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let event = event_with_rule(anchor, 30, RecurrenceRule::once());

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert!(result.is_empty());
}

// ---------------------------------------------------------------------------
// Window edges
// ---------------------------------------------------------------------------

#[test]
fn occurrence_straddling_window_start_is_included() {
    // Event runs 09:00-11:00; the window opens at 10:00 mid-occurrence.
    let anchor = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
    let event = event_with_rule(anchor, 120, RecurrenceRule::once());

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert_eq!(result.len(), 1, "mid-occurrence window start still matches");
}

#[test]
fn until_bound_limits_expansion() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        30,
        RecurrenceRule {
            until: Some(Utc.with_ymd_and_hms(2024, 1, 4, 23, 59, 59).unwrap()),
            ..RecurrenceRule::every(Frequency::Daily)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert_eq!(result.len(), 4, "Jan 1 through Jan 4");
    assert_eq!(
        result[3].original_start,
        Utc.with_ymd_and_hms(2024, 1, 4, 9, 0, 0).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Interval stepping
// ---------------------------------------------------------------------------

#[test]
fn weekly_interval_two() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap(); // Tuesday
    let event = event_with_rule(
        anchor,
        60,
        RecurrenceRule {
            interval: 2,
            count: Some(3),
            ..RecurrenceRule::every(Frequency::Weekly)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert_eq!(result.len(), 3);
    assert_eq!(
        result[1].original_start,
        Utc.with_ymd_and_hms(2024, 1, 16, 11, 0, 0).unwrap()
    );
    assert_eq!(
        result[2].original_start,
        Utc.with_ymd_and_hms(2024, 1, 30, 11, 0, 0).unwrap()
    );
}

// ---------------------------------------------------------------------------
// By-day / by-month refinements
// ---------------------------------------------------------------------------

#[test]
fn weekly_byday_emits_each_listed_weekday() {
    let anchor = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(); // Monday
    let event = event_with_rule(
        anchor,
        45,
        RecurrenceRule {
            count: Some(6),
            by_weekdays: vec![Weekday::Mo, Weekday::We, Weekday::Fr],
            ..RecurrenceRule::every(Frequency::Weekly)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    let expected_days = [2u32, 4, 6, 9, 11, 13];
    assert_eq!(result.len(), 6, "two weeks of Mon/Wed/Fri");
    for (virt, day) in result.iter().zip(expected_days) {
        assert_eq!(
            virt.original_start,
            Utc.with_ymd_and_hms(2026, 3, day, 10, 0, 0).unwrap(),
            "expected an instance on Mar {}",
            day
        );
    }
}

#[test]
fn daily_byday_filters_unlisted_days() {
    // Daily from a Friday, restricted to weekends: skipped days are not
    // occurrences and do not consume the count.
    let anchor = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(); // Friday
    let event = event_with_rule(
        anchor,
        60,
        RecurrenceRule {
            count: Some(4),
            by_weekdays: vec![Weekday::Sa, Weekday::Su],
            ..RecurrenceRule::every(Frequency::Daily)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    let expected_days = [6u32, 7, 13, 14];
    assert_eq!(result.len(), 4);
    for (virt, day) in result.iter().zip(expected_days) {
        assert_eq!(
            virt.original_start,
            Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
        );
    }
}

#[test]
fn monthly_bymonth_skips_unlisted_months() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        60,
        RecurrenceRule {
            count: Some(4),
            by_months: vec![1, 2],
            ..RecurrenceRule::every(Frequency::Monthly)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    assert_eq!(result.len(), 4, "Jan/Feb 2024 and Jan/Feb 2025");
    assert_eq!(
        result[2].original_start,
        Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Calendar math: clamping
// ---------------------------------------------------------------------------

#[test]
fn monthly_day_31_clamps_and_restores() {
    // Jan 31 → Feb 29 (2024 is a leap year) → Mar 31 → Apr 30. The anchor's
    // day-of-month is remembered across clamped months.
    let anchor = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        60,
        RecurrenceRule {
            count: Some(4),
            ..RecurrenceRule::every(Frequency::Monthly)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    let expected = [
        Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 4, 30, 9, 0, 0).unwrap(),
    ];
    let starts: Vec<_> = result.iter().map(|v| v.original_start).collect();
    assert_eq!(starts, expected);
}

#[test]
fn yearly_feb_29_clamps_in_common_years() {
    let anchor = Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        60,
        RecurrenceRule {
            count: Some(3),
            ..RecurrenceRule::every(Frequency::Yearly)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap(),
    )
    .expect("should expand successfully");

    let expected = [
        Utc.with_ymd_and_hms(2024, 2, 29, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 2, 28, 10, 0, 0).unwrap(),
    ];
    let starts: Vec<_> = result.iter().map(|v| v.original_start).collect();
    assert_eq!(starts, expected);
}

// ---------------------------------------------------------------------------
// Safety horizon
// ---------------------------------------------------------------------------

#[test]
fn unbounded_rule_truncates_at_horizon() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let event = event_with_rule(anchor, 30, RecurrenceRule::every(Frequency::Daily));

    let options = ExpandOptions {
        horizon: TimeDelta::days(10),
        ..ExpandOptions::default()
    };
    let expansion = expand_with_options(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        &options,
    )
    .expect("truncation is a successful result, not an error");

    assert!(expansion.truncated, "horizon hit should be reported");
    assert_eq!(
        expansion.instances.len(),
        11,
        "anchor day plus ten days of lookahead"
    );
}

#[test]
fn instance_cap_truncates() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let event = event_with_rule(anchor, 30, RecurrenceRule::every(Frequency::Daily));

    let options = ExpandOptions {
        max_instances: 3,
        ..ExpandOptions::default()
    };
    let expansion = expand_with_options(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        &options,
    )
    .expect("truncation is a successful result, not an error");

    assert!(expansion.truncated);
    assert_eq!(expansion.instances.len(), 3);
}

#[test]
fn bounded_rule_is_not_truncated() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        30,
        RecurrenceRule {
            count: Some(5),
            ..RecurrenceRule::every(Frequency::Daily)
        },
    );

    let expansion = expand_with_options(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        &ExpandOptions::default(),
    )
    .expect("should expand successfully");

    assert!(!expansion.truncated);
}

// ---------------------------------------------------------------------------
// Contract violations
// ---------------------------------------------------------------------------

#[test]
fn invalid_rule_fails_before_iteration() {
    let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let event = event_with_rule(
        anchor,
        30,
        RecurrenceRule {
            interval: 0,
            ..RecurrenceRule::every(Frequency::Daily)
        },
    );

    let result = expand(
        &event,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    );
    assert!(result.is_err(), "interval=0 must fail fast");
}
