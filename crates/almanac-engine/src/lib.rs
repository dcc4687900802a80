//! # almanac-engine
//!
//! Occurrence materialization for recurring calendar events.
//!
//! A recurring event is stored once, as an anchor plus a
//! [`RecurrenceRule`]; its instances are expanded lazily on demand. Editing
//! one instance persists an exception record for just that slot, and the
//! reconciler merges rule-generated instances with stored exceptions --
//! including exceptions orphaned by a later rule change, which are retained
//! and flagged historical rather than dropped.
//!
//! ```rust
//! use almanac_engine::{expand, Event, Frequency, RecurrenceRule};
//! use chrono::{TimeZone, Utc};
//! use uuid::Uuid;
//!
//! let event = Event {
//!     id: Uuid::new_v4(),
//!     calendar_id: Uuid::new_v4(),
//!     title: "standup".into(),
//!     description: String::new(),
//!     start: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
//!     end: Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
//!     rule: RecurrenceRule {
//!         count: Some(5),
//!         ..RecurrenceRule::every(Frequency::Daily)
//!     },
//! };
//! let instances = expand(
//!     &event,
//!     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
//! )
//! .unwrap();
//! assert_eq!(instances.len(), 5);
//! ```
//!
//! ## Modules
//!
//! - [`rule`] -- recurrence rule model and validation
//! - [`occurrence`] -- event, virtual/persisted occurrence, resolved output
//! - [`expander`] -- lazy rule expansion with a safety horizon
//! - [`reconcile`] -- exception overrides and historical retention
//! - [`mutation`] -- the single write path for occurrence edits
//! - [`upcoming`] -- period windows and the cross-calendar merged timeline
//! - [`store`] -- collaborator seams plus an in-memory reference store
//! - [`error`] -- error types

pub mod error;
pub mod expander;
pub mod mutation;
pub mod occurrence;
pub mod reconcile;
pub mod rule;
pub mod store;
pub mod upcoming;

pub use error::EngineError;
pub use expander::{expand, expand_with_options, slot_at, ExpandOptions, Expander, Expansion};
pub use mutation::{mutate, mutate_at, OccurrenceChanges};
pub use occurrence::{Event, Occurrence, ResolvedOccurrence, VirtualOccurrence};
pub use reconcile::{occurrences_between, reconcile, ReconcileOptions};
pub use rule::{Frequency, RecurrenceRule, Weekday};
pub use store::{Calendar, EventSource, InMemoryStore, OccurrenceStore};
pub use upcoming::{upcoming, PeriodKind, UpcomingRequest};
