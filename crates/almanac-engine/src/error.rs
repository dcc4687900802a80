//! Error types for engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed recurrence configuration, rejected at write time.
    /// A rule that passed validation never raises this during expansion.
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// The mutation target slot does not exist under the rule or its history.
    #[error("No occurrence of event {event_id} at {original_start}")]
    NotFound {
        event_id: Uuid,
        original_start: DateTime<Utc>,
    },

    /// The mutation violates a field invariant (e.g. end before start) or a
    /// uniqueness race was detected at commit time.
    #[error("Conflicting occurrence change: {0}")]
    Conflict(String),

    /// A custom query range with start >= end.
    #[error("Invalid query window: {0}")]
    InvalidWindow(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
