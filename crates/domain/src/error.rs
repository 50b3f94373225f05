//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SchedulerError`] via `#[from]` (adapters box theirs into
//! [`SchedulerError::Device`]).

/// Top-level error for the scheduling core.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("ephemeris error")]
    Ephemeris(#[from] EphemerisError),

    /// An actuator or registry failure reported by an adapter.
    #[error("device error")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid clock time {0:?}, expected HH:MM")]
    InvalidClockTime(String),

    #[error("invalid time spec {0:?}")]
    InvalidTimeSpec(String),

    #[error("unknown presence value {0:?}")]
    UnknownPresence(String),

    #[error("unknown day {0:?}")]
    UnknownDay(String),

    #[error("day set must contain at least one day")]
    EmptyDaySet,

    #[error("unknown light kind {0:?}")]
    UnknownLightKind(String),

    #[error("sensor timeout must be greater than zero")]
    ZeroTimeout,

    #[error("schedule entry is missing a light reference")]
    MissingLight,

    #[error("schedule entry is missing its {0} time")]
    MissingTime(&'static str),
}

/// A referenced device or entry does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Solar times could not be produced for a date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EphemerisError {
    #[error("no sun times available for {0}")]
    Unavailable(chrono::NaiveDate),

    #[error("invalid coordinates ({latitude}, {longitude})")]
    InvalidLocation { latitude: String, longitude: String },
}
