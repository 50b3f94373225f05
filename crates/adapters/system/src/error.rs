//! System adapter error types.

use chrono::NaiveDate;
use lightsched_domain::error::{EphemerisError, SchedulerError};

/// Errors produced while computing sun times.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolarError {
    #[error("coordinates ({latitude}, {longitude}) rejected by the solar calculator")]
    InvalidCoordinates { latitude: String, longitude: String },

    /// The sun does not rise or set that day (polar day or night).
    #[error("no {event} on {date}")]
    NoEvent { event: &'static str, date: NaiveDate },
}

impl SolarError {
    /// Convert into a [`SchedulerError::Ephemeris`] for propagation across
    /// port boundaries.
    #[must_use]
    pub fn into_domain(self) -> SchedulerError {
        let err = match self {
            Self::InvalidCoordinates {
                latitude,
                longitude,
            } => EphemerisError::InvalidLocation {
                latitude,
                longitude,
            },
            Self::NoEvent { date, .. } => EphemerisError::Unavailable(date),
        };
        SchedulerError::Ephemeris(err)
    }
}

impl From<SolarError> for SchedulerError {
    fn from(err: SolarError) -> Self {
        err.into_domain()
    }
}
