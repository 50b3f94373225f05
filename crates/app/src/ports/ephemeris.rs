//! Ephemeris port: sunrise and sunset for a date and place.

use chrono::NaiveDate;
use lightsched_domain::error::SchedulerError;
use lightsched_domain::sun::{Location, SunTimes};

pub trait Ephemeris: Send + Sync {
    /// Sun times for the local calendar `date` at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Ephemeris`] when no sunrise or sunset exists
    /// for that date (polar day or night) or the location is invalid.
    fn sun_times(&self, date: NaiveDate, location: &Location) -> Result<SunTimes, SchedulerError>;
}

impl<T: Ephemeris> Ephemeris for std::sync::Arc<T> {
    fn sun_times(&self, date: NaiveDate, location: &Location) -> Result<SunTimes, SchedulerError> {
        (**self).sun_times(date, location)
    }
}
