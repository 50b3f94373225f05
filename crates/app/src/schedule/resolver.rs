//! Resolution of time specs against local dates.

use chrono::{NaiveDate, TimeDelta};
use chrono_tz::Tz;
use lightsched_domain::error::{EphemerisError, SchedulerError};
use lightsched_domain::schedule::TimeSpec;
use lightsched_domain::sun::Location;
use lightsched_domain::time::Timestamp;

use crate::ports::Ephemeris;

/// Resolves [`TimeSpec`]s in one time zone, fetching sun times on demand.
pub struct TimeResolver<'a, E> {
    ephemeris: &'a E,
    location: Option<Location>,
    tz: Tz,
}

impl<'a, E: Ephemeris> TimeResolver<'a, E> {
    pub fn new(ephemeris: &'a E, location: Option<Location>, tz: Tz) -> Self {
        Self {
            ephemeris,
            location,
            tz,
        }
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Resolve `spec` on the local calendar `date`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Ephemeris`] when a solar spec cannot be
    /// resolved: no location is configured or the ephemeris has no sun
    /// times for `date`.
    pub fn resolve(&self, spec: &TimeSpec, date: NaiveDate) -> Result<Timestamp, SchedulerError> {
        let sun = if spec.is_solar() {
            let location = self.location.ok_or(EphemerisError::Unavailable(date))?;
            Some(self.ephemeris.sun_times(date, &location)?)
        } else {
            None
        };
        Ok(spec.resolve(date, self.tz, sun.as_ref())?)
    }

    /// Resolve `spec` on the date `days` after `date` (negative for before).
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn resolve_offset(
        &self,
        spec: &TimeSpec,
        date: NaiveDate,
        days: i64,
    ) -> Result<Timestamp, SchedulerError> {
        let date = date
            .checked_add_signed(TimeDelta::days(days))
            .ok_or(EphemerisError::Unavailable(date))?;
        self.resolve(spec, date)
    }
}
