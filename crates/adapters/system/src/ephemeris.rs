//! Sunrise and sunset from the `sunrise` crate.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use lightsched_app::ports::Ephemeris;
use lightsched_domain::error::SchedulerError;
use lightsched_domain::sun::{Location, SunTimes};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use crate::error::SolarError;

/// Computes sun times locally, no network involved.
#[derive(Debug, Clone, Copy)]
pub struct SunriseEphemeris {
    tz: Tz,
}

impl SunriseEphemeris {
    /// Sun times are reported in `tz`.
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    fn event(
        coord: Coordinates,
        event: SolarEvent,
        name: &'static str,
        date: NaiveDate,
    ) -> Result<DateTime<Utc>, SolarError> {
        // plain DateTime on sunrise 2.0, Option from 2.1 on
        #[allow(clippy::useless_conversion)]
        let at: Option<DateTime<Utc>> = SolarDay::new(coord, date).event_time(event).into();
        at.ok_or(SolarError::NoEvent { event: name, date })
    }
}

impl Ephemeris for SunriseEphemeris {
    fn sun_times(&self, date: NaiveDate, location: &Location) -> Result<SunTimes, SchedulerError> {
        let coord = Coordinates::new(location.latitude, location.longitude).ok_or_else(|| {
            SolarError::InvalidCoordinates {
                latitude: location.latitude.to_string(),
                longitude: location.longitude.to_string(),
            }
        })?;
        let sunrise = Self::event(coord, SolarEvent::Sunrise, "sunrise", date)?;
        let sunset = Self::event(coord, SolarEvent::Sunset, "sunset", date)?;
        if sunset <= sunrise {
            return Err(SolarError::NoEvent {
                event: "sunset",
                date,
            }
            .into());
        }
        tracing::trace!(%date, %sunrise, %sunset, "sun times computed");
        Ok(SunTimes {
            sunrise: sunrise.with_timezone(&self.tz),
            sunset: sunset.with_timezone(&self.tz),
        })
    }
}
