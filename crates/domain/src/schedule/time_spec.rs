//! TimeSpec: when in a day something happens: a wall-clock time or an
//! offset from sunrise/sunset.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EphemerisError, ValidationError};
use crate::sun::SunTimes;
use crate::time::{Timestamp, local_at, truncate_to_minute};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarAnchor {
    Sunrise,
    Sunset,
}

impl std::fmt::Display for SolarAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sunrise => f.write_str("sunrise"),
            Self::Sunset => f.write_str("sunset"),
        }
    }
}

/// Anchor for a start or end time.
///
/// Text form: `HH:MM`, `sunrise`, `sunset`, or a solar anchor followed by a
/// signed `HH:MM` offset (`sunset+00:30`, `sunrise-01:15`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeSpec {
    Clock(NaiveTime),
    Solar {
        anchor: SolarAnchor,
        /// Signed offset in minutes.
        offset_minutes: i32,
    },
}

impl TimeSpec {
    /// Clock time helper, mostly for tests and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidClockTime`] when out of range.
    pub fn clock(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self::Clock)
            .ok_or_else(|| ValidationError::InvalidClockTime(format!("{hour}:{minute}")))
    }

    /// Whether resolving this spec needs sun times.
    #[must_use]
    pub fn is_solar(&self) -> bool {
        matches!(self, Self::Solar { .. })
    }

    /// Resolve to an instant on `date` in `tz`.
    ///
    /// `sun` must hold the sun times of `date` when the spec is solar; clock
    /// specs ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`EphemerisError::Unavailable`] for a solar spec without sun
    /// times.
    pub fn resolve(
        &self,
        date: NaiveDate,
        tz: Tz,
        sun: Option<&SunTimes>,
    ) -> Result<Timestamp, EphemerisError> {
        match self {
            Self::Clock(time) => Ok(local_at(tz, date, *time)),
            Self::Solar {
                anchor,
                offset_minutes,
            } => {
                let sun = sun.ok_or(EphemerisError::Unavailable(date))?;
                let base = match anchor {
                    SolarAnchor::Sunrise => sun.sunrise,
                    SolarAnchor::Sunset => sun.sunset,
                };
                let at = base.with_timezone(&tz) + TimeDelta::minutes(i64::from(*offset_minutes));
                Ok(truncate_to_minute(at))
            }
        }
    }
}

impl std::fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clock(time) => write!(f, "{}", time.format("%H:%M")),
            Self::Solar {
                anchor,
                offset_minutes: 0,
            } => write!(f, "{anchor}"),
            Self::Solar {
                anchor,
                offset_minutes,
            } => {
                let sign = if *offset_minutes < 0 { '-' } else { '+' };
                let minutes = offset_minutes.unsigned_abs();
                write!(f, "{anchor}{sign}{:02}:{:02}", minutes / 60, minutes % 60)
            }
        }
    }
}

fn parse_offset(raw: &str, whole: &str) -> Result<i32, ValidationError> {
    let invalid = || ValidationError::InvalidTimeSpec(whole.to_string());
    if raw.is_empty() {
        return Ok(0);
    }
    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }
    Ok(sign * (hours * 60 + minutes))
}

impl FromStr for TimeSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        for anchor in [SolarAnchor::Sunrise, SolarAnchor::Sunset] {
            if let Some(rest) = lower.strip_prefix(&anchor.to_string()) {
                return Ok(Self::Solar {
                    anchor,
                    offset_minutes: parse_offset(rest.trim(), s)?,
                });
            }
        }
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .map(Self::Clock)
            .map_err(|_| ValidationError::InvalidClockTime(s.to_string()))
    }
}

impl TryFrom<String> for TimeSpec {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSpec> for String {
    fn from(value: TimeSpec) -> Self {
        value.to_string()
    }
}
