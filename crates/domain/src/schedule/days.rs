//! DaySet: the weekdays on which a schedule entry may start.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const NAMES: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const ALL: u8 = 0b0111_1111;
const WEEKDAYS: u8 = 0b0011_1110;
const WEEKENDS: u8 = 0b0100_0001;

/// Set of weekdays, Sunday = `0`.
///
/// Parses `all`, `weekdays`, `weekends` or a comma list mixing numbers and
/// two-letter names (`"Mo,We,5"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DaySet(u8);

impl DaySet {
    #[must_use]
    pub fn all() -> Self {
        Self(ALL)
    }

    #[must_use]
    pub fn weekdays() -> Self {
        Self(WEEKDAYS)
    }

    #[must_use]
    pub fn weekends() -> Self {
        Self(WEEKENDS)
    }

    /// Build a set from day indices.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownDay`] for an index above 6 and
    /// [`ValidationError::EmptyDaySet`] when no day is given.
    pub fn from_days(days: impl IntoIterator<Item = u8>) -> Result<Self, ValidationError> {
        let mut bits = 0;
        for day in days {
            if day > 6 {
                return Err(ValidationError::UnknownDay(day.to_string()));
            }
            bits |= 1 << day;
        }
        if bits == 0 {
            return Err(ValidationError::EmptyDaySet);
        }
        Ok(Self(bits))
    }

    /// Whether `day` (Sunday = `0`) is in the set.
    #[must_use]
    pub fn contains(self, day: u8) -> bool {
        day < 7 && self.0 & (1 << day) != 0
    }

    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..7).filter(move |day| self.contains(*day))
    }
}

impl Default for DaySet {
    fn default() -> Self {
        Self::all()
    }
}

impl std::fmt::Display for DaySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            ALL => f.write_str("all"),
            WEEKDAYS => f.write_str("weekdays"),
            WEEKENDS => f.write_str("weekends"),
            _ => {
                let names: Vec<&str> = self.iter().map(|day| NAMES[usize::from(day)]).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

fn parse_day(token: &str) -> Result<u8, ValidationError> {
    if let Ok(day) = token.parse::<u8>() {
        return if day <= 6 {
            Ok(day)
        } else {
            Err(ValidationError::UnknownDay(token.to_string()))
        };
    }
    let prefix: String = token.chars().take(2).collect();
    NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(&prefix))
        .and_then(|day| u8::try_from(day).ok())
        .ok_or_else(|| ValidationError::UnknownDay(token.to_string()))
}

impl FromStr for DaySet {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => return Ok(Self::all()),
            "weekdays" => return Ok(Self::weekdays()),
            "weekends" => return Ok(Self::weekends()),
            _ => {}
        }
        let days = s
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(parse_day)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_days(days)
    }
}

impl TryFrom<String> for DaySet {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DaySet> for String {
    fn from(value: DaySet) -> Self {
        value.to_string()
    }
}
