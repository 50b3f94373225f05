//! Schedule: timetable entries and the occurrences computed from them.
//!
//! A [`ScheduleEntry`] is one row of the configured timetable: which light,
//! in which presence modes, on which days, from when to when. Each entry
//! yields one [`ScheduledOccurrence`] at a time.

mod days;
mod occurrence;
mod time_spec;

pub use days::DaySet;
pub use occurrence::{EventKind, ScheduledOccurrence};
pub use time_spec::{SolarAnchor, TimeSpec};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceRef;
use crate::presence::PresenceFilter;

/// One timetable row. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based position in the timetable, used in logs.
    pub seq: usize,
    pub light: DeviceRef,
    pub presence: PresenceFilter,
    pub days: DaySet,
    pub start: TimeSpec,
    pub end: TimeSpec,
    pub randomize: bool,
}

impl ScheduleEntry {
    /// Create a builder for constructing a [`ScheduleEntry`].
    #[must_use]
    pub fn builder() -> ScheduleEntryBuilder {
        ScheduleEntryBuilder::default()
    }
}

/// Step-by-step builder for [`ScheduleEntry`].
#[derive(Debug, Default)]
pub struct ScheduleEntryBuilder {
    seq: Option<usize>,
    light: Option<DeviceRef>,
    presence: Option<PresenceFilter>,
    days: Option<DaySet>,
    start: Option<TimeSpec>,
    end: Option<TimeSpec>,
    randomize: bool,
}

impl ScheduleEntryBuilder {
    #[must_use]
    pub fn seq(mut self, seq: usize) -> Self {
        self.seq = Some(seq);
        self
    }

    #[must_use]
    pub fn light(mut self, light: impl Into<DeviceRef>) -> Self {
        self.light = Some(light.into());
        self
    }

    #[must_use]
    pub fn presence(mut self, presence: PresenceFilter) -> Self {
        self.presence = Some(presence);
        self
    }

    #[must_use]
    pub fn days(mut self, days: DaySet) -> Self {
        self.days = Some(days);
        self
    }

    #[must_use]
    pub fn start(mut self, start: TimeSpec) -> Self {
        self.start = Some(start);
        self
    }

    #[must_use]
    pub fn end(mut self, end: TimeSpec) -> Self {
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn randomize(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }

    /// Consume the builder and return a [`ScheduleEntry`].
    ///
    /// Presence defaults to `any`, days to every day, the sequence number
    /// to 1.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingLight`] or
    /// [`ValidationError::MissingTime`] when a required field is absent.
    pub fn build(self) -> Result<ScheduleEntry, ValidationError> {
        let light = self
            .light
            .filter(|light| !light.as_str().is_empty())
            .ok_or(ValidationError::MissingLight)?;
        Ok(ScheduleEntry {
            seq: self.seq.unwrap_or(1),
            light,
            presence: self.presence.unwrap_or_default(),
            days: self.days.unwrap_or_default(),
            start: self.start.ok_or(ValidationError::MissingTime("start"))?,
            end: self.end.ok_or(ValidationError::MissingTime("end"))?,
            randomize: self.randomize,
        })
    }
}
