//! Active-hours calculator.
//!
//! The window is anchored on its end: find the first end that is still in
//! the future, then the start that precedes it. Windows spanning midnight
//! (sunset to sunrise) take their start from the day before.

use chrono::{NaiveDate, TimeDelta};
use lightsched_domain::active_hours::{ActiveHoursSpec, ActiveHoursWindow};
use lightsched_domain::error::SchedulerError;
use lightsched_domain::time::{Timestamp, day_and_time, shift_days};

use super::resolver::TimeResolver;
use crate::ports::Ephemeris;

pub struct ActiveHoursCalculator;

impl ActiveHoursCalculator {
    /// Compute the window current at `now` and its successor.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Ephemeris`] when a solar anchor cannot be
    /// resolved.
    pub fn compute<E: Ephemeris>(
        now: Timestamp,
        spec: &ActiveHoursSpec,
        resolver: &TimeResolver<'_, E>,
    ) -> Result<ActiveHoursWindow, SchedulerError> {
        let today = now.date_naive();
        let date = if resolver.resolve(&spec.end, today)? <= now {
            today + TimeDelta::days(1)
        } else {
            today
        };
        let (start, end) = Self::window_ending_on(date, spec, resolver)?;
        let (next_start, next_end) =
            Self::window_ending_on(date + TimeDelta::days(1), spec, resolver)?;
        Ok(ActiveHoursWindow {
            start,
            end,
            next_start,
            next_end,
        })
    }

    fn window_ending_on<E: Ephemeris>(
        date: NaiveDate,
        spec: &ActiveHoursSpec,
        resolver: &TimeResolver<'_, E>,
    ) -> Result<(Timestamp, Timestamp), SchedulerError> {
        let mut end = resolver.resolve(&spec.end, date)?;
        let mut start = resolver.resolve(&spec.start, date)?;
        if start > end {
            start = resolver.resolve_offset(&spec.start, date, -1)?;
        }
        if end <= start {
            tracing::warn!(
                start = %day_and_time(Some(start)),
                end = %day_and_time(Some(end)),
                "active hours end not after start, moving end to next day"
            );
            end = shift_days(end, 1);
        }
        Ok((start, end))
    }
}
