//! Occurrence calculator: derives the next concrete cycle of an entry.

use chrono::TimeDelta;
use lightsched_domain::active_hours::ActiveHoursWindow;
use lightsched_domain::error::SchedulerError;
use lightsched_domain::id::OccurrenceId;
use lightsched_domain::presence::PresenceMode;
use lightsched_domain::schedule::{ScheduleEntry, ScheduledOccurrence};
use lightsched_domain::time::{Timestamp, weekday_index};

use super::jitter::Jitter;
use super::resolver::TimeResolver;
use crate::ports::Ephemeris;

/// Everything a computation depends on besides the entry.
pub struct OccurrenceContext<'a, 'r, E> {
    pub now: Timestamp,
    pub presence: PresenceMode,
    pub active_hours: Option<&'a ActiveHoursWindow>,
    pub resolver: &'a TimeResolver<'r, E>,
    pub max_random_minutes: u32,
}

pub struct OccurrenceCalculator;

impl OccurrenceCalculator {
    /// Compute a fresh occurrence of `entry`.
    ///
    /// Randomization draws exactly two offsets per call, one for the start
    /// and one for the end.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Ephemeris`] when a solar anchor cannot be
    /// resolved.
    pub fn compute<E: Ephemeris>(
        entry: &ScheduleEntry,
        ctx: &OccurrenceContext<'_, '_, E>,
        jitter: &mut dyn Jitter,
    ) -> Result<ScheduledOccurrence, SchedulerError> {
        if !entry.presence.is_active(ctx.presence) {
            return Ok(ScheduledOccurrence::dormant(entry.seq, entry.light.clone()));
        }
        let now = ctx.now;
        let today = now.date_naive();

        let mut start = ctx.resolver.resolve(&entry.start, today)?;
        let mut end = ctx.resolver.resolve(&entry.end, today)?;
        if end <= now {
            end = ctx.resolver.resolve_offset(&entry.end, today, 1)?;
            if start <= now {
                start = ctx.resolver.resolve_offset(&entry.start, today, 1)?;
            }
        }
        let orig_start = start;
        let orig_end = end;
        let day_valid = entry.days.contains(weekday_index(orig_start));

        let (mut start, mut end) = match ctx.active_hours {
            Some(window) => {
                let clamped = window.clamp(start, end);
                (clamped.start, clamped.end)
            }
            None => (Some(start), end),
        };

        let (mut random_offset_start, mut random_offset_end) = (0, 0);
        if entry.randomize && ctx.max_random_minutes > 0 {
            random_offset_start = jitter.minutes(ctx.max_random_minutes);
            random_offset_end = jitter.minutes(ctx.max_random_minutes);
            start = start.map(|s| s + TimeDelta::minutes(random_offset_start));
            end -= TimeDelta::minutes(random_offset_end);
        }

        let (start, end) = match start {
            _ if !day_valid => (None, None),
            Some(s) if s > end => (None, None),
            Some(s) if s == end || s < now => (None, Some(end)),
            other => (other, Some(end)),
        };

        Ok(ScheduledOccurrence {
            id: OccurrenceId::new(),
            entry: entry.seq,
            light: entry.light.clone(),
            start,
            end,
            orig_start: Some(orig_start),
            orig_end: Some(orig_end),
            reschedule_at: Some(orig_end),
            random_offset_start,
            random_offset_end,
            day_valid,
            active: true,
        })
    }
}
