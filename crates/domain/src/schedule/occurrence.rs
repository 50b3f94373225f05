//! ScheduledOccurrence: one computed cycle of a schedule entry.
//!
//! Occurrences are immutable snapshots: firing an event produces a new
//! snapshot with that field cleared, recomputing produces a new snapshot
//! with a new [`OccurrenceId`].

use serde::{Deserialize, Serialize};

use crate::id::{DeviceRef, OccurrenceId};
use crate::time::{Timestamp, day_and_time};

/// Kind of queued event an occurrence produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    End,
    Reschedule,
}

impl EventKind {
    /// Queue order for events of one occurrence.
    pub const ALL: [Self; 3] = [Self::Start, Self::End, Self::Reschedule];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
            Self::Reschedule => f.write_str("reschedule"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledOccurrence {
    pub id: OccurrenceId,
    /// Sequence number of the entry this occurrence was computed for.
    pub entry: usize,
    pub light: DeviceRef,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub orig_start: Option<Timestamp>,
    pub orig_end: Option<Timestamp>,
    pub reschedule_at: Option<Timestamp>,
    /// Minutes the start was moved later by randomization.
    pub random_offset_start: i64,
    /// Minutes the end was moved earlier by randomization.
    pub random_offset_end: i64,
    pub day_valid: bool,
    pub active: bool,
}

impl ScheduledOccurrence {
    /// An occurrence that will never fire: the entry is not active under the
    /// current presence mode.
    #[must_use]
    pub fn dormant(entry: usize, light: DeviceRef) -> Self {
        Self {
            id: OccurrenceId::new(),
            entry,
            light,
            start: None,
            end: None,
            orig_start: None,
            orig_end: None,
            reschedule_at: None,
            random_offset_start: 0,
            random_offset_end: 0,
            day_valid: false,
            active: false,
        }
    }

    /// Instant at which `kind` fires, if still pending.
    #[must_use]
    pub fn time_of(&self, kind: EventKind) -> Option<Timestamp> {
        match kind {
            EventKind::Start => self.start,
            EventKind::End => self.end,
            EventKind::Reschedule => self.reschedule_at,
        }
    }

    /// Snapshot with `kind` marked as fired. The id is kept.
    #[must_use]
    pub fn without(&self, kind: EventKind) -> Self {
        let mut next = self.clone();
        match kind {
            EventKind::Start => next.start = None,
            EventKind::End => next.end = None,
            EventKind::Reschedule => next.reschedule_at = None,
        }
        next
    }

    /// One-line rendering used in logs and diagnostics.
    #[must_use]
    pub fn summary(&self) -> String {
        let head = format!("#{} {}", self.entry, self.light);
        if !self.active {
            return format!("{head} dormant");
        }
        if !self.day_valid {
            return format!("{head} will reschedule at {}", day_and_time(self.reschedule_at));
        }
        match self.start {
            Some(start) => format!(
                "{head} {} -> {}",
                day_and_time(Some(start)),
                day_and_time(self.end)
            ),
            None => format!(
                "{head} ({}) -> {}",
                day_and_time(self.orig_start),
                day_and_time(self.end)
            ),
        }
    }
}
