//! Active hours: the daily window outside which no scheduled light and no
//! sensor may switch a light on.

use serde::{Deserialize, Serialize};

use crate::schedule::TimeSpec;
use crate::time::{Timestamp, shift_days};

/// Configured anchors of the active-hours window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveHoursSpec {
    pub start: TimeSpec,
    pub end: TimeSpec,
}

/// The current active-hours window and its successor.
///
/// `start < end`, `next_start < next_end` and `next_start >= end` hold for
/// every window produced by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHoursWindow {
    pub start: Timestamp,
    pub end: Timestamp,
    pub next_start: Timestamp,
    pub next_end: Timestamp,
}

/// A period after clamping to active hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped {
    /// `None` when the period does not intersect the window.
    pub start: Option<Timestamp>,
    pub end: Timestamp,
}

impl ActiveHoursWindow {
    /// Whether `at` lies within the current window, bounds included.
    #[must_use]
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && at <= self.end
    }

    /// The same window moved by whole days.
    #[must_use]
    pub fn shifted(&self, days: i64) -> Self {
        Self {
            start: shift_days(self.start, days),
            end: shift_days(self.end, days),
            next_start: shift_days(self.next_start, days),
            next_end: shift_days(self.next_end, days),
        }
    }

    /// Restrict `start..end` to the window it falls in.
    ///
    /// The current window is used when `start` is not after its end,
    /// otherwise the next one. A period that misses the chosen window loses
    /// its start and keeps its end.
    #[must_use]
    pub fn clamp(&self, start: Timestamp, end: Timestamp) -> Clamped {
        let (w_start, w_end) = if start <= self.end {
            (self.start, self.end)
        } else {
            (self.next_start, self.next_end)
        };
        if end < w_start || start > w_end {
            return Clamped { start: None, end };
        }
        Clamped {
            start: Some(start.max(w_start)),
            end: end.min(w_end),
        }
    }
}
