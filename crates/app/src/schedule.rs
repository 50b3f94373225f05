//! Schedule computation: everything that turns configured entries into
//! concrete, queued instants.
//!
//! - [`TimeResolver`] resolves time specs against dates (ephemeris lookups)
//! - [`ActiveHoursCalculator`] computes the rolling active-hours window
//! - [`OccurrenceCalculator`] derives one occurrence per entry
//! - [`EventQueue`] orders pending start/end/reschedule events

pub mod active_hours;
pub mod event_queue;
pub mod jitter;
pub mod occurrence;
pub mod resolver;

pub use active_hours::ActiveHoursCalculator;
pub use event_queue::{EventQueue, EventQueueEntry};
pub use jitter::{Jitter, RngJitter};
pub use occurrence::OccurrenceCalculator;
pub use resolver::TimeResolver;
