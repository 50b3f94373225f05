//! Event queue: pending start/end/reschedule events of every entry, in
//! firing order.

use lightsched_domain::id::OccurrenceId;
use lightsched_domain::schedule::{EventKind, ScheduledOccurrence};
use lightsched_domain::time::Timestamp;

/// One pending event.
///
/// `slot` is the entry's position in the controller's occurrence table;
/// `occurrence` pins the snapshot the event was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQueueEntry {
    pub slot: usize,
    pub occurrence: OccurrenceId,
    pub kind: EventKind,
    pub time: Timestamp,
    pub seq: u64,
}

/// Queue ordered by `(time, seq)`.
#[derive(Debug, Default)]
pub struct EventQueue {
    entries: Vec<EventQueueEntry>,
    next_seq: u64,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the entries for `occurrence`: one per pending field, in
    /// start, end, reschedule order.
    pub fn rebuild_for(
        &mut self,
        slot: usize,
        occurrence: &ScheduledOccurrence,
    ) -> Vec<EventQueueEntry> {
        EventKind::ALL
            .into_iter()
            .filter_map(|kind| {
                occurrence.time_of(kind).map(|time| {
                    self.next_seq += 1;
                    EventQueueEntry {
                        slot,
                        occurrence: occurrence.id,
                        kind,
                        time,
                        seq: self.next_seq,
                    }
                })
            })
            .collect()
    }

    /// Drop every pending entry of `slot` and merge `entries` in order.
    pub fn replace(&mut self, slot: usize, entries: Vec<EventQueueEntry>) {
        self.entries.retain(|entry| entry.slot != slot);
        for entry in entries {
            let at = self
                .entries
                .partition_point(|queued| (queued.time, queued.seq) <= (entry.time, entry.seq));
            self.entries.insert(at, entry);
        }
    }

    /// Shorthand for [`rebuild_for`](Self::rebuild_for) then
    /// [`replace`](Self::replace).
    pub fn schedule(&mut self, slot: usize, occurrence: &ScheduledOccurrence) {
        let entries = self.rebuild_for(slot, occurrence);
        self.replace(slot, entries);
    }

    /// Remove and return every entry due at `now`, earliest first.
    pub fn advance(&mut self, now: Timestamp) -> Vec<EventQueueEntry> {
        let due = self.entries.partition_point(|entry| entry.time <= now);
        self.entries.drain(..due).collect()
    }

    #[must_use]
    pub fn next_time(&self) -> Option<Timestamp> {
        self.entries.first().map(|entry| entry.time)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventQueueEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
