//! Clock port: current time and periodic wake-ups.

use std::time::Duration;

use chrono_tz::Tz;
use lightsched_domain::id::SubscriptionId;
use lightsched_domain::time::Timestamp;

/// Source of the current time and of [`Event::Tick`](lightsched_domain::event::Event::Tick)s.
pub trait Clock: Send + Sync {
    /// Current instant in the house's time zone.
    fn now(&self) -> Timestamp;

    /// Time zone every schedule is resolved in.
    fn timezone(&self) -> Tz;

    /// Start publishing a tick every `interval`.
    fn schedule_tick(&self, interval: Duration) -> SubscriptionId;

    /// Stop a tick subscription. Unknown ids are ignored.
    fn cancel_tick(&self, id: SubscriptionId);
}

impl<T: Clock> Clock for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn timezone(&self) -> Tz {
        (**self).timezone()
    }

    fn schedule_tick(&self, interval: Duration) -> SubscriptionId {
        (**self).schedule_tick(interval)
    }

    fn cancel_tick(&self, id: SubscriptionId) {
        (**self).cancel_tick(id);
    }
}
