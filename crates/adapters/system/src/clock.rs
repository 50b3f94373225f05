//! Wall clock publishing ticks on the in-process event bus.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono_tz::Tz;
use lightsched_app::event_bus::InProcessEventBus;
use lightsched_app::ports::Clock;
use lightsched_domain::event::Event;
use lightsched_domain::id::SubscriptionId;
use lightsched_domain::time::{Timestamp, now_in};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// [`Clock`] backed by system time and tokio timers.
///
/// Every tick subscription owns one spawned task; cancelling the
/// subscription (or dropping the clock) aborts it. Subscribing must happen
/// inside a tokio runtime.
pub struct TokioClock {
    tz: Tz,
    bus: InProcessEventBus,
    tasks: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl TokioClock {
    #[must_use]
    pub fn new(tz: Tz, bus: InProcessEventBus) -> Self {
        Self {
            tz,
            bus,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of tick subscriptions still running.
    #[must_use]
    pub fn active_ticks(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        now_in(self.tz)
    }

    fn timezone(&self) -> Tz {
        self.tz
    }

    fn schedule_tick(&self, interval: Duration) -> SubscriptionId {
        let id = SubscriptionId::new();
        let bus = self.bus.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                bus.send(Event::Tick);
            }
        });
        tracing::debug!(subscription = %id, ?interval, "tick subscription started");
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handle);
        id
    }

    fn cancel_tick(&self, id: SubscriptionId) {
        let handle = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!(subscription = %id, "tick subscription cancelled");
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}
