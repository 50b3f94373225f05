//! Virtual presence: a household mode set by hand.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use lightsched_app::event_bus::InProcessEventBus;
use lightsched_app::ports::PresenceSource;
use lightsched_domain::event::Event;
use lightsched_domain::id::SubscriptionId;
use lightsched_domain::presence::PresenceMode;

/// [`PresenceSource`] whose mode is changed with [`VirtualPresence::set`].
pub struct VirtualPresence {
    bus: InProcessEventBus,
    mode: Mutex<PresenceMode>,
    subscriptions: Mutex<HashSet<SubscriptionId>>,
}

impl VirtualPresence {
    #[must_use]
    pub fn new(mode: PresenceMode, bus: InProcessEventBus) -> Self {
        Self {
            bus,
            mode: Mutex::new(mode),
            subscriptions: Mutex::new(HashSet::new()),
        }
    }

    /// Change the mode, publishing it when somebody listens.
    pub fn set(&self, mode: PresenceMode) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
        let listening = !self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty();
        tracing::debug!(%mode, listening, "virtual presence changed");
        if listening {
            self.bus.send(Event::PresenceChanged { mode });
        }
    }
}

impl PresenceSource for VirtualPresence {
    fn mode(&self) -> PresenceMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
