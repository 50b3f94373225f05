//! Presence port: the household occupancy mode.

use lightsched_domain::id::SubscriptionId;
use lightsched_domain::presence::PresenceMode;

/// Reports the presence mode and publishes
/// [`Event::PresenceChanged`](lightsched_domain::event::Event::PresenceChanged)
/// while subscribed.
pub trait PresenceSource: Send + Sync {
    fn mode(&self) -> PresenceMode;

    fn subscribe(&self) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

impl<T: PresenceSource> PresenceSource for std::sync::Arc<T> {
    fn mode(&self) -> PresenceMode {
        (**self).mode()
    }

    fn subscribe(&self) -> SubscriptionId {
        (**self).subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id);
    }
}
