//! Event bus port: publish/subscribe for scheduler events.

use std::future::Future;

use lightsched_domain::error::SchedulerError;
use lightsched_domain::event::Event;

/// Publishes events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), SchedulerError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), SchedulerError>> + Send {
        (**self).publish(event)
    }
}
