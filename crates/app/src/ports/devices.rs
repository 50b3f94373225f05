//! Device port: lookup, actuation and level notifications for lights and
//! sensors.

use std::future::Future;

use lightsched_domain::device::{Command, DeviceLevel};
use lightsched_domain::error::SchedulerError;
use lightsched_domain::id::{DeviceRef, SubscriptionId};

/// The home-automation platform's device registry.
///
/// Implementations live in adapter crates (e.g. `adapter_virtual`).
pub trait DeviceRegistry: Send + Sync {
    /// Whether the platform currently knows `device`.
    fn contains(&self, device: &DeviceRef) -> bool;

    /// Last level reported by `device`, `None` when unknown.
    fn level(&self, device: &DeviceRef) -> Option<DeviceLevel>;

    /// Send a command to an actuator.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] for an unknown device, or
    /// [`SchedulerError::Device`] when the platform rejects the command.
    fn perform(
        &self,
        device: &DeviceRef,
        command: Command,
    ) -> impl Future<Output = Result<(), SchedulerError>> + Send;

    /// Start publishing
    /// [`Event::LevelChanged`](lightsched_domain::event::Event::LevelChanged)
    /// for `device`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] for an unknown device.
    fn subscribe_level(&self, device: &DeviceRef) -> Result<SubscriptionId, SchedulerError>;

    /// Stop a level subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<T: DeviceRegistry> DeviceRegistry for std::sync::Arc<T> {
    fn contains(&self, device: &DeviceRef) -> bool {
        (**self).contains(device)
    }

    fn level(&self, device: &DeviceRef) -> Option<DeviceLevel> {
        (**self).level(device)
    }

    fn perform(
        &self,
        device: &DeviceRef,
        command: Command,
    ) -> impl Future<Output = Result<(), SchedulerError>> + Send {
        (**self).perform(device, command)
    }

    fn subscribe_level(&self, device: &DeviceRef) -> Result<SubscriptionId, SchedulerError> {
        (**self).subscribe_level(device)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id);
    }
}
