//! # lightsched-adapter-virtual
//!
//! Virtual/demo integration that provides simulated devices and presence for
//! testing and demonstration purposes.
//!
//! ## Provided devices
//!
//! | Device | Levels | Behaviour |
//! |--------|--------|-----------|
//! | Binary light | `on` / `off` | Responds to `on`, `off`, `exact` |
//! | Dimmer | `0..=100` | Responds to `on`, `off`, `exact` |
//! | Motion sensor | `on` / `off` | Read-only, driven by [`VirtualDevices::trigger_motion`] |
//!
//! Level changes are published as `LevelChanged` events on the bus, but only
//! for devices somebody subscribed to.
//!
//! ## Dependency rule
//!
//! Depends on `lightsched-app` (port traits) and `lightsched-domain` only.

mod devices;
mod error;
mod presence;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lightsched_app::event_bus::InProcessEventBus;
use lightsched_app::ports::DeviceRegistry;
use lightsched_domain::device::{Command, DeviceLevel};
use lightsched_domain::error::SchedulerError;
use lightsched_domain::event::Event;
use lightsched_domain::id::{DeviceRef, SubscriptionId};

pub use devices::{VirtualDevice, VirtualLight, VirtualMotionSensor};
pub use error::VirtualDeviceError;
pub use presence::VirtualPresence;

/// In-memory device registry.
pub struct VirtualDevices {
    bus: InProcessEventBus,
    devices: Mutex<HashMap<DeviceRef, VirtualDevice>>,
    subscriptions: Mutex<HashMap<SubscriptionId, DeviceRef>>,
}

impl VirtualDevices {
    /// Create an empty registry publishing on `bus`.
    #[must_use]
    pub fn new(bus: InProcessEventBus) -> Self {
        Self {
            bus,
            devices: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a device under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualDeviceError::Duplicate`] when the name is taken.
    pub fn add(
        &self,
        name: impl Into<DeviceRef>,
        device: VirtualDevice,
    ) -> Result<(), VirtualDeviceError> {
        let name = name.into();
        let mut devices = self.lock_devices();
        if devices.contains_key(&name) {
            return Err(VirtualDeviceError::Duplicate(name));
        }
        tracing::debug!(device = %name, level = %device.level(), "virtual device added");
        devices.insert(name, device);
        Ok(())
    }

    /// Names of every registered device, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<DeviceRef> {
        let mut names: Vec<DeviceRef> = self.lock_devices().keys().cloned().collect();
        names.sort();
        names
    }

    /// Simulate a motion sensor detecting (or losing) motion.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualDeviceError::UnknownDevice`] or
    /// [`VirtualDeviceError::NotASensor`].
    pub fn trigger_motion(
        &self,
        sensor: &DeviceRef,
        detected: bool,
    ) -> Result<(), VirtualDeviceError> {
        let level = {
            let mut devices = self.lock_devices();
            match devices.get_mut(sensor) {
                Some(VirtualDevice::MotionSensor(s)) => {
                    if !s.detect(detected) {
                        return Ok(());
                    }
                    s.level()
                }
                Some(VirtualDevice::Light(_)) => {
                    return Err(VirtualDeviceError::NotASensor(sensor.clone()));
                }
                None => return Err(VirtualDeviceError::UnknownDevice(sensor.clone())),
            }
        };
        self.notify(sensor, level);
        Ok(())
    }

    /// Flip a light by hand, as a wall switch would.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualDeviceError::UnknownDevice`] or
    /// [`VirtualDeviceError::ReadOnly`] for sensors.
    pub fn set_manually(
        &self,
        light: &DeviceRef,
        level: DeviceLevel,
    ) -> Result<(), VirtualDeviceError> {
        {
            let mut devices = self.lock_devices();
            match devices.get_mut(light) {
                Some(VirtualDevice::Light(l)) => l.set_level(level),
                Some(VirtualDevice::MotionSensor(_)) => {
                    return Err(VirtualDeviceError::ReadOnly(light.clone()));
                }
                None => return Err(VirtualDeviceError::UnknownDevice(light.clone())),
            }
        }
        self.notify(light, level);
        Ok(())
    }

    fn apply(
        &self,
        device: &DeviceRef,
        command: Command,
    ) -> Result<DeviceLevel, VirtualDeviceError> {
        let mut devices = self.lock_devices();
        let target = devices
            .get_mut(device)
            .ok_or_else(|| VirtualDeviceError::UnknownDevice(device.clone()))?;
        target
            .apply(command)
            .ok_or_else(|| VirtualDeviceError::ReadOnly(device.clone()))
    }

    fn notify(&self, device: &DeviceRef, level: DeviceLevel) {
        let watched = self
            .lock_subscriptions()
            .values()
            .any(|watched| watched == device);
        if watched {
            self.bus.send(Event::LevelChanged {
                device: device.clone(),
                level,
            });
        }
    }

    fn lock_devices(&self) -> MutexGuard<'_, HashMap<DeviceRef, VirtualDevice>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, HashMap<SubscriptionId, DeviceRef>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceRegistry for VirtualDevices {
    fn contains(&self, device: &DeviceRef) -> bool {
        self.lock_devices().contains_key(device)
    }

    fn level(&self, device: &DeviceRef) -> Option<DeviceLevel> {
        self.lock_devices().get(device).map(VirtualDevice::level)
    }

    fn perform(
        &self,
        device: &DeviceRef,
        command: Command,
    ) -> impl Future<Output = Result<(), SchedulerError>> + Send {
        let result = self.apply(device, command).map(|level| {
            tracing::debug!(device = %device, %command, %level, "virtual device actuated");
            self.notify(device, level);
        });
        async move { result.map_err(VirtualDeviceError::into_domain) }
    }

    fn subscribe_level(&self, device: &DeviceRef) -> Result<SubscriptionId, SchedulerError> {
        if !self.contains(device) {
            return Err(VirtualDeviceError::UnknownDevice(device.clone()).into());
        }
        let id = SubscriptionId::new();
        self.lock_subscriptions().insert(id, device.clone());
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock_subscriptions().remove(&id);
    }
}
