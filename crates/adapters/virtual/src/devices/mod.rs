//! Virtual device implementations: lights and motion sensors.

mod light;
mod sensor;

pub use light::VirtualLight;
pub use sensor::VirtualMotionSensor;

use lightsched_domain::device::{Command, DeviceLevel};

/// Wrapper enum for the concrete virtual device types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualDevice {
    Light(VirtualLight),
    MotionSensor(VirtualMotionSensor),
}

impl VirtualDevice {
    #[must_use]
    pub fn level(&self) -> DeviceLevel {
        match self {
            Self::Light(d) => d.level(),
            Self::MotionSensor(d) => d.level(),
        }
    }

    /// Apply `command`, returning the new level. Sensors are read-only and
    /// return `None`.
    pub fn apply(&mut self, command: Command) -> Option<DeviceLevel> {
        match self {
            Self::Light(d) => Some(d.apply(command)),
            Self::MotionSensor(_) => None,
        }
    }
}
