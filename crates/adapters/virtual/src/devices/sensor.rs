//! Virtual motion sensor: reports `on` while motion is detected.

use lightsched_domain::device::DeviceLevel;

/// A simulated motion sensor. Sensors do not accept commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualMotionSensor {
    detected: bool,
}

impl VirtualMotionSensor {
    #[must_use]
    pub fn level(&self) -> DeviceLevel {
        if self.detected {
            DeviceLevel::On
        } else {
            DeviceLevel::Off
        }
    }

    /// Record motion (or its end). Returns whether the level changed.
    pub fn detect(&mut self, detected: bool) -> bool {
        let changed = self.detected != detected;
        self.detected = detected;
        changed
    }
}
