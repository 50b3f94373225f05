//! Sensor group: motion/security sensors that switch a set of lights on,
//! and off again once they have been quiet for a while.
//!
//! The pending release is only checked when the controller ticks, so it
//! fires up to one poll interval after `pending_off_at`. At the default
//! 60 s poll this stays within the scheduler's one-minute resolution.

use chrono::TimeDelta;

use crate::error::ValidationError;
use crate::id::DeviceRef;
use crate::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorGroup {
    pub sensors: Vec<DeviceRef>,
    pub lights: Vec<DeviceRef>,
    pub timeout: TimeDelta,
    /// At least one watched light was switched on by a sensor and has not
    /// been released yet.
    pub triggered: bool,
    pub pending_off_at: Option<Timestamp>,
}

impl SensorGroup {
    /// Create an untriggered group. Duplicate lights are dropped, keeping the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroTimeout`] when `timeout` is not
    /// positive.
    pub fn new(
        sensors: Vec<DeviceRef>,
        lights: impl IntoIterator<Item = DeviceRef>,
        timeout: TimeDelta,
    ) -> Result<Self, ValidationError> {
        if timeout <= TimeDelta::zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        let mut unique: Vec<DeviceRef> = Vec::new();
        for light in lights {
            if !unique.contains(&light) {
                unique.push(light);
            }
        }
        Ok(Self {
            sensors,
            lights: unique,
            timeout,
            triggered: false,
            pending_off_at: None,
        })
    }

    #[must_use]
    pub fn watches(&self, device: &DeviceRef) -> bool {
        self.sensors.contains(device)
    }

    /// Schedule the release `timeout` after `now`, replacing any earlier one.
    pub fn arm_off(&mut self, now: Timestamp) {
        self.pending_off_at = Some(now + self.timeout);
    }

    pub fn cancel_off(&mut self) {
        self.pending_off_at = None;
    }

    /// Whether the pending release is due at `now`. Callers poll this on
    /// every tick; there is no separate timer.
    #[must_use]
    pub fn off_due(&self, now: Timestamp) -> bool {
        self.pending_off_at.is_some_and(|at| at <= now)
    }

    /// Forget trigger state and timers.
    pub fn reset(&mut self) {
        self.triggered = false;
        self.pending_off_at = None;
    }
}
