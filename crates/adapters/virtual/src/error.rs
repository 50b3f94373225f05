//! Virtual adapter error types.

use lightsched_domain::error::{NotFoundError, SchedulerError};
use lightsched_domain::id::DeviceRef;

/// Errors specific to the virtual devices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualDeviceError {
    #[error("unknown virtual device {0}")]
    UnknownDevice(DeviceRef),

    /// Commands were sent to a read-only device.
    #[error("virtual device {0} does not accept commands")]
    ReadOnly(DeviceRef),

    /// A device was added twice.
    #[error("virtual device {0} already exists")]
    Duplicate(DeviceRef),

    /// The device exists but is not a motion sensor.
    #[error("virtual device {0} is not a motion sensor")]
    NotASensor(DeviceRef),
}

impl VirtualDeviceError {
    /// Convert into a [`SchedulerError`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> SchedulerError {
        match self {
            Self::UnknownDevice(device) => NotFoundError {
                entity: "Device",
                id: device.to_string(),
            }
            .into(),
            other => SchedulerError::Device(Box::new(other)),
        }
    }
}

impl From<VirtualDeviceError> for SchedulerError {
    fn from(err: VirtualDeviceError) -> Self {
        err.into_domain()
    }
}
