//! Device levels and actuator commands.

use serde::{Deserialize, Serialize};

/// Last known level of a device, as reported by the platform.
///
/// Binary switches and motion sensors report `on`/`off`; dimmers report a
/// percentage where `0` means off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceLevel {
    On,
    Off,
    Level(u8),
}

impl DeviceLevel {
    /// Whether the device is currently emitting light / detecting motion.
    #[must_use]
    pub fn is_on(self) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Level(level) => level > 0,
        }
    }
}

impl std::fmt::Display for DeviceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Level(level) => write!(f, "{level}"),
        }
    }
}

/// Command sent to an actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    On,
    Off,
    /// Set a dimmer to an exact level.
    Exact { level: u8 },
}

impl Command {
    /// Level the device is expected to report once the command is applied.
    #[must_use]
    pub fn resulting_level(self) -> DeviceLevel {
        match self {
            Self::On => DeviceLevel::On,
            Self::Off => DeviceLevel::Off,
            Self::Exact { level } => DeviceLevel::Level(level),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Exact { level } => write!(f, "exact({level})"),
        }
    }
}
