//! Virtual light: an on/off switch or a dimmer.

use lightsched_domain::device::{Command, DeviceLevel};

/// A simulated light.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualLight {
    dimmable: bool,
    level: DeviceLevel,
}

impl VirtualLight {
    /// An on/off light, initially off.
    #[must_use]
    pub fn binary() -> Self {
        Self {
            dimmable: false,
            level: DeviceLevel::Off,
        }
    }

    /// A dimmer, initially at level 0.
    #[must_use]
    pub fn dimmer() -> Self {
        Self {
            dimmable: true,
            level: DeviceLevel::Level(0),
        }
    }

    #[must_use]
    pub fn level(&self) -> DeviceLevel {
        self.level
    }

    /// Apply a command and return the resulting level.
    ///
    /// A binary light treats any non-zero exact level as `on`; a dimmer maps
    /// `on` to 100 and `off` to 0.
    pub fn apply(&mut self, command: Command) -> DeviceLevel {
        self.level = match (self.dimmable, command) {
            (false, Command::On) => DeviceLevel::On,
            (false, Command::Off) => DeviceLevel::Off,
            (false, Command::Exact { level }) => {
                if level > 0 {
                    DeviceLevel::On
                } else {
                    DeviceLevel::Off
                }
            }
            (true, Command::On) => DeviceLevel::Level(100),
            (true, Command::Off) => DeviceLevel::Level(0),
            (true, Command::Exact { level }) => DeviceLevel::Level(level.min(100)),
        };
        self.level
    }

    /// Change the level by hand, bypassing commands.
    pub fn set_level(&mut self, level: DeviceLevel) {
        self.level = level;
    }
}
