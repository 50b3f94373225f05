//! Event: what the controller reacts to.
//!
//! Adapters publish events on the in-process bus; the controller takes them
//! one at a time and runs each handler to completion.

use serde::{Deserialize, Serialize};

use crate::device::DeviceLevel;
use crate::id::DeviceRef;
use crate::presence::PresenceMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Periodic wake-up from the clock.
    Tick,
    /// The household presence mode was reported.
    PresenceChanged { mode: PresenceMode },
    /// A light or sensor reported a new level.
    LevelChanged {
        device: DeviceRef,
        level: DeviceLevel,
    },
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tick => f.write_str("tick"),
            Self::PresenceChanged { mode } => write!(f, "presence_changed({mode})"),
            Self::LevelChanged { device, level } => write!(f, "level_changed({device}={level})"),
        }
    }
}
