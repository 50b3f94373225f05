//! Light: a controllable lamp and the record of who switched it on.
//!
//! Both the schedule and the motion sensors drive the same lights. The
//! [`Light::change`] decision is the single place that reconciles them: a
//! light the schedule switched on is never switched off by a sensor timing
//! out.

use serde::{Deserialize, Serialize};

use crate::device::{Command, DeviceLevel};
use crate::id::DeviceRef;

/// How a light is actuated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightKind {
    /// On/off switch.
    Binary,
    /// Dimmer driven to fixed levels.
    Multilevel {
        on_level: u8,
        #[serde(default)]
        off_level: u8,
    },
}

impl LightKind {
    #[must_use]
    pub fn command_for(self, event: LightEvent) -> Command {
        match (self, event) {
            (Self::Binary, LightEvent::Start) => Command::On,
            (Self::Binary, LightEvent::End) => Command::Off,
            (Self::Multilevel { on_level, .. }, LightEvent::Start) => {
                Command::Exact { level: on_level }
            }
            (Self::Multilevel { off_level, .. }, LightEvent::End) => {
                Command::Exact { level: off_level }
            }
        }
    }
}

/// Who asked for a light change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Schedule,
    Sensor,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schedule => f.write_str("schedule"),
            Self::Sensor => f.write_str("sensor"),
        }
    }
}

/// Start or end of a lighting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightEvent {
    Start,
    End,
}

impl std::fmt::Display for LightEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

/// How the scheduler learns whether a light is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightCheck {
    /// Trust level-change notifications from the device.
    #[default]
    Notification,
    /// Re-read the device level before every decision.
    Query,
    /// The level cannot be known: every start and end sends its command.
    #[serde(alias = "no")]
    None,
}

/// Outcome of [`Light::change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightChange {
    /// The light was off; send the command to switch it on.
    TurnedOn(Command),
    /// The light was on; send the command to switch it off.
    TurnedOff(Command),
    /// Already in the requested state. Ownership may still have changed.
    Unchanged,
    /// A sensor tried to end a period the schedule owns.
    Refused,
}

impl LightChange {
    /// Command to forward to the actuator, if any.
    #[must_use]
    pub fn command(self) -> Option<Command> {
        match self {
            Self::TurnedOn(command) | Self::TurnedOff(command) => Some(command),
            Self::Unchanged | Self::Refused => None,
        }
    }

    #[must_use]
    pub fn turned_on(self) -> bool {
        matches!(self, Self::TurnedOn(_))
    }
}

/// A light under the scheduler's control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    pub device: DeviceRef,
    pub kind: LightKind,
    pub on_status: bool,
    pub on_by: Option<Source>,
    #[serde(default)]
    pub check: LightCheck,
}

impl Light {
    /// Create a light assumed to be off and unowned.
    #[must_use]
    pub fn new(device: DeviceRef, kind: LightKind) -> Self {
        Self {
            device,
            kind,
            on_status: false,
            on_by: None,
            check: LightCheck::default(),
        }
    }

    #[must_use]
    pub fn with_check(mut self, check: LightCheck) -> Self {
        self.check = check;
        self
    }

    /// Refresh `on_status` from a level reported by the device. Ignored
    /// for lights whose level cannot be checked.
    pub fn observe(&mut self, level: DeviceLevel) {
        if self.check != LightCheck::None {
            self.on_status = level.is_on();
        }
    }

    /// Decide what a start/end request from `source` does to this light.
    ///
    /// - A sensor `End` is refused while the schedule owns the light.
    /// - `Start` records `source` as owner unless the schedule already is;
    ///   a light that is already on gets no second command.
    /// - `End` always clears the owner and only sends a command when the
    ///   light is on.
    ///
    /// With [`LightCheck::None`] the current status is never trusted, so
    /// both `Start` and `End` always send their command.
    pub fn change(&mut self, event: LightEvent, source: Source) -> LightChange {
        let known = self.check != LightCheck::None;
        if source == Source::Sensor
            && event == LightEvent::End
            && self.on_by == Some(Source::Schedule)
        {
            return LightChange::Refused;
        }
        match event {
            LightEvent::Start => {
                if self.on_by != Some(Source::Schedule) {
                    self.on_by = Some(source);
                }
                if self.on_status && known {
                    LightChange::Unchanged
                } else {
                    self.on_status = true;
                    LightChange::TurnedOn(self.kind.command_for(event))
                }
            }
            LightEvent::End => {
                self.on_by = None;
                if self.on_status || !known {
                    self.on_status = false;
                    LightChange::TurnedOff(self.kind.command_for(event))
                } else {
                    LightChange::Unchanged
                }
            }
        }
    }
}
