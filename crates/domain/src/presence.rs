//! Presence: the household occupancy mode and the per-entry filter on it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Occupancy mode reported by the presence source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceMode {
    #[default]
    Home,
    Away,
    Vacation,
    /// At home and asleep; schedules treat it as [`Home`](Self::Home).
    Night,
    None,
}

impl PresenceMode {
    /// Collapse modes the scheduler does not distinguish.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Night => Self::Home,
            other => other,
        }
    }
}

impl std::fmt::Display for PresenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => f.write_str("home"),
            Self::Away => f.write_str("away"),
            Self::Vacation => f.write_str("vacation"),
            Self::Night => f.write_str("night"),
            Self::None => f.write_str("none"),
        }
    }
}

impl FromStr for PresenceMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "away" => Ok(Self::Away),
            "vacation" => Ok(Self::Vacation),
            "night" => Ok(Self::Night),
            "none" => Ok(Self::None),
            _ => Err(ValidationError::UnknownPresence(s.to_string())),
        }
    }
}

/// Which presence modes a schedule entry runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceFilter {
    #[default]
    Any,
    Home,
    Away,
    Vacation,
    /// Runs only while no presence mode is set.
    None,
}

impl PresenceFilter {
    /// Whether an entry with this filter is active under `mode`.
    ///
    /// `away` entries also run while on vacation.
    #[must_use]
    pub fn is_active(self, mode: PresenceMode) -> bool {
        match (self, mode.normalized()) {
            (Self::Any, _)
            | (Self::Home, PresenceMode::Home)
            | (Self::Away, PresenceMode::Away | PresenceMode::Vacation)
            | (Self::Vacation, PresenceMode::Vacation)
            | (Self::None, PresenceMode::None) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PresenceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Home => f.write_str("home"),
            Self::Away => f.write_str("away"),
            Self::Vacation => f.write_str("vacation"),
            Self::None => f.write_str("none"),
        }
    }
}

impl FromStr for PresenceFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "home" => Ok(Self::Home),
            "away" => Ok(Self::Away),
            "vacation" => Ok(Self::Vacation),
            "none" => Ok(Self::None),
            _ => Err(ValidationError::UnknownPresence(s.to_string())),
        }
    }
}
