//! Identifier types.
//!
//! Opaque handles (subscriptions, occurrences) are UUID-backed newtypes;
//! device references are the string names the home-automation platform
//! uses for its devices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(
    /// Handle returned by every port `subscribe`/`schedule` call, used to
    /// cancel the registration again.
    SubscriptionId
);

define_id!(
    /// Identity of one computed [`ScheduledOccurrence`](crate::schedule::ScheduledOccurrence).
    ///
    /// Clearing a fired field keeps the id; a recompute mints a new one, which
    /// is how stale queue entries are recognised.
    OccurrenceId
);

/// Platform reference of a light or sensor device (e.g. `ZWayVDev_zway_15-0-37`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceRef(String);

impl DeviceRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
