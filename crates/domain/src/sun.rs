//! Solar anchors: where the house is and when the sun rises and sets there.

use serde::{Deserialize, Serialize};

use crate::error::EphemerisError;
use crate::time::Timestamp;

/// Geographic position used to compute sunrise and sunset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Create a location, rejecting out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`EphemerisError::InvalidLocation`] when the latitude is not in
    /// `-90..=90` or the longitude is not in `-180..=180`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, EphemerisError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(EphemerisError::InvalidLocation {
                latitude: latitude.to_string(),
                longitude: longitude.to_string(),
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Sunrise and sunset for one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: Timestamp,
    pub sunset: Timestamp,
}
