//! # lightsched-adapter-system
//!
//! Adapters backed by the host system.
//!
//! | Port | Adapter | Backing |
//! |------|---------|---------|
//! | `Clock` | [`TokioClock`] | system time, one tokio interval task per tick subscription |
//! | `Ephemeris` | [`SunriseEphemeris`] | the `sunrise` crate |
//!
//! ## Dependency rule
//!
//! Depends on `lightsched-app` (port traits) and `lightsched-domain` only.

mod clock;
mod ephemeris;
mod error;

pub use clock::TokioClock;
pub use ephemeris::SunriseEphemeris;
pub use error::SolarError;
