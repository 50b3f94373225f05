//! # lightsched-app
//!
//! Application layer: the scheduling engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Clock`: current time and periodic ticks
//!   - `Ephemeris`: sunrise/sunset per date and location
//!   - `PresenceSource`: household presence mode and its changes
//!   - `DeviceRegistry`: device lookup, commands and level notifications
//!   - `EventPublisher`: publish events on the bus
//! - Compute schedules: time resolution, active hours, occurrences and the
//!   ordered event queue
//! - Arbitrate between the schedule and motion sensors driving the same lights
//! - Provide the driving `ScheduleController` that reacts to bus events
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `lightsched-domain` only (plus `tokio::sync` for channels and
//! `rand` for jitter). Never imports adapter crates. Adapters depend on
//! *this* crate, not the reverse.

pub mod controller;
pub mod event_bus;
pub mod ports;
pub mod schedule;
pub mod sensor_arbiter;

#[cfg(test)]
mod testing;
