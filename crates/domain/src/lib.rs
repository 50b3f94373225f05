//! # lightsched-domain
//!
//! Pure domain model for the lightsched lighting scheduler.
//!
//! ## Responsibilities
//! - Foundational types: identifiers, error conventions, zoned timestamps
//! - Define **schedule entries** (light, presence filter, days, start/end
//!   anchors) and the **occurrences** computed from them
//! - Define **time specs** (clock times and sunrise/sunset offsets)
//! - Define **active hours** and the clamping of periods into them
//! - Define **lights** and the start/end decision shared by schedule and
//!   sensors
//! - Define **sensor groups**, **presence** and the bus **events**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod active_hours;
pub mod device;
pub mod event;
pub mod light;
pub mod presence;
pub mod schedule;
pub mod sensor;
pub mod sun;
