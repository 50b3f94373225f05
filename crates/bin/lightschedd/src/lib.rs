//! # lightschedd: lighting scheduler daemon
//!
//! Composition root that wires all adapters together and runs the schedule.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Construct the system adapters (clock, ephemeris) and the virtual demo
//!   integration (devices, presence)
//! - Construct the schedule controller, injecting adapters via port traits
//! - Run the deferred start-up, then feed bus events to the controller
//! - Handle graceful shutdown, releasing every subscription
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

pub mod config;
pub mod daemon;
