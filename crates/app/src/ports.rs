//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the scheduling core and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod devices;
pub mod ephemeris;
pub mod event_bus;
pub mod presence;

pub use clock::Clock;
pub use devices::DeviceRegistry;
pub use ephemeris::Ephemeris;
pub use event_bus::EventPublisher;
pub use presence::PresenceSource;
