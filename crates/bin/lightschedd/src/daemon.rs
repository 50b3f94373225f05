//! Daemon wiring: builds the adapters and the controller, and runs the
//! event loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lightsched_adapter_system::{SunriseEphemeris, TokioClock};
use lightsched_adapter_virtual::{
    VirtualDevice, VirtualDeviceError, VirtualDevices, VirtualLight, VirtualMotionSensor,
    VirtualPresence,
};
use lightsched_app::controller::{Attempt, ScheduleController, StartOutcome};
use lightsched_app::event_bus::InProcessEventBus;
use lightsched_app::schedule::RngJitter;
use lightsched_domain::event::Event;
use rand::rngs::StdRng;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

use crate::config::{Config, ConfigError};

const BUS_CAPACITY: usize = 256;

pub type Controller = ScheduleController<
    Arc<TokioClock>,
    SunriseEphemeris,
    Arc<VirtualPresence>,
    Arc<VirtualDevices>,
    RngJitter<StdRng>,
>;

/// Every long-lived component of the running daemon.
pub struct Daemon {
    pub bus: InProcessEventBus,
    pub clock: Arc<TokioClock>,
    pub presence: Arc<VirtualPresence>,
    pub devices: Arc<VirtualDevices>,
    pub controller: Controller,
    device_wait: Duration,
}

impl Daemon {
    /// Wire adapters and the controller. Nothing is subscribed yet.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration does not validate.
    pub fn build(config: &Config) -> Result<Self, ConfigError> {
        let settings = config.scheduler_settings()?;
        let tz = config.timezone()?;
        let bus = InProcessEventBus::new(BUS_CAPACITY);
        let clock = Arc::new(TokioClock::new(tz, bus.clone()));
        let presence = Arc::new(VirtualPresence::new(config.demo.presence, bus.clone()));
        let devices = Arc::new(VirtualDevices::new(bus.clone()));
        let controller = ScheduleController::new(
            Arc::clone(&clock),
            SunriseEphemeris::new(tz),
            Arc::clone(&presence),
            Arc::clone(&devices),
            RngJitter::from_entropy(),
            settings,
        );
        Ok(Self {
            bus,
            clock,
            presence,
            devices,
            controller,
            device_wait: config.device_wait(),
        })
    }

    /// Create one virtual device per configured light and sensor.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualDeviceError::Duplicate`] when a name is used for
    /// both a light and a sensor.
    pub fn add_demo_devices(&self, config: &Config) -> Result<(), VirtualDeviceError> {
        let (lights, sensors) = config.demo_devices();
        for (name, dimmable) in lights {
            let light = if dimmable {
                VirtualLight::dimmer()
            } else {
                VirtualLight::binary()
            };
            self.devices.add(name, VirtualDevice::Light(light))?;
        }
        for name in sensors {
            self.devices
                .add(name, VirtualDevice::MotionSensor(VirtualMotionSensor::default()))?;
        }
        Ok(())
    }

    /// Start the schedule, giving late devices one chance to show up.
    pub async fn start(&mut self) {
        if let StartOutcome::Deferred { missing } = self.controller.start(Attempt::First) {
            tracing::info!(
                missing = missing.len(),
                wait = ?self.device_wait,
                "waiting for devices before starting"
            );
            tokio::time::sleep(self.device_wait).await;
            self.controller.start(Attempt::Final);
        }
    }

    /// Feed bus events to the controller until `shutdown` completes or the
    /// bus closes.
    pub async fn run(&mut self, events: &mut Receiver<Event>, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        tracing::trace!(%event, "event received");
                        self.controller.handle_event(&event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event loop lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    /// Release every subscription.
    pub fn stop(&mut self) {
        self.controller.stop();
    }
}
