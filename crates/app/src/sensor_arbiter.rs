//! Sensor arbiter: switches a sensor group's lights on while motion is
//! detected and releases them once the sensors have been quiet for the
//! group's timeout.
//!
//! The arbiter never talks to devices. It decides through
//! [`Light::change`] and hands back the commands to send; the controller
//! lends it the light table for the duration of one call.

use std::collections::HashMap;

use lightsched_domain::active_hours::ActiveHoursWindow;
use lightsched_domain::device::{Command, DeviceLevel};
use lightsched_domain::id::DeviceRef;
use lightsched_domain::light::{Light, LightEvent, Source};
use lightsched_domain::sensor::SensorGroup;
use lightsched_domain::time::{Timestamp, short_date_time};

/// A command the caller must forward to a device.
pub type Actuation = (DeviceRef, Command);

pub struct SensorArbiter {
    group: SensorGroup,
}

impl SensorArbiter {
    #[must_use]
    pub fn new(group: SensorGroup) -> Self {
        Self { group }
    }

    #[must_use]
    pub fn group(&self) -> &SensorGroup {
        &self.group
    }

    #[must_use]
    pub fn watches(&self, device: &DeviceRef) -> bool {
        self.group.watches(device)
    }

    /// React to a sensor reporting `level` at `now`.
    ///
    /// Motion cancels any pending release and, inside active hours, starts
    /// every watched light. Quiet arms the release, but only once a light
    /// was actually switched on by a sensor.
    pub fn on_sensor_level(
        &mut self,
        level: DeviceLevel,
        now: Timestamp,
        active_hours: Option<&ActiveHoursWindow>,
        lights: &mut HashMap<DeviceRef, Light>,
    ) -> Vec<Actuation> {
        if !level.is_on() {
            if self.group.triggered {
                self.group.arm_off(now);
                tracing::debug!(
                    at = %short_date_time(self.group.pending_off_at),
                    "sensors quiet, release armed"
                );
            } else {
                tracing::debug!("sensor off ignored, group not triggered");
            }
            return Vec::new();
        }

        self.group.cancel_off();
        if active_hours.is_some_and(|window| !window.contains(now)) {
            tracing::debug!("sensor on outside active hours, ignored");
            return Vec::new();
        }

        let actuations = self.change_all(LightEvent::Start, lights);
        if !actuations.is_empty() {
            self.group.triggered = true;
        }
        tracing::info!(turned_on = actuations.len(), "sensor triggered");
        actuations
    }

    /// Release the group's lights when the armed timeout has expired.
    pub fn release_if_due(
        &mut self,
        now: Timestamp,
        lights: &mut HashMap<DeviceRef, Light>,
    ) -> Vec<Actuation> {
        if !self.group.off_due(now) {
            return Vec::new();
        }
        self.group.reset();
        let actuations = self.change_all(LightEvent::End, lights);
        tracing::info!(turned_off = actuations.len(), "sensor timeout expired");
        actuations
    }

    /// Drop trigger state and any armed release.
    pub fn reset(&mut self) {
        self.group.reset();
    }

    fn change_all(
        &self,
        event: LightEvent,
        lights: &mut HashMap<DeviceRef, Light>,
    ) -> Vec<Actuation> {
        self.group
            .lights
            .iter()
            .filter_map(|device| {
                let light = lights.get_mut(device)?;
                let change = light.change(event, Source::Sensor);
                tracing::debug!(device = %device, %event, ?change, "sensor light change");
                change.command().map(|command| (device.clone(), command))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::london_at;
    use chrono::TimeDelta;
    use lightsched_domain::light::{LightChange, LightKind};

    fn lights() -> HashMap<DeviceRef, Light> {
        ["hall", "porch"]
            .into_iter()
            .map(|name| {
                let device = DeviceRef::from(name);
                (device.clone(), Light::new(device, LightKind::Binary))
            })
            .collect()
    }

    fn arbiter() -> SensorArbiter {
        SensorArbiter::new(
            SensorGroup::new(
                vec![DeviceRef::from("motion-1")],
                [DeviceRef::from("hall"), DeviceRef::from("porch")],
                TimeDelta::seconds(60),
            )
            .unwrap(),
        )
    }

    /// Sun 16:00 -> Mon 06:00.
    fn window() -> ActiveHoursWindow {
        ActiveHoursWindow {
            start: london_at(2017, 10, 8, 16, 0),
            end: london_at(2017, 10, 9, 6, 0),
            next_start: london_at(2017, 10, 9, 16, 0),
            next_end: london_at(2017, 10, 10, 6, 0),
        }
    }

    fn evening() -> Timestamp {
        london_at(2017, 10, 8, 20, 0)
    }

    #[test]
    fn should_turn_on_watched_lights_inside_active_hours() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        let actuations =
            arbiter.on_sensor_level(DeviceLevel::On, evening(), Some(&window()), &mut lights);
        assert_eq!(
            actuations,
            vec![
                (DeviceRef::from("hall"), Command::On),
                (DeviceRef::from("porch"), Command::On)
            ]
        );
        assert!(arbiter.group().triggered);
        assert_eq!(lights[&DeviceRef::from("hall")].on_by, Some(Source::Sensor));
    }

    #[test]
    fn should_ignore_motion_outside_active_hours() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        let noon = london_at(2017, 10, 8, 12, 0);
        let actuations =
            arbiter.on_sensor_level(DeviceLevel::On, noon, Some(&window()), &mut lights);
        assert!(actuations.is_empty());
        assert!(!arbiter.group().triggered);
    }

    #[test]
    fn should_ignore_off_when_not_triggered() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        arbiter.on_sensor_level(DeviceLevel::Off, evening(), None, &mut lights);
        assert_eq!(arbiter.group().pending_off_at, None);
    }

    #[test]
    fn should_release_lights_after_timeout() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        arbiter.on_sensor_level(DeviceLevel::On, evening(), None, &mut lights);
        arbiter.on_sensor_level(DeviceLevel::Off, evening(), None, &mut lights);

        let early = evening() + TimeDelta::seconds(30);
        assert!(arbiter.release_if_due(early, &mut lights).is_empty());

        let due = evening() + TimeDelta::seconds(60);
        let actuations = arbiter.release_if_due(due, &mut lights);
        assert_eq!(actuations.len(), 2);
        assert!(!arbiter.group().triggered);
        assert!(!lights[&DeviceRef::from("porch")].on_status);
    }

    #[test]
    fn should_cancel_pending_release_on_new_motion() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        arbiter.on_sensor_level(DeviceLevel::On, evening(), None, &mut lights);
        arbiter.on_sensor_level(DeviceLevel::Off, evening(), None, &mut lights);
        let again = evening() + TimeDelta::seconds(30);
        assert!(
            arbiter
                .on_sensor_level(DeviceLevel::On, again, None, &mut lights)
                .is_empty()
        );
        assert!(arbiter.group().triggered);
        assert!(
            arbiter
                .release_if_due(evening() + TimeDelta::hours(1), &mut lights)
                .is_empty()
        );
    }

    #[test]
    fn should_not_turn_off_light_the_schedule_owns() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        arbiter.on_sensor_level(DeviceLevel::On, evening(), None, &mut lights);
        let hall = lights.get_mut(&DeviceRef::from("hall")).unwrap();
        assert_eq!(
            hall.change(LightEvent::Start, Source::Schedule),
            LightChange::Unchanged
        );

        arbiter.on_sensor_level(DeviceLevel::Off, evening(), None, &mut lights);
        let actuations =
            arbiter.release_if_due(evening() + TimeDelta::seconds(60), &mut lights);

        assert_eq!(actuations, vec![(DeviceRef::from("porch"), Command::Off)]);
        assert!(lights[&DeviceRef::from("hall")].on_status);
    }

    #[test]
    fn should_not_trigger_when_lights_were_already_on() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        for light in lights.values_mut() {
            light.observe(DeviceLevel::On);
        }
        let actuations = arbiter.on_sensor_level(DeviceLevel::On, evening(), None, &mut lights);
        assert!(actuations.is_empty());
        assert!(!arbiter.group().triggered);
    }

    #[test]
    fn should_treat_multilevel_sensor_level_as_motion() {
        let mut arbiter = arbiter();
        let mut lights = lights();
        let actuations =
            arbiter.on_sensor_level(DeviceLevel::Level(99), evening(), None, &mut lights);
        assert_eq!(actuations.len(), 2);
    }
}
