//! Schedule controller: owns the timetable state and reacts to bus events.
//!
//! The controller is the only place schedule state is mutated. Every handler
//! takes `&mut self` and runs to completion, so ticks, presence changes and
//! sensor reports never interleave. Device commands are the only `await`
//! points.
//!
//! Lifecycle:
//! 1. [`start`](ScheduleController::start) with [`Attempt::First`] defers
//!    when a configured device is not known yet
//! 2. [`start`](ScheduleController::start) with [`Attempt::Final`] drops
//!    whatever is still missing and registers tick, presence and level
//!    subscriptions
//! 3. [`handle_event`](ScheduleController::handle_event) for every bus event
//! 4. [`stop`](ScheduleController::stop) releases every registration

use std::collections::HashMap;
use std::time::Duration;

use chrono::TimeDelta;
use lightsched_domain::active_hours::{ActiveHoursSpec, ActiveHoursWindow};
use lightsched_domain::device::{Command, DeviceLevel};
use lightsched_domain::event::Event;
use lightsched_domain::id::{DeviceRef, SubscriptionId};
use lightsched_domain::light::{Light, LightChange, LightCheck, LightEvent, LightKind, Source};
use lightsched_domain::presence::PresenceMode;
use lightsched_domain::schedule::{EventKind, ScheduleEntry, ScheduledOccurrence};
use lightsched_domain::sensor::SensorGroup;
use lightsched_domain::sun::Location;
use lightsched_domain::time::{Timestamp, day_and_time, shift_days};

use crate::ports::{Clock, DeviceRegistry, Ephemeris, PresenceSource};
use crate::schedule::occurrence::OccurrenceContext;
use crate::schedule::{
    ActiveHoursCalculator, EventQueue, EventQueueEntry, Jitter, OccurrenceCalculator,
    TimeResolver,
};
use crate::sensor_arbiter::{Actuation, SensorArbiter};

/// Sensor group as configured, before devices are checked.
#[derive(Debug, Clone)]
pub struct SensorSettings {
    pub sensors: Vec<DeviceRef>,
    /// Empty means every timetable light.
    pub lights: Vec<DeviceRef>,
    pub timeout: TimeDelta,
}

/// Static configuration of a controller.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub entries: Vec<ScheduleEntry>,
    /// Actuation kind per light; unlisted lights are binary.
    pub lights: Vec<(DeviceRef, LightKind)>,
    pub active_hours: Option<ActiveHoursSpec>,
    pub sensor: Option<SensorSettings>,
    pub location: Option<Location>,
    pub poll_interval: Duration,
    pub max_random_minutes: u32,
    pub light_check: LightCheck,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            lights: Vec::new(),
            active_hours: None,
            sensor: None,
            location: None,
            poll_interval: Duration::from_secs(60),
            max_random_minutes: 15,
            light_check: LightCheck::default(),
        }
    }
}

/// Which start-up attempt is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Defer when any configured device is missing.
    First,
    /// Drop missing devices and start with what is left.
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Nothing was registered; retry with [`Attempt::Final`].
    Deferred { missing: Vec<DeviceRef> },
}

struct Subscriptions {
    tick: SubscriptionId,
    presence: SubscriptionId,
    levels: Vec<SubscriptionId>,
}

/// Schedule state that only exists while the controller runs.
struct Running {
    entries: Vec<ScheduleEntry>,
    /// One per entry, same index ("slot").
    occurrences: Vec<ScheduledOccurrence>,
    queue: EventQueue,
    lights: HashMap<DeviceRef, Light>,
    arbiter: Option<SensorArbiter>,
    active_hours: Option<ActiveHoursWindow>,
    presence: PresenceMode,
    subscriptions: Subscriptions,
}

/// Parameters shared by every occurrence computation of one handler run.
struct Recompute<'a, 'r, E> {
    now: Timestamp,
    resolver: &'a TimeResolver<'r, E>,
    max_random_minutes: u32,
}

impl Running {
    fn compute<E: Ephemeris>(
        &self,
        slot: usize,
        params: &Recompute<'_, '_, E>,
        jitter: &mut dyn Jitter,
    ) -> ScheduledOccurrence {
        let entry = &self.entries[slot];
        let ctx = OccurrenceContext {
            now: params.now,
            presence: self.presence,
            active_hours: self.active_hours.as_ref(),
            resolver: params.resolver,
            max_random_minutes: params.max_random_minutes,
        };
        OccurrenceCalculator::compute(entry, &ctx, jitter).unwrap_or_else(|err| {
            tracing::warn!(
                entry = entry.seq,
                error = %err,
                "cannot resolve schedule times, retrying in a day"
            );
            ScheduledOccurrence {
                active: true,
                reschedule_at: Some(shift_days(params.now, 1)),
                ..ScheduledOccurrence::dormant(entry.seq, entry.light.clone())
            }
        })
    }

    fn reschedule<E: Ephemeris>(
        &mut self,
        slot: usize,
        params: &Recompute<'_, '_, E>,
        jitter: &mut dyn Jitter,
    ) {
        let occurrence = self.compute(slot, params, jitter);
        tracing::info!(entry = occurrence.entry, "scheduling {}", occurrence.summary());
        self.queue.schedule(slot, &occurrence);
        self.occurrences[slot] = occurrence;
    }

    fn reschedule_all<E: Ephemeris>(
        &mut self,
        params: &Recompute<'_, '_, E>,
        jitter: &mut dyn Jitter,
    ) {
        for slot in 0..self.entries.len() {
            self.reschedule(slot, params, jitter);
        }
    }

    /// Recompute the active-hours window, falling back to the previous one
    /// moved forward by whole days.
    fn refresh_active_hours<E: Ephemeris>(
        &mut self,
        spec: &ActiveHoursSpec,
        now: Timestamp,
        resolver: &TimeResolver<'_, E>,
    ) {
        self.active_hours = match ActiveHoursCalculator::compute(now, spec, resolver) {
            Ok(window) => Some(window),
            Err(err) => {
                let fallback = self.active_hours.map(|previous| {
                    let days = (now - previous.end).num_days() + 1;
                    previous.shifted(days.max(1))
                });
                tracing::warn!(
                    error = %err,
                    fallback = fallback.is_some(),
                    "cannot compute active hours"
                );
                fallback
            }
        };
        if let Some(window) = &self.active_hours {
            tracing::info!(
                "active hours: {} -> {}",
                day_and_time(Some(window.start)),
                day_and_time(Some(window.end))
            );
        }
    }

    /// Mark a due queue entry as fired. Returns `None` for stale entries.
    fn take_due(&mut self, due: &EventQueueEntry) -> Option<DeviceRef> {
        let current = self.occurrences.get(due.slot)?;
        if current.id != due.occurrence || current.time_of(due.kind).is_none() {
            tracing::debug!(slot = due.slot, kind = %due.kind, "stale queue entry ignored");
            return None;
        }
        let light = current.light.clone();
        self.occurrences[due.slot] = current.without(due.kind);
        Some(light)
    }
}

/// Refresh a light from its device if configured to, then apply `event`.
///
/// A command the device rejects leaves the light as it was before.
async fn switch_light<D: DeviceRegistry>(
    devices: &D,
    check: LightCheck,
    light: &mut Light,
    event: LightEvent,
    source: Source,
) -> LightChange {
    if check == LightCheck::Query {
        if let Some(level) = devices.level(&light.device) {
            light.observe(level);
        }
    }
    let before = light.clone();
    let change = light.change(event, source);
    match change.command() {
        Some(command) => {
            if !perform(devices, &light.device, command).await {
                *light = before;
            }
        }
        None => {
            tracing::debug!(device = %light.device, %event, %source, ?change, "no command needed");
        }
    }
    change
}

/// Send `command`, returning whether the device accepted it.
async fn perform<D: DeviceRegistry>(devices: &D, device: &DeviceRef, command: Command) -> bool {
    match devices.perform(device, command).await {
        Ok(()) => {
            tracing::info!(device = %device, %command, "light changed");
            true
        }
        Err(err) => {
            tracing::error!(device = %device, %command, error = %err, "command failed");
            false
        }
    }
}

/// Send sensor actuations, restoring from `before` every light whose
/// command failed.
async fn perform_all<D: DeviceRegistry>(
    devices: &D,
    actuations: Vec<Actuation>,
    lights: &mut HashMap<DeviceRef, Light>,
    before: &HashMap<DeviceRef, Light>,
) {
    for (device, command) in actuations {
        if perform(devices, &device, command).await {
            continue;
        }
        if let (Some(light), Some(previous)) = (lights.get_mut(&device), before.get(&device)) {
            *light = previous.clone();
        }
    }
}

/// Drives schedule entries, presence and sensors through the ports.
pub struct ScheduleController<C, E, P, D, J> {
    clock: C,
    ephemeris: E,
    presence: P,
    devices: D,
    jitter: J,
    settings: SchedulerSettings,
    state: Option<Running>,
}

impl<C, E, P, D, J> ScheduleController<C, E, P, D, J>
where
    C: Clock,
    E: Ephemeris,
    P: PresenceSource,
    D: DeviceRegistry,
    J: Jitter,
{
    /// Create a stopped controller.
    pub fn new(
        clock: C,
        ephemeris: E,
        presence: P,
        devices: D,
        jitter: J,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            clock,
            ephemeris,
            presence,
            devices,
            jitter,
            settings,
            state: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// Every device the configuration refers to, deduplicated.
    fn configured_devices(&self) -> Vec<DeviceRef> {
        let mut devices: Vec<DeviceRef> = Vec::new();
        let settings = &self.settings;
        let sensor_devices = settings
            .sensor
            .iter()
            .flat_map(|s| s.sensors.iter().chain(s.lights.iter()));
        for device in settings
            .entries
            .iter()
            .map(|e| &e.light)
            .chain(settings.lights.iter().map(|(d, _)| d))
            .chain(sensor_devices)
        {
            if !devices.contains(device) {
                devices.push(device.clone());
            }
        }
        devices
    }

    fn build_sensor_arbiter(&self, entries: &[ScheduleEntry]) -> Option<SensorArbiter> {
        let sensor = self.settings.sensor.as_ref()?;
        let sensors: Vec<DeviceRef> = sensor
            .sensors
            .iter()
            .filter(|d| self.devices.contains(d))
            .cloned()
            .collect();
        if sensors.is_empty() {
            tracing::warn!("no sensor device available, sensor triggering disabled");
            return None;
        }
        let lights: Vec<DeviceRef> = if sensor.lights.is_empty() {
            entries.iter().map(|e| e.light.clone()).collect()
        } else {
            sensor
                .lights
                .iter()
                .filter(|d| self.devices.contains(d))
                .cloned()
                .collect()
        };
        if lights.is_empty() {
            tracing::warn!("no lights picked for the sensor group");
        }
        match SensorGroup::new(sensors, lights, sensor.timeout) {
            Ok(group) => Some(SensorArbiter::new(group)),
            Err(err) => {
                tracing::warn!(error = %err, "sensor group disabled");
                None
            }
        }
    }

    fn kind_of(&self, device: &DeviceRef) -> LightKind {
        self.settings
            .lights
            .iter()
            .find(|(d, _)| d == device)
            .map_or(LightKind::Binary, |(_, kind)| *kind)
    }

    /// Start scheduling.
    ///
    /// Restarting a running controller stops it first.
    pub fn start(&mut self, attempt: Attempt) -> StartOutcome {
        if self.state.is_some() {
            self.stop();
        }

        let missing: Vec<DeviceRef> = self
            .configured_devices()
            .into_iter()
            .filter(|d| !self.devices.contains(d))
            .collect();
        if !missing.is_empty() {
            if attempt == Attempt::First {
                tracing::info!(missing = missing.len(), "devices not ready yet, deferring start");
                return StartOutcome::Deferred { missing };
            }
            for device in &missing {
                tracing::error!(device = %device, "device still missing after waiting, dropped");
            }
        }

        let entries: Vec<ScheduleEntry> = self
            .settings
            .entries
            .iter()
            .filter(|e| self.devices.contains(&e.light))
            .cloned()
            .collect();
        let arbiter = self.build_sensor_arbiter(&entries);

        let mut lights = HashMap::new();
        let watched = arbiter.iter().flat_map(|a| a.group().lights.iter());
        for device in entries.iter().map(|e| &e.light).chain(watched) {
            if lights.contains_key(device) {
                continue;
            }
            let mut light = Light::new(device.clone(), self.kind_of(device))
                .with_check(self.settings.light_check);
            if let Some(level) = self.devices.level(device) {
                light.observe(level);
            }
            lights.insert(device.clone(), light);
        }

        let mut levels = Vec::new();
        let sensors = arbiter.iter().flat_map(|a| a.group().sensors.iter());
        for device in lights.keys().chain(sensors) {
            match self.devices.subscribe_level(device) {
                Ok(id) => levels.push(id),
                Err(err) => {
                    tracing::warn!(device = %device, error = %err, "cannot watch device level");
                }
            }
        }
        let subscriptions = Subscriptions {
            tick: self.clock.schedule_tick(self.settings.poll_interval),
            presence: self.presence.subscribe(),
            levels,
        };

        let presence = self.presence.mode().normalized();
        tracing::info!(%presence, entries = entries.len(), "starting schedule");
        let occurrences = entries
            .iter()
            .map(|e| ScheduledOccurrence::dormant(e.seq, e.light.clone()))
            .collect();
        self.state = Some(Running {
            entries,
            occurrences,
            queue: EventQueue::new(),
            lights,
            arbiter,
            active_hours: None,
            presence,
            subscriptions,
        });

        let now = self.clock.now();
        self.refresh_active_hours(now);
        self.reschedule_all(now);
        StartOutcome::Started
    }

    /// Release every registration and forget the schedule state.
    pub fn stop(&mut self) {
        let Some(mut running) = self.state.take() else {
            return;
        };
        self.clock.cancel_tick(running.subscriptions.tick);
        self.presence.unsubscribe(running.subscriptions.presence);
        for id in running.subscriptions.levels.drain(..) {
            self.devices.unsubscribe(id);
        }
        if let Some(arbiter) = running.arbiter.as_mut() {
            arbiter.reset();
        }
        running.queue.clear();
        tracing::info!("schedule stopped");
    }

    /// Dispatch one bus event.
    pub async fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Tick => self.tick().await,
            Event::PresenceChanged { mode } => self.on_presence_change(*mode),
            Event::LevelChanged { device, level } => self.on_level_changed(device, *level).await,
        }
    }

    /// Fire everything that is due.
    ///
    /// When the active-hours window has ended, events up to its end fire
    /// first, then the window and every entry are recomputed before the
    /// rest of the queue is considered.
    pub async fn tick(&mut self) {
        let Some(running) = &self.state else {
            return;
        };
        let now = self.clock.now();
        let ended = running.active_hours.map(|w| w.end).filter(|end| now > *end);
        if let Some(end) = ended {
            self.drain(end, now).await;
            self.refresh_active_hours(now);
            self.reschedule_all(now);
        }
        self.drain(now, now).await;
        self.release_sensors(now).await;
    }

    /// Apply a presence report. Only a change of the normalized mode
    /// recomputes the schedule.
    pub fn on_presence_change(&mut self, mode: PresenceMode) {
        let mode = mode.normalized();
        let Some(running) = self.state.as_mut() else {
            return;
        };
        if running.presence == mode {
            tracing::debug!(%mode, "presence unchanged");
            return;
        }
        tracing::info!(from = %running.presence, to = %mode, "presence changed");
        running.presence = mode;
        let now = self.clock.now();
        self.reschedule_all(now);
    }

    async fn on_level_changed(&mut self, device: &DeviceRef, level: DeviceLevel) {
        let Self {
            clock,
            devices,
            settings,
            state: Some(running),
            ..
        } = self
        else {
            return;
        };
        if let Some(light) = running.lights.get_mut(device) {
            light.observe(level);
            tracing::debug!(device = %device, %level, "light level observed");
        }
        let Some(arbiter) = running.arbiter.as_mut() else {
            return;
        };
        if !arbiter.watches(device) {
            return;
        }
        if settings.light_check == LightCheck::Query {
            for watched in &arbiter.group().lights {
                if let (Some(light), Some(level)) =
                    (running.lights.get_mut(watched), devices.level(watched))
                {
                    light.observe(level);
                }
            }
        }
        let before = running.lights.clone();
        let actuations = arbiter.on_sensor_level(
            level,
            clock.now(),
            running.active_hours.as_ref(),
            &mut running.lights,
        );
        perform_all(&*devices, actuations, &mut running.lights, &before).await;
    }

    async fn release_sensors(&mut self, now: Timestamp) {
        let Self {
            devices,
            state: Some(running),
            ..
        } = self
        else {
            return;
        };
        let Some(arbiter) = running.arbiter.as_mut() else {
            return;
        };
        let before = running.lights.clone();
        let actuations = arbiter.release_if_due(now, &mut running.lights);
        perform_all(&*devices, actuations, &mut running.lights, &before).await;
    }

    /// Fire every queued event up to `until`, recomputing at `now`.
    async fn drain(&mut self, until: Timestamp, now: Timestamp) {
        let Self {
            clock,
            ephemeris,
            devices,
            jitter,
            settings,
            state: Some(running),
            ..
        } = self
        else {
            return;
        };
        let resolver = TimeResolver::new(&*ephemeris, settings.location, clock.timezone());
        let params = Recompute {
            now,
            resolver: &resolver,
            max_random_minutes: settings.max_random_minutes,
        };
        loop {
            let due = running.queue.advance(until);
            if due.is_empty() {
                break;
            }
            for entry in due {
                let Some(device) = running.take_due(&entry) else {
                    continue;
                };
                let event = match entry.kind {
                    EventKind::Start => LightEvent::Start,
                    EventKind::End => LightEvent::End,
                    EventKind::Reschedule => {
                        running.reschedule(entry.slot, &params, &mut *jitter);
                        continue;
                    }
                };
                tracing::debug!(
                    slot = entry.slot,
                    %event,
                    at = %day_and_time(Some(entry.time)),
                    "schedule event due"
                );
                if let Some(light) = running.lights.get_mut(&device) {
                    switch_light(&*devices, settings.light_check, light, event, Source::Schedule)
                        .await;
                }
            }
        }
    }

    fn refresh_active_hours(&mut self, now: Timestamp) {
        let Self {
            clock,
            ephemeris,
            settings,
            state: Some(running),
            ..
        } = self
        else {
            return;
        };
        if let Some(spec) = &settings.active_hours {
            let resolver = TimeResolver::new(&*ephemeris, settings.location, clock.timezone());
            running.refresh_active_hours(spec, now, &resolver);
        }
    }

    fn reschedule_all(&mut self, now: Timestamp) {
        let Self {
            clock,
            ephemeris,
            jitter,
            settings,
            state: Some(running),
            ..
        } = self
        else {
            return;
        };
        let resolver = TimeResolver::new(&*ephemeris, settings.location, clock.timezone());
        let params = Recompute {
            now,
            resolver: &resolver,
            max_random_minutes: settings.max_random_minutes,
        };
        running.reschedule_all(&params, &mut *jitter);
    }

    /// Current occurrences, one per scheduled entry.
    #[must_use]
    pub fn occurrences(&self) -> &[ScheduledOccurrence] {
        self.state.as_ref().map_or(&[], |r| r.occurrences.as_slice())
    }

    #[must_use]
    pub fn active_hours(&self) -> Option<ActiveHoursWindow> {
        self.state.as_ref().and_then(|r| r.active_hours)
    }

    #[must_use]
    pub fn light(&self, device: &DeviceRef) -> Option<&Light> {
        self.state.as_ref().and_then(|r| r.lights.get(device))
    }

    #[must_use]
    pub fn sensor_group(&self) -> Option<&SensorGroup> {
        self.state
            .as_ref()
            .and_then(|r| r.arbiter.as_ref())
            .map(SensorArbiter::group)
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.state.as_ref().map_or(0, |r| r.queue.len())
    }

    /// One line per entry, e.g. `#1 hall Sun 19:01 -> Mon 03:00`.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.occurrences()
            .iter()
            .map(ScheduledOccurrence::summary)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lightsched_domain::presence::PresenceFilter;
    use lightsched_domain::schedule::DaySet;

    use super::*;
    use crate::testing::{
        FixedJitter, FixedPresence, ManualClock, RecordingDevices, TableEphemeris, london_at,
    };

    type TestController = ScheduleController<
        Arc<ManualClock>,
        Arc<TableEphemeris>,
        Arc<FixedPresence>,
        Arc<RecordingDevices>,
        FixedJitter,
    >;

    struct Harness {
        clock: Arc<ManualClock>,
        presence: Arc<FixedPresence>,
        devices: Arc<RecordingDevices>,
        controller: TestController,
    }

    impl Harness {
        /// Sunday 8 October 2017, 09:01, everybody home.
        fn new(settings: SchedulerSettings) -> Self {
            Self::at(
                london_at(2017, 10, 8, 9, 1),
                TableEphemeris::autumn_2017(),
                settings,
            )
        }

        fn at(now: Timestamp, ephemeris: TableEphemeris, settings: SchedulerSettings) -> Self {
            let clock = Arc::new(ManualClock::at(now));
            let presence = Arc::new(FixedPresence::new(PresenceMode::Home));
            let devices = Arc::new(RecordingDevices::with(&[
                ("hall", DeviceLevel::Off),
                ("porch", DeviceLevel::Off),
                ("motion", DeviceLevel::Off),
            ]));
            let controller = ScheduleController::new(
                Arc::clone(&clock),
                Arc::new(ephemeris),
                Arc::clone(&presence),
                Arc::clone(&devices),
                FixedJitter::new(5),
                settings,
            );
            Self {
                clock,
                presence,
                devices,
                controller,
            }
        }

        fn started(settings: SchedulerSettings) -> Self {
            let mut harness = Self::new(settings);
            assert_eq!(harness.controller.start(Attempt::First), StartOutcome::Started);
            harness
        }

        /// Step the clock a minute at a time up to the next `hour:minute`,
        /// ticking after every step.
        async fn move_to(&mut self, hour: u32, minute: u32) {
            let target = self.clock.next_at(hour, minute);
            while self.clock.now() < target {
                self.clock.advance(TimeDelta::minutes(1));
                self.controller.tick().await;
            }
        }

        async fn sensor(&mut self, level: DeviceLevel) {
            let event = Event::LevelChanged {
                device: DeviceRef::from("motion"),
                level,
            };
            self.controller.handle_event(&event).await;
        }
    }

    fn entry(seq: usize, light: &str, start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry::builder()
            .seq(seq)
            .light(light)
            .start(start.parse().unwrap())
            .end(end.parse().unwrap())
            .build()
            .unwrap()
    }

    fn settings(entries: Vec<ScheduleEntry>) -> SchedulerSettings {
        SchedulerSettings {
            entries,
            location: Some(TableEphemeris::location()),
            ..SchedulerSettings::default()
        }
    }

    fn hall_evenings() -> SchedulerSettings {
        settings(vec![entry(1, "hall", "19:01", "03:00")])
    }

    fn evening_active_hours() -> Option<ActiveHoursSpec> {
        Some(ActiveHoursSpec {
            start: "16:00".parse().unwrap(),
            end: "06:00".parse().unwrap(),
        })
    }

    fn motion_group() -> Option<SensorSettings> {
        Some(SensorSettings {
            sensors: vec![DeviceRef::from("motion")],
            lights: Vec::new(),
            timeout: TimeDelta::seconds(60),
        })
    }

    // ── Schedule ───────────────────────────────────────────────────

    #[tokio::test]
    async fn should_switch_light_on_at_start_and_off_at_end() {
        let mut h = Harness::started(hall_evenings());
        assert_eq!(h.controller.describe(), vec!["#1 hall Sun 19:01 -> Mon 03:00"]);

        h.move_to(19, 0).await;
        assert!(h.devices.commands_for("hall").is_empty());

        h.move_to(19, 1).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);

        h.move_to(3, 0).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On, Command::Off]);
        assert_eq!(h.controller.describe(), vec!["#1 hall Mon 19:01 -> Tue 03:00"]);
    }

    #[tokio::test]
    async fn should_fire_each_event_once_when_ticked_twice() {
        let mut h = Harness::started(hall_evenings());
        h.clock.set(london_at(2017, 10, 8, 19, 1));
        h.controller.tick().await;
        h.controller.tick().await;
        assert_eq!(h.devices.times_set_to("hall", Command::On), 1);
    }

    #[tokio::test]
    async fn should_catch_up_start_and_end_after_a_long_gap() {
        let mut h = Harness::started(hall_evenings());
        h.clock.set(london_at(2017, 10, 9, 4, 0));
        h.controller.tick().await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On, Command::Off]);
        assert_eq!(h.controller.describe(), vec!["#1 hall Mon 19:01 -> Tue 03:00"]);
    }

    #[tokio::test]
    async fn should_keep_one_occurrence_per_entry() {
        let mut h = Harness::started(settings(vec![
            entry(1, "hall", "19:01", "03:00"),
            entry(2, "porch", "06:00", "07:00"),
        ]));
        assert_eq!(
            h.controller.describe(),
            vec![
                "#1 hall Sun 19:01 -> Mon 03:00",
                "#2 porch Mon 06:00 -> Mon 07:00",
            ]
        );
        h.move_to(7, 0).await;
        assert_eq!(h.devices.commands_for("porch"), vec![Command::On, Command::Off]);
        assert_eq!(h.controller.occurrences().len(), 2);
        assert_eq!(h.controller.pending_events(), 6);
    }

    #[tokio::test]
    async fn should_skip_invalid_days_and_randomize_valid_ones() {
        let mut weekdays = entry(1, "hall", "19:01", "03:00");
        weekdays.days = DaySet::weekdays();
        weekdays.randomize = true;
        let mut h = Harness::started(settings(vec![weekdays]));
        assert_eq!(h.controller.describe(), vec!["#1 hall will reschedule at Mon 03:00"]);

        h.move_to(3, 0).await;
        assert_eq!(h.controller.describe(), vec!["#1 hall Mon 19:06 -> Tue 02:55"]);
        assert!(h.devices.commands_for("hall").is_empty());

        h.move_to(19, 6).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
        h.move_to(2, 55).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On, Command::Off]);

        h.move_to(3, 0).await;
        assert_eq!(h.controller.describe(), vec!["#1 hall Tue 19:06 -> Wed 02:55"]);
    }

    #[tokio::test]
    async fn should_drive_multilevel_lights_to_exact_levels() {
        let mut config = settings(vec![entry(1, "lounge", "19:01", "03:00")]);
        config.lights = vec![(
            DeviceRef::from("lounge"),
            LightKind::Multilevel {
                on_level: 55,
                off_level: 0,
            },
        )];
        let mut h = Harness::new(config);
        h.devices.add("lounge", DeviceLevel::Level(0));
        h.controller.start(Attempt::First);

        h.move_to(3, 0).await;
        assert_eq!(
            h.devices.commands_for("lounge"),
            vec![Command::Exact { level: 55 }, Command::Exact { level: 0 }]
        );
    }

    #[tokio::test]
    async fn should_take_ownership_without_command_when_light_reported_on() {
        let mut h = Harness::started(hall_evenings());
        let event = Event::LevelChanged {
            device: DeviceRef::from("hall"),
            level: DeviceLevel::On,
        };
        h.controller.handle_event(&event).await;
        let hall = DeviceRef::from("hall");
        assert!(h.controller.light(&hall).unwrap().on_status);

        h.move_to(19, 1).await;
        assert!(h.devices.commands_for("hall").is_empty());
        assert_eq!(h.controller.light(&hall).unwrap().on_by, Some(Source::Schedule));
    }

    #[tokio::test]
    async fn should_trust_stale_status_when_checking_by_notification() {
        let mut h = Harness::started(hall_evenings());
        h.move_to(19, 1).await;
        h.devices.set_level("hall", DeviceLevel::Off);
        h.move_to(3, 0).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On, Command::Off]);
    }

    #[tokio::test]
    async fn should_reread_level_when_checking_by_query() {
        let mut config = hall_evenings();
        config.light_check = LightCheck::Query;
        let mut h = Harness::started(config);
        h.move_to(19, 1).await;
        h.devices.set_level("hall", DeviceLevel::Off);
        h.move_to(3, 0).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
    }

    #[tokio::test]
    async fn should_restore_light_when_schedule_command_fails() {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        let mut h = Harness::started(config);
        h.move_to(19, 0).await;
        h.devices.remove("hall");
        h.move_to(19, 1).await;
        let hall = DeviceRef::from("hall");
        let light = h.controller.light(&hall).unwrap();
        assert!(!light.on_status);
        assert_eq!(light.on_by, None);

        h.devices.add("hall", DeviceLevel::Off);
        h.clock.set(london_at(2017, 10, 8, 19, 5));
        h.sensor(DeviceLevel::On).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
        assert_eq!(h.controller.light(&hall).unwrap().on_by, Some(Source::Sensor));
    }

    // ── Presence ───────────────────────────────────────────────────

    #[tokio::test]
    async fn should_wake_dormant_entry_when_presence_matches() {
        let mut away = entry(1, "hall", "19:01", "03:00");
        away.presence = PresenceFilter::Away;
        let mut h = Harness::started(settings(vec![away]));
        assert_eq!(h.controller.describe(), vec!["#1 hall dormant"]);

        h.controller
            .handle_event(&Event::PresenceChanged {
                mode: PresenceMode::Vacation,
            })
            .await;
        assert_eq!(h.controller.describe(), vec!["#1 hall Sun 19:01 -> Mon 03:00"]);
    }

    #[tokio::test]
    async fn should_ignore_night_after_home() {
        let mut home = entry(1, "hall", "19:01", "03:00");
        home.presence = PresenceFilter::Home;
        let mut h = Harness::started(settings(vec![home]));
        let before = h.controller.occurrences()[0].id;

        h.controller.on_presence_change(PresenceMode::Night);
        assert_eq!(h.controller.occurrences()[0].id, before);

        h.controller.on_presence_change(PresenceMode::Away);
        assert_eq!(h.controller.describe(), vec!["#1 hall dormant"]);
    }

    #[tokio::test]
    async fn should_leave_light_on_when_entry_goes_dormant() {
        let mut home = entry(1, "hall", "19:01", "03:00");
        home.presence = PresenceFilter::Home;
        let mut h = Harness::started(settings(vec![home]));
        h.move_to(19, 30).await;

        h.presence.set(PresenceMode::Away);
        h.controller.on_presence_change(PresenceMode::Away);
        h.move_to(3, 0).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
    }

    // ── Active hours ───────────────────────────────────────────────

    #[tokio::test]
    async fn should_recompute_active_hours_once_window_ends() {
        let mut config = hall_evenings();
        config.active_hours = evening_active_hours();
        let mut h = Harness::started(config);
        let window = h.controller.active_hours().unwrap();
        assert_eq!(window.start, london_at(2017, 10, 8, 16, 0));
        assert_eq!(window.end, london_at(2017, 10, 9, 6, 0));

        h.move_to(6, 1).await;
        let window = h.controller.active_hours().unwrap();
        assert_eq!(window.start, london_at(2017, 10, 9, 16, 0));
        assert_eq!(window.end, london_at(2017, 10, 10, 6, 0));
        assert_eq!(h.controller.describe(), vec!["#1 hall Mon 19:01 -> Tue 03:00"]);
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On, Command::Off]);
    }

    #[tokio::test]
    async fn should_follow_sunset_across_daylight_saving_change() {
        let mut config = settings(vec![entry(1, "hall", "12:00", "23:00")]);
        config.active_hours = Some(ActiveHoursSpec {
            start: "sunset".parse().unwrap(),
            end: "sunrise".parse().unwrap(),
        });
        let mut h = Harness::at(
            london_at(2019, 3, 29, 8, 0),
            TableEphemeris::spring_2019(),
            config,
        );
        h.controller.start(Attempt::First);
        assert_eq!(h.controller.describe(), vec!["#1 hall Fri 18:26 -> Fri 23:00"]);

        h.move_to(23, 0).await;
        assert_eq!(h.controller.describe(), vec!["#1 hall Sat 18:28 -> Sat 23:00"]);
        h.move_to(23, 0).await;
        assert_eq!(h.controller.describe(), vec!["#1 hall Sun 19:29 -> Sun 23:00"]);
        assert_eq!(h.devices.times_set_to("hall", Command::On), 2);
        assert_eq!(h.devices.times_set_to("hall", Command::Off), 2);
    }

    // ── Sensors ────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_release_sensor_lights_after_timeout() {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        let mut h = Harness::started(config);

        h.sensor(DeviceLevel::On).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
        h.sensor(DeviceLevel::Off).await;
        h.controller.tick().await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);

        h.clock.advance(TimeDelta::minutes(1));
        h.controller.tick().await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On, Command::Off]);
        assert!(!h.controller.sensor_group().unwrap().triggered);
    }

    #[tokio::test]
    async fn should_not_arm_release_for_light_the_schedule_owns() {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        let mut h = Harness::started(config);
        h.move_to(19, 1).await;

        h.sensor(DeviceLevel::On).await;
        h.sensor(DeviceLevel::Off).await;
        h.move_to(19, 10).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
        assert_eq!(h.controller.sensor_group().unwrap().pending_off_at, None);
    }

    #[tokio::test]
    async fn should_not_release_light_the_schedule_took_over() {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        let mut h = Harness::started(config);
        h.clock.set(london_at(2017, 10, 8, 18, 0));
        h.sensor(DeviceLevel::On).await;
        h.sensor(DeviceLevel::Off).await;

        h.clock.set(london_at(2017, 10, 8, 19, 1));
        h.controller.tick().await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
        let hall = h.controller.light(&DeviceRef::from("hall")).unwrap();
        assert_eq!(hall.on_by, Some(Source::Schedule));

        h.move_to(3, 0).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On, Command::Off]);
    }

    #[tokio::test]
    async fn should_ignore_sensor_outside_active_hours() {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        config.active_hours = evening_active_hours();
        let mut h = Harness::started(config);

        h.sensor(DeviceLevel::On).await;
        assert!(h.devices.commands_for("hall").is_empty());

        h.clock.set(london_at(2017, 10, 8, 17, 0));
        h.sensor(DeviceLevel::On).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
    }

    #[tokio::test]
    async fn should_default_sensor_lights_to_timetable_lights() {
        let mut config = settings(vec![
            entry(1, "hall", "19:01", "03:00"),
            entry(2, "porch", "06:00", "07:00"),
            entry(3, "hall", "06:00", "07:00"),
        ]);
        config.sensor = motion_group();
        let h = Harness::started(config);
        assert_eq!(
            h.controller.sensor_group().unwrap().lights,
            vec![DeviceRef::from("hall"), DeviceRef::from("porch")]
        );
    }

    #[tokio::test]
    async fn should_restore_light_when_sensor_command_fails() {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        let mut h = Harness::started(config);
        h.devices.remove("hall");
        h.sensor(DeviceLevel::On).await;
        let hall = DeviceRef::from("hall");
        assert!(!h.controller.light(&hall).unwrap().on_status);

        h.devices.add("hall", DeviceLevel::Off);
        h.sensor(DeviceLevel::On).await;
        assert_eq!(h.devices.commands_for("hall"), vec![Command::On]);
        assert!(h.controller.light(&hall).unwrap().on_status);
    }

    async fn manual_on_then_motion(light_check: LightCheck) -> Harness {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        config.light_check = light_check;
        let mut h = Harness::started(config);
        let hall = DeviceRef::from("hall");
        h.devices.perform(&hall, Command::On).await.unwrap();
        let event = Event::LevelChanged {
            device: hall,
            level: DeviceLevel::On,
        };
        h.controller.handle_event(&event).await;
        h.clock.advance(TimeDelta::minutes(1));
        h.sensor(DeviceLevel::On).await;
        h
    }

    #[tokio::test]
    async fn should_not_resend_on_to_a_light_reported_on() {
        let h = manual_on_then_motion(LightCheck::Notification).await;
        assert_eq!(h.devices.times_set_to("hall", Command::On), 1);
    }

    #[tokio::test]
    async fn should_always_send_on_when_light_level_cannot_be_checked() {
        let h = manual_on_then_motion(LightCheck::None).await;
        assert_eq!(h.devices.times_set_to("hall", Command::On), 2);
        let hall = h.controller.light(&DeviceRef::from("hall")).unwrap();
        assert_eq!(hall.on_by, Some(Source::Sensor));
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[tokio::test]
    async fn should_defer_first_attempt_without_registering_anything() {
        let mut config = settings(vec![
            entry(1, "hall", "19:01", "03:00"),
            entry(2, "garage", "06:00", "07:00"),
        ]);
        config.sensor = motion_group();
        let mut h = Harness::new(config);

        let outcome = h.controller.start(Attempt::First);
        assert_eq!(
            outcome,
            StartOutcome::Deferred {
                missing: vec![DeviceRef::from("garage")]
            }
        );
        assert!(!h.controller.is_running());
        assert_eq!(h.clock.active_ticks(), 0);
        assert_eq!(h.presence.active_subscriptions(), 0);
        assert_eq!(h.devices.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn should_drop_missing_devices_on_final_attempt() {
        let mut config = settings(vec![
            entry(1, "hall", "19:01", "03:00"),
            entry(2, "garage", "06:00", "07:00"),
        ]);
        config.sensor = motion_group();
        let mut h = Harness::new(config);

        assert_eq!(h.controller.start(Attempt::Final), StartOutcome::Started);
        assert_eq!(h.controller.describe(), vec!["#1 hall Sun 19:01 -> Mon 03:00"]);
        assert_eq!(h.clock.active_ticks(), 1);
        assert_eq!(h.presence.active_subscriptions(), 1);
        // hall and motion
        assert_eq!(h.devices.active_subscriptions(), 2);
    }

    #[tokio::test]
    async fn should_release_every_subscription_on_stop() {
        let mut config = hall_evenings();
        config.sensor = motion_group();
        let mut h = Harness::started(config);
        h.controller.stop();

        assert!(!h.controller.is_running());
        assert!(h.controller.describe().is_empty());
        assert_eq!(h.clock.active_ticks(), 0);
        assert_eq!(h.presence.active_subscriptions(), 0);
        assert_eq!(h.devices.active_subscriptions(), 0);

        h.clock.set(london_at(2017, 10, 8, 19, 1));
        h.controller.tick().await;
        assert!(h.devices.commands().is_empty());
    }

    #[tokio::test]
    async fn should_not_leak_subscriptions_on_restart() {
        let mut h = Harness::started(hall_evenings());
        h.controller.start(Attempt::Final);
        assert_eq!(h.clock.active_ticks(), 1);
        assert_eq!(h.presence.active_subscriptions(), 1);
        assert_eq!(h.devices.active_subscriptions(), 1);
    }
}
