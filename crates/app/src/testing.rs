//! In-memory port doubles shared by the unit tests of this crate.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Europe::London;
use chrono_tz::Tz;
use lightsched_domain::device::{Command, DeviceLevel};
use lightsched_domain::error::{EphemerisError, NotFoundError, SchedulerError};
use lightsched_domain::id::{DeviceRef, SubscriptionId};
use lightsched_domain::presence::PresenceMode;
use lightsched_domain::sun::{Location, SunTimes};
use lightsched_domain::time::{Timestamp, local_at};

use crate::ports::{Clock, DeviceRegistry, Ephemeris, PresenceSource};
use crate::schedule::Jitter;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn london_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
    London.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

// ── Clock ──────────────────────────────────────────────────────────

pub struct ManualClock {
    now: Mutex<Timestamp>,
    ticks: Mutex<HashSet<SubscriptionId>>,
}

impl ManualClock {
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
            ticks: Mutex::new(HashSet::new()),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    /// Next instant after now showing `hour:minute` on the wall clock.
    pub fn next_at(&self, hour: u32, minute: u32) -> Timestamp {
        let now = self.now();
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
        let today = local_at(London, now.date_naive(), time);
        if today > now {
            today
        } else {
            local_at(London, now.date_naive() + TimeDelta::days(1), time)
        }
    }

    pub fn active_ticks(&self) -> usize {
        self.ticks.lock().unwrap().len()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }

    fn timezone(&self) -> Tz {
        London
    }

    fn schedule_tick(&self, _interval: Duration) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.ticks.lock().unwrap().insert(id);
        id
    }

    fn cancel_tick(&self, id: SubscriptionId) {
        self.ticks.lock().unwrap().remove(&id);
    }
}

// ── Ephemeris ──────────────────────────────────────────────────────

/// Sun times looked up from a fixed table of `(date, sunrise, sunset)`.
#[derive(Default)]
pub struct TableEphemeris {
    table: HashMap<NaiveDate, (NaiveTime, NaiveTime)>,
}

impl TableEphemeris {
    pub fn location() -> Location {
        Location::new(51.634_44, 0.335_27).unwrap()
    }

    pub fn with_rows(rows: &[(i32, u32, u32, &str, &str)]) -> Self {
        let parse = |text: &str| NaiveTime::parse_from_str(text, "%H:%M").unwrap();
        let table = rows
            .iter()
            .map(|(y, m, d, rise, set)| (date(*y, *m, *d), (parse(rise), parse(set))))
            .collect();
        Self { table }
    }

    /// Around the switch to summer time on Sun 31 March 2019.
    pub fn spring_2019() -> Self {
        Self::with_rows(&[
            (2019, 3, 28, "05:43", "18:24"),
            (2019, 3, 29, "05:41", "18:26"),
            (2019, 3, 30, "05:40", "18:28"),
            (2019, 3, 31, "06:38", "19:29"),
            (2019, 4, 1, "06:34", "19:31"),
            (2019, 4, 2, "06:32", "19:33"),
        ])
    }

    /// The week starting Sun 8 October 2017.
    pub fn autumn_2017() -> Self {
        Self::with_rows(&[
            (2017, 10, 7, "07:10", "18:24"),
            (2017, 10, 8, "07:11", "18:22"),
            (2017, 10, 9, "07:13", "18:20"),
            (2017, 10, 10, "07:15", "18:18"),
            (2017, 10, 11, "07:17", "18:16"),
            (2017, 10, 12, "07:18", "18:14"),
            (2017, 10, 13, "07:20", "18:12"),
            (2017, 10, 14, "07:22", "18:10"),
            (2017, 10, 15, "07:24", "18:07"),
        ])
    }
}

impl Ephemeris for TableEphemeris {
    fn sun_times(&self, date: NaiveDate, _location: &Location) -> Result<SunTimes, SchedulerError> {
        let (sunrise, sunset) = self
            .table
            .get(&date)
            .ok_or(EphemerisError::Unavailable(date))?;
        Ok(SunTimes {
            sunrise: local_at(London, date, *sunrise),
            sunset: local_at(London, date, *sunset),
        })
    }
}

// ── Presence ───────────────────────────────────────────────────────

pub struct FixedPresence {
    mode: Mutex<PresenceMode>,
    subscriptions: Mutex<HashSet<SubscriptionId>>,
}

impl FixedPresence {
    pub fn new(mode: PresenceMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            subscriptions: Mutex::new(HashSet::new()),
        }
    }

    pub fn set(&self, mode: PresenceMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

impl PresenceSource for FixedPresence {
    fn mode(&self) -> PresenceMode {
        *self.mode.lock().unwrap()
    }

    fn subscribe(&self) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscriptions.lock().unwrap().insert(id);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().unwrap().remove(&id);
    }
}

// ── Devices ────────────────────────────────────────────────────────

/// Device registry that records every command and tracks subscriptions.
#[derive(Default)]
pub struct RecordingDevices {
    levels: Mutex<HashMap<DeviceRef, DeviceLevel>>,
    commands: Mutex<Vec<(DeviceRef, Command)>>,
    subscriptions: Mutex<HashMap<SubscriptionId, DeviceRef>>,
}

impl RecordingDevices {
    pub fn with(devices: &[(&str, DeviceLevel)]) -> Self {
        let registry = Self::default();
        for (name, level) in devices {
            registry.add(name, *level);
        }
        registry
    }

    pub fn add(&self, name: &str, level: DeviceLevel) {
        self.levels
            .lock()
            .unwrap()
            .insert(DeviceRef::from(name), level);
    }

    /// Make the device unreachable: commands to it fail.
    pub fn remove(&self, name: &str) {
        self.levels.lock().unwrap().remove(&DeviceRef::from(name));
    }

    /// Change a level behind the scheduler's back (manual switch).
    pub fn set_level(&self, name: &str, level: DeviceLevel) {
        self.add(name, level);
    }

    pub fn commands(&self) -> Vec<(DeviceRef, Command)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn commands_for(&self, name: &str) -> Vec<Command> {
        let device = DeviceRef::from(name);
        self.commands()
            .into_iter()
            .filter(|(d, _)| *d == device)
            .map(|(_, command)| command)
            .collect()
    }

    pub fn times_set_to(&self, name: &str, command: Command) -> usize {
        self.commands_for(name)
            .into_iter()
            .filter(|c| *c == command)
            .count()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

impl DeviceRegistry for RecordingDevices {
    fn contains(&self, device: &DeviceRef) -> bool {
        self.levels.lock().unwrap().contains_key(device)
    }

    fn level(&self, device: &DeviceRef) -> Option<DeviceLevel> {
        self.levels.lock().unwrap().get(device).copied()
    }

    fn perform(
        &self,
        device: &DeviceRef,
        command: Command,
    ) -> impl Future<Output = Result<(), SchedulerError>> + Send {
        let result = if self.contains(device) {
            self.levels
                .lock()
                .unwrap()
                .insert(device.clone(), command.resulting_level());
            self.commands.lock().unwrap().push((device.clone(), command));
            Ok(())
        } else {
            Err(NotFoundError {
                entity: "Device",
                id: device.to_string(),
            }
            .into())
        };
        async { result }
    }

    fn subscribe_level(&self, device: &DeviceRef) -> Result<SubscriptionId, SchedulerError> {
        if !self.contains(device) {
            return Err(NotFoundError {
                entity: "Device",
                id: device.to_string(),
            }
            .into());
        }
        let id = SubscriptionId::new();
        self.subscriptions
            .lock()
            .unwrap()
            .insert(id, device.clone());
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().unwrap().remove(&id);
    }
}

// ── Jitter ─────────────────────────────────────────────────────────

/// Always draws the same offset, counting the draws.
#[derive(Default)]
pub struct FixedJitter {
    minutes: i64,
    draws: usize,
}

impl FixedJitter {
    pub fn new(minutes: i64) -> Self {
        Self { minutes, draws: 0 }
    }

    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl Jitter for FixedJitter {
    fn minutes(&mut self, max: u32) -> i64 {
        self.draws += 1;
        self.minutes.min(i64::from(max))
    }
}
