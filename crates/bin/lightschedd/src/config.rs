//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `lightsched.toml` in the working directory, or the file named by
//! `LIGHTSCHED_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::time::Duration;

use chrono::TimeDelta;
use chrono_tz::Tz;
use lightsched_app::controller::{SchedulerSettings, SensorSettings};
use lightsched_domain::active_hours::ActiveHoursSpec;
use lightsched_domain::error::{EphemerisError, ValidationError};
use lightsched_domain::id::DeviceRef;
use lightsched_domain::light::{LightCheck, LightKind};
use lightsched_domain::presence::PresenceMode;
use lightsched_domain::schedule::{DaySet, ScheduleEntry, TimeSpec};
use lightsched_domain::sun::Location;
use serde::Deserialize;

const DEFAULT_PATH: &str = "lightsched.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone every schedule is resolved in.
    pub timezone: String,
    /// Seconds between two ticks.
    pub poll_interval_secs: u64,
    /// Seconds to wait for late devices before the final start attempt.
    pub device_wait_secs: u64,
    /// Upper bound of the random offsets applied to `randomize` entries.
    pub max_random_minutes: u32,
    /// `notification`, `query`, or `none` (also `no`) for lights whose
    /// level cannot be read.
    pub light_check: LightCheck,
    pub location: Option<LocationConfig>,
    pub active_hours: Option<ActiveHoursSpec>,
    pub lights: Vec<LightConfig>,
    pub timetable: Vec<TimetableRow>,
    pub sensor: Option<SensorConfig>,
    pub logging: LoggingConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

/// Actuation settings of one light.
#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    pub device: String,
    /// `binary` or `multilevel`.
    #[serde(default = "default_light_kind")]
    pub kind: String,
    pub on_level: Option<u8>,
    pub off_level: Option<u8>,
}

/// One `[[timetable]]` row, kept as text until validated.
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableRow {
    pub light: String,
    #[serde(default = "default_presence")]
    pub presence: String,
    #[serde(default = "default_days")]
    pub days: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub randomize: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    pub sensors: Vec<String>,
    #[serde(default = "default_sensor_timeout")]
    pub timeout_secs: u64,
    /// Empty means every timetable light.
    #[serde(default)]
    pub lights: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Settings of the virtual demo integration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Presence mode the virtual household starts in.
    pub presence: PresenceMode,
}

fn default_light_kind() -> String {
    "binary".to_string()
}

fn default_presence() -> String {
    "any".to_string()
}

fn default_days() -> String {
    "all".to_string()
}

fn default_sensor_timeout() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "Europe/London".to_string(),
            poll_interval_secs: 60,
            device_wait_secs: 12,
            max_random_minutes: 15,
            light_check: LightCheck::default(),
            location: None,
            active_hours: None,
            lights: Vec::new(),
            timetable: Vec::new(),
            sensor: None,
            logging: LoggingConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lightsched=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `LIGHTSCHED_CONFIG` or `lightsched.toml` (if
    /// present) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("LIGHTSCHED_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration document. No overrides, no validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LIGHTSCHED_TZ") {
            self.timezone = val;
        }
        if let Ok(val) = std::env::var("LIGHTSCHED_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check every value, including the timetable.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler_settings().map(|_| ())
    }

    /// The configured time zone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Timezone`] for an unknown zone name.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))
    }

    /// Seconds to wait before the final start attempt.
    #[must_use]
    pub fn device_wait(&self) -> Duration {
        Duration::from_secs(self.device_wait_secs)
    }

    /// Every device the demo integration has to provide: lights with their
    /// kind, then sensors.
    #[must_use]
    pub fn demo_devices(&self) -> (Vec<(DeviceRef, bool)>, Vec<DeviceRef>) {
        let mut lights: Vec<(DeviceRef, bool)> = Vec::new();
        let configured = self
            .lights
            .iter()
            .map(|l| (l.device.as_str(), l.kind == "multilevel"));
        let scheduled = self.timetable.iter().map(|r| (r.light.as_str(), false));
        let sensor_lights = self
            .sensor
            .iter()
            .flat_map(|s| s.lights.iter().map(|l| (l.as_str(), false)));
        for (name, dimmable) in configured.chain(scheduled).chain(sensor_lights) {
            if !lights.iter().any(|(d, _)| d.as_str() == name) {
                lights.push((DeviceRef::from(name), dimmable));
            }
        }
        let sensors = self
            .sensor
            .iter()
            .flat_map(|s| s.sensors.iter().map(|d| DeviceRef::from(d.as_str())))
            .collect();
        (lights, sensors)
    }

    /// Build the controller settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for any invalid value.
    pub fn scheduler_settings(&self) -> Result<SchedulerSettings, ConfigError> {
        self.timezone()?;
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_secs must be non-zero".to_string(),
            ));
        }
        let location = self
            .location
            .map(|l| Location::new(l.latitude, l.longitude))
            .transpose()?;

        let entries = self
            .timetable
            .iter()
            .enumerate()
            .map(|(index, row)| {
                row.to_entry(index + 1)
                    .map_err(|source| ConfigError::Timetable {
                        row: index + 1,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let uses_sun = entries
            .iter()
            .flat_map(|e| [e.start, e.end])
            .chain(self.active_hours.iter().flat_map(|a| [a.start, a.end]))
            .any(|spec: TimeSpec| spec.is_solar());
        if uses_sun && location.is_none() {
            return Err(ConfigError::Validation(
                "sunrise/sunset times need a [location]".to_string(),
            ));
        }

        let lights = self
            .lights
            .iter()
            .map(|l| Ok((DeviceRef::from(l.device.as_str()), l.to_kind()?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let sensor = self
            .sensor
            .as_ref()
            .map(SensorConfig::to_settings)
            .transpose()?;

        Ok(SchedulerSettings {
            entries,
            lights,
            active_hours: self.active_hours,
            sensor,
            location,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_random_minutes: self.max_random_minutes,
            light_check: self.light_check,
        })
    }
}

impl TimetableRow {
    fn to_entry(&self, seq: usize) -> Result<ScheduleEntry, ValidationError> {
        ScheduleEntry::builder()
            .seq(seq)
            .light(self.light.as_str())
            .presence(self.presence.parse()?)
            .days(self.days.parse::<DaySet>()?)
            .start(self.start.parse()?)
            .end(self.end.parse()?)
            .randomize(self.randomize)
            .build()
    }
}

impl LightConfig {
    fn to_kind(&self) -> Result<LightKind, ValidationError> {
        match self.kind.as_str() {
            "binary" => Ok(LightKind::Binary),
            "multilevel" => Ok(LightKind::Multilevel {
                on_level: self.on_level.unwrap_or(100),
                off_level: self.off_level.unwrap_or(0),
            }),
            other => Err(ValidationError::UnknownLightKind(other.to_string())),
        }
    }
}

impl SensorConfig {
    fn to_settings(&self) -> Result<SensorSettings, ConfigError> {
        let timeout = i64::try_from(self.timeout_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .filter(|t| *t > TimeDelta::zero())
            .ok_or(ValidationError::ZeroTimeout)?;
        if self.sensors.is_empty() {
            return Err(ConfigError::Validation(
                "[sensor] needs at least one sensor".to_string(),
            ));
        }
        Ok(SensorSettings {
            sensors: self.sensors.iter().map(|d| DeviceRef::from(d.as_str())).collect(),
            lights: self.lights.iter().map(|d| DeviceRef::from(d.as_str())).collect(),
            timeout,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    #[error("invalid value")]
    Value(#[from] ValidationError),
    #[error("invalid timetable row {row}")]
    Timetable {
        row: usize,
        #[source]
        source: ValidationError,
    },
    #[error("unknown time zone {0:?}")]
    Timezone(String),
    #[error("invalid location")]
    Location(#[from] EphemerisError),
}
