//! Configuration system for prayertimes.
//!
//! The configuration file is a flat TOML record describing one location and how
//! prayer times are calculated for it:
//!
//! ```toml
//! #[Location]
//! latitude = 21.422500                # Geographic latitude (-90 to 90)
//! longitude = 39.826200               # Geographic longitude (-180 to 180)
//! timezone = "Asia/Riyadh"            # IANA timezone that defines the calendar day
//!
//! #[Calculation]
//! method = "isna"                     # Calculation method
//! school = "shafi"                    # Asr shadow length: "shafi" or "hanafi"
//! midnight_mode = "standard"          # "standard" (sunset to sunrise) or "jafari" (sunset to Fajr)
//! latitude_adjustment = "angle_based" # "middle_of_the_night", "one_seventh" or "angle_based"
//! fajr_angle = 18.0                   # Optional: overrides the method's Fajr angle
//! maghrib_angle = "0 min"             # Optional: degrees, or "N min" after sunset
//! isha_angle = "90 min"               # Optional: degrees, or "N min" after Maghrib
//!
//! #[Refresh]
//! source = "local"                    # "local" (offline) or "remote" (Aladhan API)
//! calculator_timeout = 30             # Seconds before a calculation is abandoned
//! retry_base = 60                     # First retry delay in seconds after a failure
//! retry_max = 3600                    # Upper bound for the retry delay
//!
//! [offsets]                           # Minutes added to individual times
//! fajr = 2
//! isha = -3
//! ```
//!
//! The raw [`Config`] mirrors the file with every field optional. Resolving it
//! applies defaults, parses the timezone and angle settings, and validates the
//! result into a [`Configuration`], which is what the coordinator consumes.
//! Angle overrides and per-prayer offsets are independent: either, both or
//! neither may be present.

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::calc::method::{
    AngleOrMinutes, AngleOverrides, CalculationMethod, LatitudeAdjustment, MidnightMode, School,
};
use crate::common::constants::*;
use crate::error::PrayerError;
use crate::prayer::Prayer;

// Re-export public API
pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};
pub use validation::validate_configuration;
pub use watcher::start_config_watcher;

/// Angle setting as written in the file: a bare number of degrees, or a
/// string holding either degrees or "N min".
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AngleSetting {
    Degrees(f64),
    Text(String),
}

impl AngleSetting {
    fn resolve(&self, key: &str) -> Result<AngleOrMinutes, PrayerError> {
        match self {
            AngleSetting::Degrees(value) => Ok(AngleOrMinutes::Angle(*value)),
            AngleSetting::Text(text) => text
                .parse()
                .map_err(|e: String| PrayerError::invalid(format!("{key}: {e}"))),
        }
    }
}

/// Configuration file contents before defaults and validation.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>, // IANA name, e.g. "Europe/London"

    pub method: Option<CalculationMethod>,
    pub school: Option<School>,
    pub midnight_mode: Option<MidnightMode>,
    pub latitude_adjustment: Option<LatitudeAdjustment>,
    pub fajr_angle: Option<f64>,
    pub maghrib_angle: Option<AngleSetting>,
    pub isha_angle: Option<AngleSetting>,

    pub source: Option<String>, // "local" or "remote"
    pub api_url: Option<String>,
    pub calculator_timeout: Option<u64>, // seconds
    pub retry_base: Option<u64>,         // seconds
    pub retry_max: Option<u64>,          // seconds

    /// Minutes added to each prayer after calculation, keyed by lower-case
    /// prayer name.
    #[serde(default)]
    pub offsets: BTreeMap<String, i64>,
}

impl Config {
    /// Parse TOML text into a raw config.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply defaults, parse and validate.
    pub fn resolve(&self) -> Result<Configuration, PrayerError> {
        let latitude = self
            .latitude
            .ok_or_else(|| PrayerError::invalid("latitude is required"))?;
        let longitude = self
            .longitude
            .ok_or_else(|| PrayerError::invalid("longitude is required"))?;
        let timezone_name = self
            .timezone
            .as_deref()
            .ok_or_else(|| PrayerError::invalid("timezone is required"))?;
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| PrayerError::invalid(format!("unknown timezone '{timezone_name}'")))?;

        let angle_overrides = AngleOverrides {
            fajr: self.fajr_angle,
            maghrib: self
                .maghrib_angle
                .as_ref()
                .map(|s| s.resolve("maghrib_angle"))
                .transpose()?,
            isha: self
                .isha_angle
                .as_ref()
                .map(|s| s.resolve("isha_angle"))
                .transpose()?,
        };

        let mut offsets = BTreeMap::new();
        for (name, minutes) in &self.offsets {
            let prayer: Prayer = name
                .parse()
                .map_err(|e: String| PrayerError::invalid(format!("offsets: {e}")))?;
            offsets.insert(prayer, *minutes);
        }

        let source = match self.source.as_deref().unwrap_or("local") {
            "local" => CalculatorSource::Local,
            "remote" => CalculatorSource::Remote {
                api_url: self
                    .api_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            },
            other => {
                return Err(PrayerError::invalid(format!(
                    "source must be \"local\" or \"remote\" (got \"{other}\")"
                )));
            }
        };

        let refresh = RefreshSettings {
            calculator_timeout: Duration::from_secs(
                self.calculator_timeout
                    .unwrap_or(DEFAULT_CALCULATOR_TIMEOUT_SECS),
            ),
            retry_base: Duration::from_secs(self.retry_base.unwrap_or(DEFAULT_RETRY_BASE_SECS)),
            retry_max: Duration::from_secs(self.retry_max.unwrap_or(DEFAULT_RETRY_MAX_SECS)),
        };

        let configuration = Configuration {
            latitude,
            longitude,
            timezone,
            method: self.method.unwrap_or_default(),
            school: self.school.unwrap_or_default(),
            midnight_mode: self.midnight_mode.unwrap_or_default(),
            latitude_adjustment: self.latitude_adjustment.unwrap_or_default(),
            angle_overrides,
            offsets,
            refresh,
            source,
        };

        validate_configuration(&configuration)?;
        Ok(configuration)
    }
}

/// Where prayer times come from.
#[derive(Debug, Clone, PartialEq)]
pub enum CalculatorSource {
    /// Offline solar calculation.
    Local,
    /// Aladhan-compatible HTTP API.
    Remote { api_url: String },
}

/// Timing of calculator calls and retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshSettings {
    pub calculator_timeout: Duration,
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            calculator_timeout: Duration::from_secs(DEFAULT_CALCULATOR_TIMEOUT_SECS),
            retry_base: Duration::from_secs(DEFAULT_RETRY_BASE_SECS),
            retry_max: Duration::from_secs(DEFAULT_RETRY_MAX_SECS),
        }
    }
}

/// Validated configuration for one location.
///
/// Replaced wholesale by [`Coordinator::configure`]; never mutated while a
/// refresh is using it.
///
/// [`Coordinator::configure`]: crate::coordinator::Coordinator::configure
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub method: CalculationMethod,
    pub school: School,
    pub midnight_mode: MidnightMode,
    pub latitude_adjustment: LatitudeAdjustment,
    pub angle_overrides: AngleOverrides,
    pub offsets: BTreeMap<Prayer, i64>,
    pub refresh: RefreshSettings,
    pub source: CalculatorSource,
}

impl Configuration {
    /// Defaults for everything except the location.
    pub fn new(latitude: f64, longitude: f64, timezone: Tz) -> Self {
        Self {
            latitude,
            longitude,
            timezone,
            method: CalculationMethod::default(),
            school: School::default(),
            midnight_mode: MidnightMode::default(),
            latitude_adjustment: LatitudeAdjustment::default(),
            angle_overrides: AngleOverrides::default(),
            offsets: BTreeMap::new(),
            refresh: RefreshSettings::default(),
            source: CalculatorSource::Local,
        }
    }

    pub fn log_config(&self) {
        let lat_dir = if self.latitude >= 0.0 { "N" } else { "S" };
        let lon_dir = if self.longitude >= 0.0 { "E" } else { "W" };
        log_indented!(
            "Location: {:.4}°{}, {:.4}°{} ({})",
            self.latitude.abs(),
            lat_dir,
            self.longitude.abs(),
            lon_dir,
            self.timezone.name()
        );
        log_indented!(
            "Method: {} ({})",
            self.method.description(),
            self.method.key()
        );
        log_indented!(
            "School: {:?}, midnight: {:?}, high latitudes: {:?}",
            self.school,
            self.midnight_mode,
            self.latitude_adjustment
        );

        if !self.angle_overrides.is_empty() {
            let params = crate::calc::MethodParams::resolve(self.method, &self.angle_overrides);
            log_indented!(
                "Angles: Fajr {}, Maghrib {}, Isha {}",
                params.fajr_angle,
                params.maghrib,
                params.isha
            );
        }

        let offsets: Vec<String> = self
            .offsets
            .iter()
            .filter(|(_, minutes)| **minutes != 0)
            .map(|(prayer, minutes)| format!("{prayer} {minutes:+}m"))
            .collect();
        if !offsets.is_empty() {
            log_indented!("Offsets: {}", offsets.join(", "));
        }

        match &self.source {
            CalculatorSource::Local => log_indented!("Calculator: local"),
            CalculatorSource::Remote { api_url } => log_indented!("Calculator: {}", api_url),
        }
    }
}
