//! Defaults and validation bounds.
//!
//! Configuration defaults live here so that the generated config file, the
//! loader and the validator agree on them.

// # Application Exit Codes
pub const EXIT_FAILURE: i32 = 1;

// # Location Limits
pub const MINIMUM_LATITUDE: f64 = -90.0;
pub const MAXIMUM_LATITUDE: f64 = 90.0;
pub const MINIMUM_LONGITUDE: f64 = -180.0;
pub const MAXIMUM_LONGITUDE: f64 = 180.0;

// # Calculation Limits
pub const MINIMUM_TWILIGHT_ANGLE: f64 = 0.0; // degrees below the horizon
pub const MAXIMUM_TWILIGHT_ANGLE: f64 = 30.0;
pub const MAXIMUM_MINUTES_AFTER_SUNSET: f64 = 180.0;
pub const MAXIMUM_OFFSET_MINUTES: i64 = 1440; // one day either way

// # Astronomical Constants
pub const SUNRISE_SUNSET_ANGLE: f64 = 0.833; // refraction plus solar radius
pub const IMSAK_MINUTES_BEFORE_FAJR: i64 = 10;

// # Refresh Defaults
pub const DEFAULT_CALCULATOR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_BASE_SECS: u64 = 60;
pub const DEFAULT_RETRY_MAX_SECS: u64 = 3600;
pub const MINIMUM_CALCULATOR_TIMEOUT_SECS: u64 = 1;
pub const MAXIMUM_CALCULATOR_TIMEOUT_SECS: u64 = 300;
pub const MINIMUM_RETRY_SECS: u64 = 1;
pub const MAXIMUM_RETRY_SECS: u64 = 86400;

/// Longest single sleep of the refresh timer, so wall-clock jumps after a
/// suspend are noticed within this window.
pub const TIMER_SLICE_SECS: u64 = 60;

// # Remote Calculator
pub const DEFAULT_API_URL: &str = "http://api.aladhan.com/timings";

// # Config Watcher
pub const CONFIG_WATCH_DEBOUNCE_MS: u64 = 500;
