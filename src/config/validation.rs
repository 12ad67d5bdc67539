//! Configuration validation.
//!
//! Every check reports [`PrayerError::ConfigurationInvalid`] with a message
//! naming the offending field, so it can be shown to the user unchanged.

use std::time::Duration;

use super::{CalculatorSource, Configuration};
use crate::calc::method::AngleOrMinutes;
use crate::common::constants::*;
use crate::error::PrayerError;

/// Validate a resolved configuration.
pub fn validate_configuration(config: &Configuration) -> Result<(), PrayerError> {
    validate_coordinate(
        "latitude",
        config.latitude,
        MINIMUM_LATITUDE,
        MAXIMUM_LATITUDE,
    )?;
    validate_coordinate(
        "longitude",
        config.longitude,
        MINIMUM_LONGITUDE,
        MAXIMUM_LONGITUDE,
    )?;

    if let Some(angle) = config.angle_overrides.fajr {
        validate_angle("fajr_angle", angle)?;
    }
    if let Some(setting) = config.angle_overrides.maghrib {
        validate_angle_or_minutes("maghrib_angle", setting)?;
    }
    if let Some(setting) = config.angle_overrides.isha {
        validate_angle_or_minutes("isha_angle", setting)?;
    }

    for (prayer, minutes) in &config.offsets {
        if minutes.abs() > MAXIMUM_OFFSET_MINUTES {
            return Err(PrayerError::invalid(format!(
                "offset for {} ({} minutes) must be between -{} and {} minutes",
                prayer.as_str().to_lowercase(),
                minutes,
                MAXIMUM_OFFSET_MINUTES,
                MAXIMUM_OFFSET_MINUTES
            )));
        }
    }

    validate_refresh(config)?;

    if let CalculatorSource::Remote { api_url } = &config.source
        && !(api_url.starts_with("http://") || api_url.starts_with("https://"))
    {
        return Err(PrayerError::invalid(format!(
            "api_url must start with http:// or https:// (got \"{api_url}\")"
        )));
    }

    Ok(())
}

fn validate_coordinate(name: &str, value: f64, min: f64, max: f64) -> Result<(), PrayerError> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(PrayerError::invalid(format!(
            "{name} must be between {min} and {max} degrees (got {value})"
        )));
    }
    Ok(())
}

fn validate_angle(name: &str, angle: f64) -> Result<(), PrayerError> {
    if !angle.is_finite() || !(MINIMUM_TWILIGHT_ANGLE..=MAXIMUM_TWILIGHT_ANGLE).contains(&angle) {
        return Err(PrayerError::invalid(format!(
            "{name} ({angle}) must be between {MINIMUM_TWILIGHT_ANGLE} and {MAXIMUM_TWILIGHT_ANGLE} degrees"
        )));
    }
    Ok(())
}

fn validate_angle_or_minutes(name: &str, setting: AngleOrMinutes) -> Result<(), PrayerError> {
    match setting {
        AngleOrMinutes::Angle(angle) => validate_angle(name, angle),
        AngleOrMinutes::Minutes(minutes) => {
            if !minutes.is_finite() || !(0.0..=MAXIMUM_MINUTES_AFTER_SUNSET).contains(&minutes) {
                return Err(PrayerError::invalid(format!(
                    "{name} ({minutes} min) must be between 0 and {MAXIMUM_MINUTES_AFTER_SUNSET} minutes"
                )));
            }
            Ok(())
        }
    }
}

fn validate_refresh(config: &Configuration) -> Result<(), PrayerError> {
    let refresh = &config.refresh;

    validate_seconds(
        "calculator_timeout",
        refresh.calculator_timeout,
        MINIMUM_CALCULATOR_TIMEOUT_SECS,
        MAXIMUM_CALCULATOR_TIMEOUT_SECS,
    )?;
    validate_seconds(
        "retry_base",
        refresh.retry_base,
        MINIMUM_RETRY_SECS,
        MAXIMUM_RETRY_SECS,
    )?;
    validate_seconds(
        "retry_max",
        refresh.retry_max,
        MINIMUM_RETRY_SECS,
        MAXIMUM_RETRY_SECS,
    )?;

    if refresh.retry_base > refresh.retry_max {
        return Err(PrayerError::invalid(format!(
            "retry_base ({}s) must not exceed retry_max ({}s)",
            refresh.retry_base.as_secs(),
            refresh.retry_max.as_secs()
        )));
    }

    Ok(())
}

fn validate_seconds(name: &str, value: Duration, min: u64, max: u64) -> Result<(), PrayerError> {
    let secs = value.as_secs();
    if !(min..=max).contains(&secs) {
        return Err(PrayerError::invalid(format!(
            "{name} ({secs} seconds) must be between {min} and {max} seconds"
        )));
    }
    Ok(())
}
