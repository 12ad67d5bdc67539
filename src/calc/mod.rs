//! Prayer-time calculators and the adapter the coordinator calls them through.
//!
//! A [`Calculator`] turns a fully resolved [`CalculationRequest`] into raw
//! timestamps. The [`CalculatorAdapter`] owns everything around that call:
//! resolving configuration into a request, validating the shape of the answer
//! and applying the per-prayer offsets.

pub mod adapter;
pub mod astronomy;
pub mod method;
pub mod remote;
pub mod solar;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use crate::config::{CalculatorSource, Configuration};
use crate::error::PrayerError;
use crate::prayer::Prayer;

pub use adapter::CalculatorAdapter;
pub use method::{
    AngleOrMinutes, AngleOverrides, CalculationMethod, LatitudeAdjustment, MethodParams,
    MidnightMode, School,
};
pub use remote::{AladhanCalculator, HttpClient};
pub use solar::SolarCalculator;

/// Timestamps as returned by a calculator, before validation and offsets.
pub type RawTimes = BTreeMap<Prayer, DateTime<Tz>>;

/// Everything a calculator needs for one day, with overrides already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub method: CalculationMethod,
    pub params: MethodParams,
    pub school: School,
    pub midnight_mode: MidnightMode,
    pub latitude_adjustment: LatitudeAdjustment,
}

impl CalculationRequest {
    pub fn from_config(config: &Configuration, date: NaiveDate) -> Self {
        Self {
            date,
            latitude: config.latitude,
            longitude: config.longitude,
            timezone: config.timezone,
            method: config.method,
            params: MethodParams::resolve(config.method, &config.angle_overrides),
            school: config.school,
            midnight_mode: config.midnight_mode,
            latitude_adjustment: config.latitude_adjustment,
        }
    }
}

/// Source of raw prayer times for one day.
///
/// Implementations may block (the remote calculator does network IO); the
/// coordinator always calls them off its own thread with a timeout.
#[cfg_attr(test, mockall::automock)]
pub trait Calculator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn calculate(&self, request: &CalculationRequest) -> Result<RawTimes, PrayerError>;
}

/// Build the calculator selected by the configuration.
pub fn build_calculator(config: &Configuration) -> Result<Arc<dyn Calculator>, PrayerError> {
    match &config.source {
        CalculatorSource::Local => Ok(Arc::new(SolarCalculator::new())),
        CalculatorSource::Remote { api_url } => remote_calculator(api_url, config),
    }
}

#[cfg(feature = "remote")]
fn remote_calculator(
    api_url: &str,
    config: &Configuration,
) -> Result<Arc<dyn Calculator>, PrayerError> {
    let client = remote::ReqwestClient::with_timeout(config.refresh.calculator_timeout)?;
    Ok(Arc::new(AladhanCalculator::new(client, api_url)))
}

#[cfg(not(feature = "remote"))]
fn remote_calculator(
    _api_url: &str,
    _config: &Configuration,
) -> Result<Arc<dyn Calculator>, PrayerError> {
    Err(PrayerError::invalid(
        "source = \"remote\" requires prayertimes built with the 'remote' feature",
    ))
}
