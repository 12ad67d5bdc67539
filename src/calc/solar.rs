//! Local prayer-time calculator based on the sun's position.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use super::astronomy::{Direction, SolarDay, time_diff};
use super::method::{AngleOrMinutes, LatitudeAdjustment, MidnightMode};
use super::{CalculationRequest, Calculator, RawTimes};
use crate::common::constants::{IMSAK_MINUTES_BEFORE_FAJR, SUNRISE_SUNSET_ANGLE};
use crate::error::PrayerError;
use crate::prayer::Prayer;

/// Computes prayer times offline from solar declination and equation of time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolarCalculator;

impl SolarCalculator {
    pub fn new() -> Self {
        Self
    }
}

/// Day times in local mean solar hours.
#[derive(Debug, Clone, Copy)]
struct SolarHours {
    fajr: Option<f64>,
    sunrise: f64,
    dhuhr: f64,
    asr: Option<f64>,
    sunset: f64,
    maghrib: Option<f64>,
    isha: Option<f64>,
}

impl Calculator for SolarCalculator {
    fn name(&self) -> &'static str {
        "solar"
    }

    fn calculate(&self, request: &CalculationRequest) -> Result<RawTimes, PrayerError> {
        let times = times_for(request, request.date)?;

        // Solar noon can land on a neighbouring local date when the zone is
        // far from the longitude's mean time (for example Kiribati).
        let dhuhr_date = times[&Prayer::Dhuhr].date_naive();
        if dhuhr_date == request.date {
            return Ok(times);
        }
        let shifted = request.date + (request.date - dhuhr_date);
        times_for(request, shifted)
    }
}

/// Compute for the UTC date `anchor`, expressed in the requested timezone.
fn times_for(request: &CalculationRequest, anchor: NaiveDate) -> Result<RawTimes, PrayerError> {
    let day = SolarDay::new(anchor, request.latitude, request.longitude);
    let hours = solar_hours(&day, request)?;
    let params = &request.params;

    let fajr = hours.fajr.ok_or_else(|| {
        PrayerError::malformed(format!("no Fajr at latitude {}", request.latitude))
    })?;
    let asr = hours.asr.ok_or_else(|| {
        PrayerError::malformed(format!("no Asr at latitude {}", request.latitude))
    })?;

    let maghrib = match params.maghrib {
        AngleOrMinutes::Minutes(m) => hours.sunset + m / 60.0,
        AngleOrMinutes::Angle(_) => hours.maghrib.ok_or_else(|| {
            PrayerError::malformed(format!("no Maghrib at latitude {}", request.latitude))
        })?,
    };
    let isha = match params.isha {
        AngleOrMinutes::Minutes(m) => maghrib + m / 60.0,
        AngleOrMinutes::Angle(_) => hours.isha.ok_or_else(|| {
            PrayerError::malformed(format!("no Isha at latitude {}", request.latitude))
        })?,
    };

    let midnight = match request.midnight_mode {
        MidnightMode::Standard => hours.sunset + time_diff(hours.sunset, hours.sunrise) / 2.0,
        MidnightMode::Jafari => hours.sunset + time_diff(hours.sunset, fajr) / 2.0,
    };

    let to_instant = |solar_hours: f64| {
        let utc_hours = solar_hours - request.longitude / 15.0;
        instant(anchor, utc_hours, request.timezone)
    };

    let fajr_at = to_instant(fajr);
    let mut times = BTreeMap::from([
        (Prayer::Fajr, fajr_at),
        (Prayer::Sunrise, to_instant(hours.sunrise)),
        (Prayer::Dhuhr, to_instant(hours.dhuhr)),
        (Prayer::Asr, to_instant(asr)),
        (Prayer::Sunset, to_instant(hours.sunset)),
        (Prayer::Maghrib, to_instant(maghrib)),
        (Prayer::Isha, to_instant(isha)),
        (Prayer::Midnight, to_instant(midnight)),
    ]);
    times.insert(
        Prayer::Imsak,
        fajr_at - ChronoDuration::minutes(IMSAK_MINUTES_BEFORE_FAJR),
    );

    Ok(times)
}

fn solar_hours(day: &SolarDay, request: &CalculationRequest) -> Result<SolarHours, PrayerError> {
    let params = &request.params;

    let sunrise = day
        .sun_angle_time(SUNRISE_SUNSET_ANGLE, 6.0, Direction::Morning)
        .ok_or_else(|| no_sunrise(request))?;
    let sunset = day
        .sun_angle_time(SUNRISE_SUNSET_ANGLE, 18.0, Direction::Evening)
        .ok_or_else(|| no_sunrise(request))?;

    let mut hours = SolarHours {
        fajr: day.sun_angle_time(params.fajr_angle, 5.0, Direction::Morning),
        sunrise,
        dhuhr: day.mid_day(12.0),
        asr: day.asr_time(request.school.shadow_factor(), 13.0),
        sunset,
        maghrib: match params.maghrib {
            AngleOrMinutes::Angle(a) => day.sun_angle_time(a, 18.0, Direction::Evening),
            AngleOrMinutes::Minutes(_) => None,
        },
        isha: match params.isha {
            AngleOrMinutes::Angle(a) => day.sun_angle_time(a, 18.0, Direction::Evening),
            AngleOrMinutes::Minutes(_) => None,
        },
    };

    adjust_high_latitudes(&mut hours, request);
    Ok(hours)
}

fn no_sunrise(request: &CalculationRequest) -> PrayerError {
    PrayerError::malformed(format!(
        "the sun does not rise or set on {} at latitude {}",
        request.date, request.latitude
    ))
}

/// Clamp twilight times that are undefined or implausibly far from sunrise or
/// sunset to a portion of the night.
fn adjust_high_latitudes(hours: &mut SolarHours, request: &CalculationRequest) {
    let rule = request.latitude_adjustment;
    let params = &request.params;
    let night = time_diff(hours.sunset, hours.sunrise);

    hours.fajr = Some(adjust(
        hours.fajr,
        hours.sunrise,
        params.fajr_angle,
        night,
        rule,
        Direction::Morning,
    ));

    if let AngleOrMinutes::Angle(angle) = params.isha {
        hours.isha = Some(adjust(
            hours.isha,
            hours.sunset,
            angle,
            night,
            rule,
            Direction::Evening,
        ));
    }
    if let AngleOrMinutes::Angle(angle) = params.maghrib {
        hours.maghrib = Some(adjust(
            hours.maghrib,
            hours.sunset,
            angle,
            night,
            rule,
            Direction::Evening,
        ));
    }
}

fn adjust(
    time: Option<f64>,
    base: f64,
    angle: f64,
    night: f64,
    rule: LatitudeAdjustment,
    direction: Direction,
) -> f64 {
    let portion = rule.night_portion(angle) * night;
    let clamped = match direction {
        Direction::Morning => base - portion,
        Direction::Evening => base + portion,
    };

    match time {
        Some(t) => {
            let diff = match direction {
                Direction::Morning => time_diff(t, base),
                Direction::Evening => time_diff(base, t),
            };
            if diff > portion { clamped } else { t }
        }
        None => clamped,
    }
}

/// Instant `utc_hours` after UTC midnight of `date`, expressed in `tz`.
fn instant(date: NaiveDate, utc_hours: f64, tz: Tz) -> DateTime<Tz> {
    let midnight = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
    // Round to the second; sub-second precision is meaningless here
    let seconds = (utc_hours * 3600.0).round() as i64;
    (midnight + ChronoDuration::seconds(seconds)).with_timezone(&tz)
}
