//! Low-precision solar position and the hour angles derived from it.
//!
//! All times are hours of local mean solar time at the observer's longitude;
//! subtract `longitude / 15` to get UTC hours. Precision is about one minute
//! between 1950 and 2050, which is well inside the spread between methods.

use chrono::{Datelike, NaiveDate};

fn sin_deg(d: f64) -> f64 {
    d.to_radians().sin()
}

fn cos_deg(d: f64) -> f64 {
    d.to_radians().cos()
}

fn tan_deg(d: f64) -> f64 {
    d.to_radians().tan()
}

fn fix(value: f64, modulus: f64) -> f64 {
    value.rem_euclid(modulus)
}

/// Wrap an hour value into [0, 24).
pub fn fix_hour(hours: f64) -> f64 {
    fix(hours, 24.0)
}

/// Hours from `from` forward to `to`, wrapping past midnight.
pub fn time_diff(from: f64, to: f64) -> f64 {
    fix_hour(to - from)
}

/// Julian day at 00:00 UT of the given Gregorian date (Meeus, ch. 7).
pub fn julian_day(date: NaiveDate) -> f64 {
    let (mut year, mut month) = (date.year() as f64, date.month() as f64);
    let day = date.day() as f64;
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }
    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + b - 1524.5
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    /// Degrees.
    pub declination: f64,
    /// Hours.
    pub equation_of_time: f64,
}

/// Solar declination and equation of time for a Julian day.
pub fn sun_position(jd: f64) -> SunPosition {
    let d = jd - 2451545.0;
    let g = fix(357.529 + 0.98560028 * d, 360.0);
    let q = fix(280.459 + 0.98564736 * d, 360.0);
    let l = fix(q + 1.915 * sin_deg(g) + 0.020 * sin_deg(2.0 * g), 360.0);
    let e = 23.439 - 0.00000036 * d;

    let ra = (cos_deg(e) * sin_deg(l)).atan2(cos_deg(l)).to_degrees() / 15.0;
    let equation_of_time = q / 15.0 - fix_hour(ra);
    let declination = (sin_deg(e) * sin_deg(l)).asin().to_degrees();

    SunPosition {
        declination,
        equation_of_time,
    }
}

/// Which side of solar noon an event lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Before noon.
    Morning,
    /// After noon.
    Evening,
}

/// Sun geometry for one date at one place.
#[derive(Debug, Clone, Copy)]
pub struct SolarDay {
    jd: f64,
    latitude: f64,
}

impl SolarDay {
    pub fn new(date: NaiveDate, latitude: f64, longitude: f64) -> Self {
        Self {
            jd: julian_day(date) - longitude / (15.0 * 24.0),
            latitude,
        }
    }

    /// Solar transit. `estimate` is an approximate time in hours used to
    /// sample the sun's position.
    pub fn mid_day(&self, estimate: f64) -> f64 {
        let eqt = sun_position(self.jd + estimate / 24.0).equation_of_time;
        fix_hour(12.0 - eqt)
    }

    /// Time at which the sun is `angle` degrees below the horizon, or `None`
    /// if it never gets that low (or that high) on this day.
    pub fn sun_angle_time(&self, angle: f64, estimate: f64, direction: Direction) -> Option<f64> {
        let decl = sun_position(self.jd + estimate / 24.0).declination;
        let noon = self.mid_day(estimate);

        let cos_hour_angle = (-sin_deg(angle) - sin_deg(decl) * sin_deg(self.latitude))
            / (cos_deg(decl) * cos_deg(self.latitude));
        if !cos_hour_angle.is_finite() || cos_hour_angle.abs() > 1.0 {
            return None;
        }

        let t = cos_hour_angle.acos().to_degrees() / 15.0;
        Some(match direction {
            Direction::Morning => noon - t,
            Direction::Evening => noon + t,
        })
    }

    /// Afternoon time at which an object's shadow is `shadow_factor` times its
    /// length plus its noon shadow.
    pub fn asr_time(&self, shadow_factor: f64, estimate: f64) -> Option<f64> {
        let decl = sun_position(self.jd + estimate / 24.0).declination;
        let cot = shadow_factor + tan_deg((self.latitude - decl).abs());
        let angle = -(1.0 / cot).atan().to_degrees();
        self.sun_angle_time(angle, estimate, Direction::Evening)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_julian_day_epoch() {
        let j2000 = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(julian_day(j2000), 2451544.5);

        let gregorian_leap = NaiveDate::from_ymd_opt(1600, 12, 31).unwrap();
        assert_eq!(julian_day(gregorian_leap), 2305812.5);
    }

    #[test]
    fn test_declination_at_solstices() {
        let june = sun_position(julian_day(NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()));
        let december = sun_position(julian_day(NaiveDate::from_ymd_opt(2024, 12, 21).unwrap()));
        assert!((june.declination - 23.44).abs() < 0.1);
        assert!((december.declination + 23.44).abs() < 0.1);
    }

    #[test]
    fn test_equation_of_time_early_november() {
        // Sundials run about 16 minutes fast in early November
        let nov = sun_position(julian_day(NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()));
        assert!((nov.equation_of_time * 60.0 - 16.4).abs() < 0.5);
    }

    #[test]
    fn test_polar_night_has_no_sunrise() {
        let day = SolarDay::new(NaiveDate::from_ymd_opt(2024, 12, 21).unwrap(), 78.2, 15.6);
        assert_eq!(day.sun_angle_time(0.833, 6.0, Direction::Morning), None);
        assert!(day.mid_day(12.0) > 11.0);
    }

    #[test]
    fn test_time_diff_wraps_midnight() {
        assert_eq!(time_diff(20.0, 4.0), 8.0);
        assert_eq!(time_diff(4.0, 20.0), 16.0);
    }
}
