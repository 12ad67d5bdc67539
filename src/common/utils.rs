//! Path display and calendar helpers.

use std::path::Path;

use chrono::{
    DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Display a path with the home directory replaced by `~`.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// First instant of `date` in `tz`.
///
/// Local midnight does not exist on some DST transition days (for example in
/// zones that spring forward at 00:00). The first valid instant of the day is
/// used instead.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    resolve_local(date.and_time(NaiveTime::MIN), tz)
}

/// Instant for a wall-clock time in `tz`.
///
/// Ambiguous times resolve to the earlier instant; times inside a DST gap
/// move forward to the first wall-clock minute that exists.
pub fn resolve_local(local: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    if let Some(instant) = tz.from_local_datetime(&local).earliest() {
        return instant;
    }

    // Gaps never exceed a few hours
    for minutes in 1..=(24 * 60) {
        let candidate = local + ChronoDuration::minutes(minutes);
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant;
        }
    }

    Utc.from_utc_datetime(&local).with_timezone(&tz)
}

/// Human readable "1h 05m" style duration, never negative.
pub fn format_duration(duration: ChronoDuration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_day_regular() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let start = start_of_day(date, chrono_tz::Europe::Berlin);
        assert_eq!(start.to_rfc3339(), "2024-01-02T00:00:00+01:00");
    }

    #[test]
    fn test_start_of_day_skips_midnight_gap() {
        // Santiago springs forward from 00:00 to 01:00
        let date = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();
        let start = start_of_day(date, chrono_tz::America::Santiago);
        assert_eq!(start.date_naive(), date);
        assert_eq!(start.to_rfc3339(), "2024-09-08T01:00:00-03:00");
    }

    #[test]
    fn test_resolve_local_in_gap_moves_forward() {
        let local = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let resolved = resolve_local(local, chrono_tz::Europe::Berlin);
        assert_eq!(resolved.to_rfc3339(), "2024-03-31T03:00:00+02:00");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(ChronoDuration::minutes(5)), "5m");
        assert_eq!(format_duration(ChronoDuration::minutes(65)), "1h 05m");
        assert_eq!(format_duration(ChronoDuration::minutes(-3)), "0m");
    }

    #[test]
    fn test_private_path_outside_home() {
        assert_eq!(private_path(Path::new("/etc/prayertimes.toml")), "/etc/prayertimes.toml");
    }
}
