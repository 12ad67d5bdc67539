//! Time source abstraction injected into the coordinator.
//!
//! Production code uses [`RealTimeSource`]. Tests drive the coordinator with a
//! [`ManualTimeSource`] whose clock only moves when told to, so date rollovers
//! and retry deadlines can be exercised without waiting.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Trait for abstracting the wall clock.
pub trait TimeSource: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current instant expressed in `tz`.
    fn now_in(&self, tz: Tz) -> DateTime<Tz> {
        self.now().with_timezone(&tz)
    }
}

/// Real-time implementation that uses the system clock.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that stands still until it is set or advanced.
#[cfg(any(test, feature = "testing-support"))]
pub struct ManualTimeSource {
    current: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(any(test, feature = "testing-support"))]
impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: std::sync::Mutex::new(start),
        }
    }

    /// Start at a wall-clock time in the given timezone.
    pub fn at_local(tz: Tz, s: &str) -> Self {
        let start = parse_datetime_in_tz(s, tz).expect("valid test datetime");
        Self::new(start.with_timezone(&Utc))
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock().unwrap() = instant;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut guard = self.current.lock().unwrap();
        *guard += by;
    }
}

#[cfg(any(test, feature = "testing-support"))]
impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap()
    }
}

/// Parse a date in the format "YYYY-MM-DD"
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date format: {e}. Use YYYY-MM-DD"))
}

/// Parse a datetime string in a specific timezone
pub fn parse_datetime_in_tz(s: &str, tz: Tz) -> Result<DateTime<Tz>, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))
        .and_then(|naive| {
            tz.from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| format!("Nonexistent local time in timezone {tz}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_source_only_moves_when_told() {
        let clock = ManualTimeSource::at_local(chrono_tz::UTC, "2024-01-01 23:00:00");
        let before = clock.now();
        assert_eq!(clock.now(), before);

        clock.advance(ChronoDuration::minutes(90));
        assert_eq!(clock.now() - before, ChronoDuration::minutes(90));
        assert_eq!(clock.now_in(chrono_tz::UTC).date_naive().to_string(), "2024-01-02");
    }

    #[test]
    fn test_parse_date_rejects_other_formats() {
        assert!(parse_date("2024-02-29").is_ok());
        assert!(parse_date("29-02-2024").is_err());
        assert!(parse_date("2023-02-29").is_err());
    }

    #[test]
    fn test_parse_datetime_in_dst_gap_is_rejected() {
        // 02:30 does not exist in New York on the spring-forward day
        let gap = parse_datetime_in_tz("2024-03-10 02:30:00", chrono_tz::America::New_York);
        assert!(gap.is_err());

        // The repeated hour in autumn resolves to the first occurrence
        let fold = parse_datetime_in_tz("2024-11-03 01:30:00", chrono_tz::America::New_York)
            .unwrap();
        assert_eq!(fold.to_rfc3339(), "2024-11-03T01:30:00-04:00");
    }
}
