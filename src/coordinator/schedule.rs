//! Refresh scheduling and retry backoff.
//!
//! Both are pure functions of their inputs so the timer thread and the tests
//! agree on exactly when the next refresh is due.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration};
use chrono_tz::Tz;

use crate::common::utils::start_of_day;
use crate::config::RefreshSettings;
use crate::prayer::{Prayer, PrayerTimesSnapshot};

/// When the next refresh should run after publishing `snapshot` at `now`.
///
/// This is the start of the following local day, unless the snapshot's
/// Midnight falls strictly between `now` and that instant, in which case it
/// is the Midnight value. A following day whose midnight does not exist
/// locally starts at its first valid instant.
pub fn schedule_next_refresh(now: DateTime<Tz>, snapshot: &PrayerTimesSnapshot) -> DateTime<Tz> {
    let tz = now.timezone();
    let next_midnight = match now.date_naive().succ_opt() {
        Some(tomorrow) => start_of_day(tomorrow, tz),
        None => now + ChronoDuration::days(1),
    };

    let midnight = snapshot.get(Prayer::Midnight).with_timezone(&tz);
    if midnight > now && midnight < next_midnight {
        midnight
    } else {
        next_midnight
    }
}

/// Exponential backoff between failed refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_settings(settings: &RefreshSettings) -> Self {
        Self::new(settings.retry_base, settings.retry_max)
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn snapshot_with_midnight(tz: Tz, midnight: DateTime<Tz>) -> PrayerTimesSnapshot {
        let date = midnight.date_naive();
        let noon = tz.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut times: BTreeMap<Prayer, DateTime<Tz>> =
            Prayer::ALL.iter().map(|p| (*p, noon)).collect();
        times.insert(Prayer::Midnight, midnight);
        PrayerTimesSnapshot::new(date, tz, times).unwrap()
    }

    #[test]
    fn test_midnight_before_rollover_wins() {
        let tz = chrono_tz::UTC;
        let now = tz.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        let midnight = tz.with_ymd_and_hms(2024, 1, 1, 23, 50, 0).unwrap();

        let next = schedule_next_refresh(now, &snapshot_with_midnight(tz, midnight));
        assert_eq!(next, midnight);
    }

    #[test]
    fn test_rollover_before_midnight_wins() {
        let tz = chrono_tz::UTC;
        let now = tz.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        let midnight = tz.with_ymd_and_hms(2024, 1, 2, 0, 10, 0).unwrap();

        let next = schedule_next_refresh(now, &snapshot_with_midnight(tz, midnight));
        assert_eq!(next, tz.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_past_midnight_is_ignored() {
        let tz = chrono_tz::Europe::London;
        let now = tz.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let midnight = tz.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap();

        let next = schedule_next_refresh(now, &snapshot_with_midnight(tz, midnight));
        assert_eq!(next, tz.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_midnight_equal_to_now_is_ignored() {
        let tz = chrono_tz::UTC;
        let now = tz.with_ymd_and_hms(2024, 1, 1, 23, 50, 0).unwrap();

        let next = schedule_next_refresh(now, &snapshot_with_midnight(tz, now));
        assert_eq!(next, tz.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_rollover_into_dst_gap() {
        // Santiago skipped 00:00-01:00 on 2024-09-08
        let tz = chrono_tz::America::Santiago;
        let now = tz.with_ymd_and_hms(2024, 9, 7, 22, 0, 0).unwrap();
        let midnight = tz.with_ymd_and_hms(2024, 9, 7, 21, 0, 0).unwrap();

        let next = schedule_next_refresh(now, &snapshot_with_midnight(tz, midnight));
        assert_eq!(next.date_naive().to_string(), "2024-09-08");
        assert_eq!(next.format("%H:%M").to_string(), "01:00");
        assert!(next > now);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(Duration::from_secs(60), Duration::from_secs(3600));

        assert_eq!(policy.delay(1), Duration::from_secs(60));
        assert_eq!(policy.delay(2), Duration::from_secs(120));
        assert_eq!(policy.delay(3), Duration::from_secs(240));
        assert_eq!(policy.delay(6), Duration::from_secs(1920));
        assert_eq!(policy.delay(7), Duration::from_secs(3600));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(3600));
    }

    #[test]
    fn test_backoff_attempt_zero_uses_base() {
        let policy = RetryPolicy::new(Duration::from_secs(5), Duration::from_secs(50));
        assert_eq!(policy.delay(0), Duration::from_secs(5));
    }
}
