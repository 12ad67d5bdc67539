//! `next` command: the next of the five daily prayers.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration};
use chrono_tz::Tz;

use crate::common::utils::format_duration;
use crate::prayer::{Prayer, PrayerTimesSnapshot};
use crate::time_source::{RealTimeSource, TimeSource};

pub fn run_next_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let (config, adapter) = super::load_calculation_context()?;
    let now = RealTimeSource.now_in(config.timezone);

    let today = adapter
        .calculate(now.date_naive(), &config)
        .context("Failed to calculate today's prayer times")?;

    let (prayer, time) = match today.next_prayer_after(now) {
        Some(next) => next,
        None => {
            // After Isha: the next prayer is tomorrow's Fajr
            let tomorrow_date = now
                .date_naive()
                .succ_opt()
                .context("Date out of range")?;
            let tomorrow = adapter
                .calculate(tomorrow_date, &config)
                .context("Failed to calculate tomorrow's prayer times")?;
            (Prayer::Fajr, tomorrow.get(Prayer::Fajr))
        }
    };

    if debug_enabled {
        log_block_start!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S %Z"));
        if let Some((previous, at)) = previous_prayer(&today, now) {
            log_indented!("Previous: {} at {}", previous, at.format("%H:%M"));
        }
    }

    log_block_start!(
        "Next: {} at {} (in {})",
        prayer,
        time.format("%H:%M"),
        format_duration(remaining(now, time))
    );
    log_end!();
    Ok(())
}

/// The last of the five prayers at or before `now`.
fn previous_prayer(
    snapshot: &PrayerTimesSnapshot,
    now: DateTime<Tz>,
) -> Option<(Prayer, DateTime<Tz>)> {
    snapshot
        .iter()
        .filter(|(prayer, time)| prayer.is_prayer() && *time <= now)
        .max_by_key(|(_, time)| *time)
}

/// Time until `at`, rounded up to the next whole minute.
fn remaining(now: DateTime<Tz>, at: DateTime<Tz>) -> ChronoDuration {
    let seconds = (at - now).num_seconds().max(0);
    ChronoDuration::minutes((seconds + 59) / 60)
}

pub fn display_help() {
    log_version!();
    log_block_start!("next - Show the next prayer");
    log_block_start!("Usage: prayertimes next");
    log_indented!("Prints the next of Fajr, Dhuhr, Asr, Maghrib and Isha and the");
    log_indented!("time remaining until it, rolling over to tomorrow's Fajr after Isha.");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn snapshot() -> PrayerTimesSnapshot {
        let tz = chrono_tz::Africa::Cairo;
        let at = |h, m| tz.with_ymd_and_hms(2024, 2, 1, h, m, 0).unwrap();
        let times = BTreeMap::from([
            (Prayer::Imsak, at(4, 58)),
            (Prayer::Fajr, at(5, 8)),
            (Prayer::Sunrise, at(6, 38)),
            (Prayer::Dhuhr, at(12, 8)),
            (Prayer::Asr, at(15, 11)),
            (Prayer::Sunset, at(17, 37)),
            (Prayer::Maghrib, at(17, 37)),
            (Prayer::Isha, at(18, 56)),
            (Prayer::Midnight, at(23, 53)),
        ]);
        PrayerTimesSnapshot::new(at(0, 0).date_naive(), tz, times).unwrap()
    }

    #[test]
    fn test_previous_prayer_skips_non_prayers() {
        let snapshot = snapshot();
        let tz = snapshot.timezone();

        let after_sunrise = tz.with_ymd_and_hms(2024, 2, 1, 7, 0, 0).unwrap();
        assert_eq!(
            previous_prayer(&snapshot, after_sunrise).map(|(p, _)| p),
            Some(Prayer::Fajr)
        );

        let before_fajr = tz.with_ymd_and_hms(2024, 2, 1, 5, 0, 0).unwrap();
        assert_eq!(previous_prayer(&snapshot, before_fajr), None);
    }

    #[test]
    fn test_remaining_rounds_up() {
        let tz = chrono_tz::Africa::Cairo;
        let now = tz.with_ymd_and_hms(2024, 2, 1, 12, 0, 30).unwrap();
        let at = tz.with_ymd_and_hms(2024, 2, 1, 12, 8, 0).unwrap();
        assert_eq!(remaining(now, at), ChronoDuration::minutes(8));
        assert_eq!(remaining(at, now), ChronoDuration::zero());
    }
}
