use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
use chrono_tz::Tz;
use proptest::prelude::*;

use prayertimes::coordinator::{RetryPolicy, schedule_next_refresh};
use prayertimes::{Prayer, PrayerTimesSnapshot};

const ZONES: [Tz; 5] = [
    chrono_tz::UTC,
    chrono_tz::America::New_York,
    chrono_tz::America::Santiago,
    chrono_tz::Asia::Kolkata,
    chrono_tz::Australia::Lord_Howe,
];

/// Snapshot whose times are all `now` except Midnight.
fn snapshot(now: DateTime<Tz>, midnight: DateTime<Tz>) -> PrayerTimesSnapshot {
    let mut times: BTreeMap<Prayer, DateTime<Tz>> =
        Prayer::ALL.iter().map(|prayer| (*prayer, now)).collect();
    times.insert(Prayer::Midnight, midnight);
    PrayerTimesSnapshot::new(now.date_naive(), now.timezone(), times).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_next_refresh_is_ahead_and_within_a_day(
        zone_index in 0usize..ZONES.len(),
        timestamp in 1_577_836_800i64..1_893_456_000, // 2020..2030
        midnight_offset_minutes in -720i64..2160,
    ) {
        let tz = ZONES[zone_index];
        let now = tz.timestamp_opt(timestamp, 0).unwrap();
        let midnight = now + ChronoDuration::minutes(midnight_offset_minutes);

        let next = schedule_next_refresh(now, &snapshot(now, midnight));

        prop_assert!(next > now);
        prop_assert!(next - now <= ChronoDuration::hours(25));
        prop_assert!(next.date_naive() >= now.date_naive());

        if midnight > now && next.date_naive() == now.date_naive() {
            // Only the Midnight value can land on the same local day
            prop_assert_eq!(next, midnight);
        }
        if next != midnight {
            prop_assert!(next.date_naive() > now.date_naive());
        }
    }

    #[test]
    fn prop_retry_delays_grow_and_stay_capped(
        base_secs in 1u64..600,
        extra_secs in 0u64..86_400,
        attempts in 1u32..64,
    ) {
        let policy = RetryPolicy::new(
            Duration::from_secs(base_secs),
            Duration::from_secs(base_secs + extra_secs),
        );

        prop_assert_eq!(policy.delay(1), policy.base);
        let mut previous = Duration::ZERO;
        for attempt in 1..=attempts {
            let delay = policy.delay(attempt);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= policy.max);
            previous = delay;
        }
    }
}

#[test]
fn test_first_retry_never_exceeds_cap() {
    let policy = RetryPolicy::new(Duration::from_secs(600), Duration::from_secs(300));
    assert_eq!(policy.delay(1), Duration::from_secs(300));
    assert_eq!(policy.delay(0), Duration::from_secs(300));
}
