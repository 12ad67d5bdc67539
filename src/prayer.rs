//! Prayer names and the immutable snapshot of one day's prayer times.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One of the nine daily timestamps.
///
/// The declaration order is the order used for display and iteration; the
/// chronological order of a normal day is [`Prayer::CHRONOLOGICAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Imsak,
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Sunset,
    Isha,
    Midnight,
}

impl Prayer {
    pub const ALL: [Prayer; 9] = [
        Prayer::Imsak,
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Sunset,
        Prayer::Isha,
        Prayer::Midnight,
    ];

    /// Order in which the base (un-tuned) times of one day must occur.
    /// Midnight is left out: with minute-based Isha it can precede Isha on
    /// very short summer nights.
    pub const CHRONOLOGICAL: [Prayer; 8] = [
        Prayer::Imsak,
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Sunset,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Imsak => "Imsak",
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Sunset => "Sunset",
            Prayer::Isha => "Isha",
            Prayer::Midnight => "Midnight",
        }
    }

    /// The five obligatory prayers, as opposed to the informational times
    /// (Imsak, Sunrise, Sunset, Midnight).
    pub fn is_prayer(&self) -> bool {
        matches!(
            self,
            Prayer::Fajr | Prayer::Dhuhr | Prayer::Asr | Prayer::Maghrib | Prayer::Isha
        )
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prayer::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown prayer '{s}'"))
    }
}

/// Prayer times for one calendar day at one location.
///
/// Built once from a successful calculation and never mutated afterwards; a
/// later refresh publishes a new snapshot instead. Equality compares the
/// values only, so two calculations of the same day compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerTimesSnapshot {
    date: NaiveDate,
    timezone: Tz,
    times: BTreeMap<Prayer, DateTime<Tz>>,
}

impl PrayerTimesSnapshot {
    /// Build a snapshot from a complete mapping.
    ///
    /// Returns the missing prayers as the error if the mapping is incomplete.
    pub fn new(
        date: NaiveDate,
        timezone: Tz,
        times: BTreeMap<Prayer, DateTime<Tz>>,
    ) -> Result<Self, Vec<Prayer>> {
        let missing: Vec<Prayer> = Prayer::ALL
            .into_iter()
            .filter(|p| !times.contains_key(p))
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let times = times
            .into_iter()
            .map(|(prayer, time)| (prayer, time.with_timezone(&timezone)))
            .collect();

        Ok(Self {
            date,
            timezone,
            times,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Timestamp for one prayer. Every key is present by construction.
    pub fn get(&self, prayer: Prayer) -> DateTime<Tz> {
        self.times[&prayer]
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Prayer, DateTime<Tz>)> + '_ {
        self.times.iter().map(|(p, t)| (*p, *t))
    }

    /// Same day with every timestamp passed through `f`.
    pub fn map_times(&self, f: impl Fn(Prayer, DateTime<Tz>) -> DateTime<Tz>) -> Self {
        let times = self
            .times
            .iter()
            .map(|(prayer, time)| (*prayer, f(*prayer, *time).with_timezone(&self.timezone)))
            .collect();
        Self {
            date: self.date,
            timezone: self.timezone,
            times,
        }
    }

    /// Whether the given prayers occur in non-decreasing order.
    pub fn is_ordered(&self, order: &[Prayer]) -> bool {
        order
            .windows(2)
            .all(|pair| self.get(pair[0]) <= self.get(pair[1]))
    }

    /// The first of the five prayers strictly after `now`, if any remains
    /// today.
    pub fn next_prayer_after(&self, now: DateTime<Tz>) -> Option<(Prayer, DateTime<Tz>)> {
        self.iter()
            .filter(|(prayer, time)| prayer.is_prayer() && *time > now)
            .min_by_key(|(_, time)| *time)
    }

    /// JSON object mapping prayer names to RFC 3339 timestamps.
    pub fn to_json(&self) -> serde_json::Value {
        let times: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|(prayer, time)| (prayer.to_string(), time.to_rfc3339().into()))
            .collect();

        serde_json::json!({
            "date": self.date.to_string(),
            "timezone": self.timezone.name(),
            "timings": times,
        })
    }
}
