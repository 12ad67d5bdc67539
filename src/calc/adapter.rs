//! Validation and offset layer between the coordinator and a calculator.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate};

use super::{CalculationRequest, Calculator, RawTimes};
use crate::config::Configuration;
use crate::error::PrayerError;
use crate::prayer::{Prayer, PrayerTimesSnapshot};

/// Wraps a [`Calculator`] so that callers only ever see complete, ordered
/// snapshots with offsets applied.
#[derive(Clone)]
pub struct CalculatorAdapter {
    calculator: Arc<dyn Calculator>,
}

impl CalculatorAdapter {
    pub fn new(calculator: Arc<dyn Calculator>) -> Self {
        Self { calculator }
    }

    pub fn calculator_name(&self) -> &'static str {
        self.calculator.name()
    }

    /// Compute the snapshot for `date`.
    pub fn calculate(
        &self,
        date: NaiveDate,
        config: &Configuration,
    ) -> Result<PrayerTimesSnapshot, PrayerError> {
        let request = CalculationRequest::from_config(config, date);
        let raw = self.calculator.calculate(&request)?;
        let base = validate(&request, raw)?;
        Ok(apply_offsets(&base, &config.offsets))
    }
}

/// Check that a calculator answer is a complete, ordered day in the requested
/// timezone.
pub fn validate(
    request: &CalculationRequest,
    raw: RawTimes,
) -> Result<PrayerTimesSnapshot, PrayerError> {
    if let Some((prayer, time)) = raw
        .iter()
        .find(|(_, time)| time.timezone() != request.timezone)
    {
        return Err(PrayerError::malformed(format!(
            "{prayer} is in {} instead of {}",
            time.timezone(),
            request.timezone
        )));
    }

    let snapshot = PrayerTimesSnapshot::new(request.date, request.timezone, raw).map_err(
        |missing| {
            let names: Vec<String> = missing.iter().map(|p| p.to_string()).collect();
            PrayerError::malformed(format!("missing {}", names.join(", ")))
        },
    )?;

    let dhuhr = snapshot.get(Prayer::Dhuhr);
    if dhuhr.date_naive() != request.date {
        return Err(PrayerError::malformed(format!(
            "Dhuhr at {dhuhr} is not on {}",
            request.date
        )));
    }

    for pair in Prayer::CHRONOLOGICAL.windows(2) {
        let (earlier, later) = (snapshot.get(pair[0]), snapshot.get(pair[1]));
        if earlier > later {
            return Err(PrayerError::malformed(format!(
                "{} ({}) is after {} ({})",
                pair[0],
                earlier.format("%H:%M"),
                pair[1],
                later.format("%H:%M")
            )));
        }
    }

    Ok(snapshot)
}

/// Shift each prayer by its own offset in minutes. Prayers without an entry,
/// and zero offsets, are left alone.
pub fn apply_offsets(
    base: &PrayerTimesSnapshot,
    offsets: &BTreeMap<Prayer, i64>,
) -> PrayerTimesSnapshot {
    if offsets.values().all(|m| *m == 0) {
        return base.clone();
    }

    base.map_times(|prayer, time| {
        let minutes = offsets.get(&prayer).copied().unwrap_or(0);
        time + ChronoDuration::minutes(minutes)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::MockCalculator;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;

    fn tz() -> Tz {
        chrono_tz::Europe::Istanbul
    }

    fn at(h: u32, m: u32) -> DateTime<Tz> {
        tz().with_ymd_and_hms(2024, 4, 10, h, m, 0).unwrap()
    }

    fn raw_day() -> RawTimes {
        BTreeMap::from([
            (Prayer::Imsak, at(4, 57)),
            (Prayer::Fajr, at(5, 7)),
            (Prayer::Sunrise, at(6, 38)),
            (Prayer::Dhuhr, at(13, 12)),
            (Prayer::Asr, at(16, 50)),
            (Prayer::Sunset, at(19, 36)),
            (Prayer::Maghrib, at(19, 36)),
            (Prayer::Isha, at(21, 1)),
            (Prayer::Midnight, at(23, 50)),
        ])
    }

    fn config() -> Configuration {
        Configuration::new(41.0082, 28.9784, tz())
    }

    fn adapter_returning(raw: RawTimes) -> CalculatorAdapter {
        let mut mock = MockCalculator::new();
        mock.expect_name().return_const("mock");
        mock.expect_calculate().returning(move |_| Ok(raw.clone()));
        CalculatorAdapter::new(Arc::new(mock))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap()
    }

    #[test]
    fn test_fajr_offset_changes_only_fajr() {
        let adapter = adapter_returning(raw_day());
        let mut config = config();
        let base = adapter.calculate(date(), &config).unwrap();

        config.offsets.insert(Prayer::Fajr, 10);
        let tuned = adapter.calculate(date(), &config).unwrap();

        for prayer in Prayer::ALL {
            let expected = if prayer == Prayer::Fajr {
                base.get(prayer) + ChronoDuration::minutes(10)
            } else {
                base.get(prayer)
            };
            assert_eq!(tuned.get(prayer), expected, "{prayer}");
        }
    }

    #[test]
    fn test_offsets_may_break_order() {
        let adapter = adapter_returning(raw_day());
        let mut config = config();
        config.offsets.insert(Prayer::Imsak, 60);

        let tuned = adapter.calculate(date(), &config).unwrap();
        assert!(tuned.get(Prayer::Imsak) > tuned.get(Prayer::Fajr));
    }

    #[test]
    fn test_missing_keys_are_malformed() {
        let mut raw = raw_day();
        raw.remove(&Prayer::Asr);
        let err = adapter_returning(raw).calculate(date(), &config()).unwrap_err();
        assert_eq!(err, PrayerError::malformed("missing Asr"));
    }

    #[test]
    fn test_out_of_order_base_times_are_malformed() {
        let mut raw = raw_day();
        raw.insert(Prayer::Asr, at(12, 0));
        let err = adapter_returning(raw).calculate(date(), &config()).unwrap_err();
        assert!(matches!(err, PrayerError::CalculatorMalformedResult(_)));
    }

    #[test]
    fn test_midnight_is_exempt_from_order() {
        let mut raw = raw_day();
        raw.insert(Prayer::Midnight, at(0, 40));
        assert!(adapter_returning(raw).calculate(date(), &config()).is_ok());
    }

    #[test]
    fn test_foreign_timezone_is_malformed() {
        let mut raw = raw_day();
        let utc_fajr = at(5, 7).with_timezone(&chrono_tz::UTC);
        raw.insert(Prayer::Fajr, utc_fajr);
        let err = adapter_returning(raw).calculate(date(), &config()).unwrap_err();
        assert!(matches!(err, PrayerError::CalculatorMalformedResult(_)));
    }

    #[test]
    fn test_wrong_day_is_malformed() {
        let raw: RawTimes = raw_day()
            .into_iter()
            .map(|(p, t)| (p, t + ChronoDuration::days(1)))
            .collect();
        let err = adapter_returning(raw).calculate(date(), &config()).unwrap_err();
        assert!(matches!(err, PrayerError::CalculatorMalformedResult(_)));
    }

    #[test]
    fn test_calculator_errors_pass_through() {
        let mut mock = MockCalculator::new();
        mock.expect_calculate()
            .returning(|_| Err(PrayerError::unavailable("offline")));
        let adapter = CalculatorAdapter::new(Arc::new(mock));

        let err = adapter.calculate(date(), &config()).unwrap_err();
        assert_eq!(err, PrayerError::unavailable("offline"));
    }
}
