//! Observers of the coordinator's snapshot.
//!
//! Observers are notified after every successful refresh and pull the value
//! they care about from the coordinator. They never trigger a calculation.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::ErrorKind;
use crate::prayer::{Prayer, PrayerTimesSnapshot};

/// Read access to the most recently published snapshot.
pub trait SnapshotSource: Send + Sync {
    fn get_current_snapshot(&self) -> Option<Arc<PrayerTimesSnapshot>>;
}

/// Something that reacts to a newly published snapshot.
pub trait Observer: Send + Sync {
    /// Called once per successful refresh. An error is logged by the
    /// notifier and does not affect other observers.
    fn receive_update(&self, source: &dyn SnapshotSource) -> Result<()>;

    /// Name used in log messages.
    fn name(&self) -> String {
        "observer".to_string()
    }
}

/// Callbacks for the application embedding the coordinator.
///
/// Both methods default to doing nothing.
pub trait HostListener: Send + Sync {
    fn on_data_updated(&self, _snapshot: &PrayerTimesSnapshot) {}

    fn on_refresh_failed(&self, _kind: ErrorKind, _attempt: u32) {}
}

/// Listener that ignores every callback.
pub struct NoopListener;

impl HostListener for NoopListener {}

/// Listener used by the daemon: logs each published day.
pub struct LoggingListener {
    debug_enabled: bool,
}

impl LoggingListener {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }
}

impl HostListener for LoggingListener {
    fn on_data_updated(&self, snapshot: &PrayerTimesSnapshot) {
        log_block_start!(
            "Prayer times for {} ({})",
            snapshot.date().format("%A, %B %-d"),
            snapshot.timezone().name()
        );
        for (prayer, time) in snapshot.iter() {
            let day_note = if time.date_naive() != snapshot.date() {
                format!(" ({})", time.format("%b %-d"))
            } else {
                String::new()
            };
            log_indented!("{:<9}{}{}", prayer.as_str(), time.format("%H:%M"), day_note);
        }
    }

    fn on_refresh_failed(&self, kind: ErrorKind, attempt: u32) {
        if self.debug_enabled {
            log_debug!("Refresh failure reported: {kind} (attempt {attempt})");
        }
    }
}

/// Handle returned by [`ObserverList::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Registered observers.
#[derive(Default)]
pub struct ObserverList {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Arc<dyn Observer>)>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, observer));
        id
    }

    /// Returns whether `id` was registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.lock();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an update to every observer.
    ///
    /// The list is copied first so observers may subscribe or unsubscribe
    /// from inside `receive_update`. Errors and panics are caught per
    /// observer.
    pub fn notify(&self, source: &dyn SnapshotSource) -> NotifyReport {
        let observers: Vec<(ObserverId, Arc<dyn Observer>)> = self.lock().clone();
        let mut report = NotifyReport::default();

        for (id, observer) in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.receive_update(source))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    log_warning!("Observer {} ({id}) failed to update: {e}", observer.name());
                    report.failed += 1;
                }
                Err(_) => {
                    log_warning!("Observer {} ({id}) panicked during update", observer.name());
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ObserverId, Arc<dyn Observer>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Observer exposing one prayer's timestamp, the way a host would present a
/// sensor entity.
pub struct PrayerTimeSensor {
    prayer: Prayer,
    value: Mutex<Option<DateTime<Tz>>>,
}

impl PrayerTimeSensor {
    pub fn new(prayer: Prayer) -> Self {
        Self {
            prayer,
            value: Mutex::new(None),
        }
    }

    /// One sensor for each prayer, in declaration order.
    pub fn all() -> Vec<Arc<PrayerTimeSensor>> {
        Prayer::ALL
            .iter()
            .map(|prayer| Arc::new(PrayerTimeSensor::new(*prayer)))
            .collect()
    }

    pub fn prayer(&self) -> Prayer {
        self.prayer
    }

    /// Last value read from the coordinator, `None` until the first update.
    pub fn native_value(&self) -> Option<DateTime<Tz>> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Observer for PrayerTimeSensor {
    fn receive_update(&self, source: &dyn SnapshotSource) -> Result<()> {
        let value = source
            .get_current_snapshot()
            .map(|snapshot| snapshot.get(self.prayer));
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
        Ok(())
    }

    fn name(&self) -> String {
        format!("{} sensor", self.prayer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;

    struct FixedSource(Option<Arc<PrayerTimesSnapshot>>);

    impl SnapshotSource for FixedSource {
        fn get_current_snapshot(&self) -> Option<Arc<PrayerTimesSnapshot>> {
            self.0.clone()
        }
    }

    struct Counting(AtomicUsize);

    impl Observer for Counting {
        fn receive_update(&self, _source: &dyn SnapshotSource) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl Observer for Failing {
        fn receive_update(&self, _source: &dyn SnapshotSource) -> Result<()> {
            anyhow::bail!("display unavailable")
        }
    }

    struct Panicking;

    impl Observer for Panicking {
        fn receive_update(&self, _source: &dyn SnapshotSource) -> Result<()> {
            panic!("observer bug")
        }
    }

    fn snapshot() -> Arc<PrayerTimesSnapshot> {
        let tz = chrono_tz::Asia::Karachi;
        let times: BTreeMap<Prayer, DateTime<Tz>> = Prayer::ALL
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, tz.with_ymd_and_hms(2024, 5, 1, 4 + i as u32 * 2, 0, 0).unwrap()))
            .collect();
        Arc::new(PrayerTimesSnapshot::new(times[&Prayer::Dhuhr].date_naive(), tz, times).unwrap())
    }

    #[test]
    fn test_sensor_reads_its_prayer() {
        let snapshot = snapshot();
        let sensor = PrayerTimeSensor::new(Prayer::Asr);
        assert_eq!(sensor.native_value(), None);

        sensor
            .receive_update(&FixedSource(Some(snapshot.clone())))
            .unwrap();
        assert_eq!(sensor.native_value(), Some(snapshot.get(Prayer::Asr)));
        assert_eq!(sensor.name(), "Asr sensor");
    }

    #[test]
    fn test_sensor_without_snapshot_is_unavailable() {
        let sensor = PrayerTimeSensor::new(Prayer::Fajr);
        sensor.receive_update(&FixedSource(None)).unwrap();
        assert_eq!(sensor.native_value(), None);
    }

    #[test]
    fn test_failing_observers_do_not_block_others() {
        let list = ObserverList::new();
        let first = Arc::new(Counting(AtomicUsize::new(0)));
        let last = Arc::new(Counting(AtomicUsize::new(0)));

        list.subscribe(first.clone());
        list.subscribe(Arc::new(Failing));
        list.subscribe(Arc::new(Panicking));
        list.subscribe(last.clone());

        let report = list.notify(&FixedSource(Some(snapshot())));
        assert_eq!(report, NotifyReport { delivered: 2, failed: 2 });
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(last.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let list = ObserverList::new();
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let id = list.subscribe(counter.clone());
        let other = list.subscribe(Arc::new(Failing));
        assert_ne!(id, other);

        assert!(list.unsubscribe(id));
        assert!(!list.unsubscribe(id));
        assert_eq!(list.len(), 1);

        list.notify(&FixedSource(None));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }
}
