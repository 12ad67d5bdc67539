//! Refresh coordinator for the cached prayer-time snapshot.
//!
//! The [`Coordinator`] owns the single published [`PrayerTimesSnapshot`] for
//! the configured location. It decides when to recompute (calendar rollover,
//! the computed Midnight, retries after a failure or an explicit request),
//! runs the calculator with a timeout, and fans the result out to observers.
//!
//! Phases:
//!
//! ```text
//! Uninitialized --success--> Fresh --tick--> Refreshing --success--> Fresh
//!       |                                        |
//!       +--failure (retry pending)               +--failure--> Stale --retry success--> Fresh
//!
//! any --shutdown--> ShutDown
//! ```
//!
//! Readers never block on a refresh: the snapshot is an `Arc` swapped under a
//! short write lock, so they see either the old or the new value. At most one
//! refresh runs at a time; overlapping requests are coalesced.

pub mod observer;
pub mod schedule;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::calc::{Calculator, CalculatorAdapter, build_calculator};
use crate::common::constants::TIMER_SLICE_SECS;
use crate::common::utils::format_duration;
use crate::config::{Configuration, validate_configuration};
use crate::error::{ErrorKind, PrayerError};
use crate::prayer::PrayerTimesSnapshot;
use crate::time_source::TimeSource;

pub use observer::{
    HostListener, LoggingListener, NoopListener, NotifyReport, Observer, ObserverId,
    ObserverList, PrayerTimeSensor, SnapshotSource,
};
pub use schedule::{RetryPolicy, schedule_next_refresh};

/// Pause before the timer retries a due refresh that was coalesced into one
/// already running.
const COALESCED_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Lifecycle phase of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No snapshot has been published yet.
    Uninitialized,
    /// The published snapshot is current.
    Fresh,
    /// A calculation is in flight.
    Refreshing,
    /// The last refresh failed; the previous snapshot is still served.
    Stale,
    /// Terminal.
    ShutDown,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Fresh => "fresh",
            Phase::Refreshing => "refreshing",
            Phase::Stale => "stale",
            Phase::ShutDown => "shut down",
        };
        f.write_str(name)
    }
}

/// What a call to [`Coordinator::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was published.
    Updated,
    /// The calculation failed; the previous snapshot (if any) is kept.
    Failed(ErrorKind),
    /// Another refresh was already in flight.
    Coalesced,
    /// The coordinator shut down while the calculation ran.
    Discarded,
    /// No configuration has been installed yet.
    NotConfigured,
    /// The coordinator had already shut down.
    ShutDown,
}

/// Read-only view of the coordinator state.
#[derive(Debug, Clone)]
pub struct CoordinatorStatus {
    pub phase: Phase,
    pub snapshot: Option<Arc<PrayerTimesSnapshot>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub next_refresh: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<ErrorKind>,
    pub calculator: Option<&'static str>,
}

#[derive(Debug)]
struct CoordinatorState {
    phase: Phase,
    snapshot: Option<Arc<PrayerTimesSnapshot>>,
    last_updated: Option<DateTime<Utc>>,
    next_refresh: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_error: Option<ErrorKind>,
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self {
            phase: Phase::Uninitialized,
            snapshot: None,
            last_updated: None,
            next_refresh: None,
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

/// Configuration and the calculator built for it, swapped together.
struct Installed {
    config: Arc<Configuration>,
    adapter: CalculatorAdapter,
}

enum TimerMessage {
    Wake,
    RefreshNow,
    Stop,
}

/// Owner of the cached snapshot and its refresh schedule.
pub struct Coordinator {
    time_source: Arc<dyn TimeSource>,
    listener: Arc<dyn HostListener>,
    /// Used instead of the configured source when set.
    fixed_calculator: Option<Arc<dyn Calculator>>,
    installed: RwLock<Option<Installed>>,
    state: RwLock<CoordinatorState>,
    observers: ObserverList,
    in_flight: AtomicBool,
    generation: AtomicU64,
    shut_down: AtomicBool,
    timer: Mutex<Option<Sender<TimerMessage>>>,
    debug_enabled: bool,
}

impl Coordinator {
    /// Coordinator whose calculator follows the configured source.
    pub fn new(time_source: Arc<dyn TimeSource>, listener: Arc<dyn HostListener>) -> Self {
        Self::build(time_source, listener, None)
    }

    /// Coordinator that always uses `calculator`, whatever the source.
    pub fn with_calculator(
        calculator: Arc<dyn Calculator>,
        time_source: Arc<dyn TimeSource>,
        listener: Arc<dyn HostListener>,
    ) -> Self {
        Self::build(time_source, listener, Some(calculator))
    }

    fn build(
        time_source: Arc<dyn TimeSource>,
        listener: Arc<dyn HostListener>,
        fixed_calculator: Option<Arc<dyn Calculator>>,
    ) -> Self {
        Self {
            time_source,
            listener,
            fixed_calculator,
            installed: RwLock::new(None),
            state: RwLock::new(CoordinatorState::default()),
            observers: ObserverList::new(),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
            timer: Mutex::new(None),
            debug_enabled: false,
        }
    }

    /// Enable debug logging of refresh decisions.
    pub fn with_debug(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }

    /// Validate and install a configuration, then refresh immediately.
    ///
    /// An invalid configuration is rejected and the previous one stays
    /// installed. The refresh itself never makes this fail: its outcome is
    /// reported through the host listener.
    pub fn configure(&self, config: Configuration) -> Result<(), PrayerError> {
        validate_configuration(&config)?;

        if self.is_shut_down() {
            return Ok(());
        }

        let adapter = self.adapter_for(&config)?;
        {
            let mut installed = self.installed.write().unwrap_or_else(PoisonError::into_inner);
            *installed = Some(Installed {
                config: Arc::new(config),
                adapter,
            });
            // Incremented under the lock so a refresh never pairs a new
            // generation with the old configuration.
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Configuration installed, refreshing prayer times");
        }

        self.refresh();
        self.wake_timer();
        Ok(())
    }

    /// Reuse the current calculator when the source is unchanged.
    fn adapter_for(&self, config: &Configuration) -> Result<CalculatorAdapter, PrayerError> {
        if let Some(calculator) = &self.fixed_calculator {
            return Ok(CalculatorAdapter::new(calculator.clone()));
        }

        if let Some(current) = self.installed.read().unwrap_or_else(PoisonError::into_inner).as_ref()
            && current.config.source == config.source
            && current.config.refresh.calculator_timeout == config.refresh.calculator_timeout
        {
            return Ok(current.adapter.clone());
        }

        Ok(CalculatorAdapter::new(build_calculator(config)?))
    }

    /// The configuration currently installed.
    pub fn configuration(&self) -> Option<Arc<Configuration>> {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|installed| installed.config.clone())
    }

    /// Recompute today's snapshot now.
    ///
    /// Today is the current date in the configured timezone. The calculator
    /// runs on a helper thread bounded by the configured timeout; no lock is
    /// held while it runs.
    pub fn refresh(&self) -> RefreshOutcome {
        if self.is_shut_down() {
            return RefreshOutcome::ShutDown;
        }
        if !self.try_begin_refresh() {
            if self.debug_enabled {
                log_debug!("Refresh already in progress, request coalesced");
            }
            return RefreshOutcome::Coalesced;
        }

        loop {
            let (outcome, generation) = {
                let _in_flight = InFlightGuard(&self.in_flight);
                match self.refresh_in_flight() {
                    Some(result) => result,
                    None => return RefreshOutcome::NotConfigured,
                }
            };

            // A configure that coalesced into this refresh bumped the
            // generation before trying to start its own. The flag is released
            // at this point, so either that configure runs the refresh itself
            // or the check below sees the new generation.
            if matches!(outcome, RefreshOutcome::Discarded)
                || self.is_shut_down()
                || self.generation.load(Ordering::SeqCst) == generation
                || !self.try_begin_refresh()
            {
                return outcome;
            }
            if self.debug_enabled {
                log_debug!("Configuration changed while publishing, recalculating");
            }
        }
    }

    fn try_begin_refresh(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// One refresh with the in-flight flag held. Returns the outcome and the
    /// configuration generation it was computed for, or `None` when nothing
    /// is installed.
    fn refresh_in_flight(&self) -> Option<(RefreshOutcome, u64)> {
        loop {
            let (generation, config, adapter) = {
                let installed = self.installed.read().unwrap_or_else(PoisonError::into_inner);
                let installed = installed.as_ref()?;
                (
                    self.generation.load(Ordering::SeqCst),
                    installed.config.clone(),
                    installed.adapter.clone(),
                )
            };

            {
                let mut state = self.write_state();
                if state.phase != Phase::ShutDown {
                    state.phase = Phase::Refreshing;
                }
            }

            let now = self.time_source.now_in(config.timezone);
            let result = run_calculation(adapter, config.clone(), now.date_naive());

            if self.is_shut_down() {
                return Some((RefreshOutcome::Discarded, generation));
            }
            if self.generation.load(Ordering::SeqCst) != generation {
                if self.debug_enabled {
                    log_debug!("Configuration changed during refresh, recalculating");
                }
                continue;
            }

            let outcome = match result {
                Ok(snapshot) => self.publish(snapshot, now),
                Err(error) => self.record_failure(error, &config),
            };
            return Some((outcome, generation));
        }
    }

    fn publish(&self, snapshot: PrayerTimesSnapshot, now: DateTime<Tz>) -> RefreshOutcome {
        let snapshot = Arc::new(snapshot);
        let next_refresh = schedule_next_refresh(now, &snapshot);

        {
            let mut state = self.write_state();
            if self.is_shut_down() {
                return RefreshOutcome::Discarded;
            }
            state.snapshot = Some(snapshot.clone());
            state.last_updated = Some(self.time_source.now());
            state.next_refresh = Some(next_refresh.with_timezone(&Utc));
            state.consecutive_failures = 0;
            state.last_error = None;
            state.phase = Phase::Fresh;
        }

        if self.debug_enabled {
            log_debug!(
                "Next refresh at {}",
                next_refresh.format("%Y-%m-%d %H:%M:%S %Z")
            );
        }

        if self.is_shut_down() {
            return RefreshOutcome::Discarded;
        }

        if catch_unwind(AssertUnwindSafe(|| self.listener.on_data_updated(&snapshot))).is_err() {
            log_warning!("Host listener panicked while handling new prayer times");
        }

        let report = self.observers.notify(self);
        if self.debug_enabled && !self.observers.is_empty() {
            log_debug!(
                "Notified {} observers ({} failed)",
                report.delivered + report.failed,
                report.failed
            );
        }

        self.wake_timer();
        RefreshOutcome::Updated
    }

    fn record_failure(&self, error: PrayerError, config: &Configuration) -> RefreshOutcome {
        let kind = error.kind();
        let retry = RetryPolicy::from_settings(&config.refresh);

        let (attempt, delay) = {
            let mut state = self.write_state();
            if self.is_shut_down() {
                return RefreshOutcome::Discarded;
            }
            let attempt = state.consecutive_failures.saturating_add(1);
            state.consecutive_failures = attempt;
            state.last_error = Some(kind);

            let delay = kind.is_transient().then(|| retry.delay(attempt));
            state.next_refresh = delay.and_then(|delay| {
                chrono::Duration::from_std(delay)
                    .ok()
                    .map(|delay| self.time_source.now() + delay)
            });
            state.phase = if state.snapshot.is_some() {
                Phase::Stale
            } else {
                Phase::Uninitialized
            };
            (attempt, delay)
        };

        log_pipe!();
        match delay.and_then(|delay| chrono::Duration::from_std(delay).ok()) {
            Some(delay) => {
                log_warning!("Failed to refresh prayer times: {error}");
                log_indented!("Retry {attempt} in {}", format_duration(delay));
            }
            None => {
                log_critical!("Failed to refresh prayer times: {error}");
                log_indented!("Not retrying until the configuration changes");
            }
        }

        if catch_unwind(AssertUnwindSafe(|| self.listener.on_refresh_failed(kind, attempt))).is_err()
        {
            log_warning!("Host listener panicked while handling a refresh failure");
        }

        RefreshOutcome::Failed(kind)
    }

    /// Refresh if the scheduled refresh time has passed.
    ///
    /// Returns `None` when nothing was due.
    pub fn refresh_if_due(&self) -> Option<RefreshOutcome> {
        match self.time_until_next_refresh() {
            Some(wait) if wait.is_zero() => Some(self.refresh()),
            _ => None,
        }
    }

    /// Time left until the scheduled refresh, zero if overdue, `None` if no
    /// refresh is scheduled.
    pub fn time_until_next_refresh(&self) -> Option<Duration> {
        let next = self.read_state().next_refresh?;
        Some((next - self.time_source.now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Last published snapshot. Never blocks on or triggers a refresh.
    pub fn get_current_snapshot(&self) -> Option<Arc<PrayerTimesSnapshot>> {
        self.read_state().snapshot.clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        let calculator = self
            .installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|installed| installed.adapter.calculator_name());
        let state = self.read_state();
        CoordinatorStatus {
            phase: state.phase,
            snapshot: state.snapshot.clone(),
            last_updated: state.last_updated,
            next_refresh: state.next_refresh,
            consecutive_failures: state.consecutive_failures,
            last_error: state.last_error,
            calculator,
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> ObserverId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Spawn the refresh timer thread. Calling it again is a no-op.
    ///
    /// The timer holds only a weak reference, so dropping the last `Arc`
    /// also ends it.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() || self.is_shut_down() {
            return Ok(());
        }

        let (sender, receiver) = mpsc::channel();
        let weak = Arc::downgrade(self);
        thread::Builder::new()
            .name("prayertimes-timer".to_string())
            .spawn(move || timer_loop(weak, receiver))
            .context("Failed to spawn refresh timer thread")?;

        *timer = Some(sender);
        Ok(())
    }

    /// Ask the timer for an immediate refresh, or refresh inline when no
    /// timer is running.
    pub fn request_refresh(&self) {
        let sent = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|sender| sender.send(TimerMessage::RefreshNow).is_ok());
        if !sent {
            self.refresh();
        }
    }

    /// Stop the timer, discard any in-flight result and suppress further
    /// notifications. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut state = self.write_state();
            state.phase = Phase::ShutDown;
            state.next_refresh = None;
        }

        if let Some(sender) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = sender.send(TimerMessage::Stop);
        }

        if self.debug_enabled {
            log_debug!("Coordinator shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn wake_timer(&self) {
        if let Some(sender) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = sender.send(TimerMessage::Wake);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CoordinatorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CoordinatorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotSource for Coordinator {
    fn get_current_snapshot(&self) -> Option<Arc<PrayerTimesSnapshot>> {
        Coordinator::get_current_snapshot(self)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(sender) = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = sender.send(TimerMessage::Stop);
        }
    }
}

/// Clears the in-flight flag when a refresh returns by any path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run one calculation on a helper thread and wait at most the configured
/// timeout for it. A calculation that overruns is abandoned; its result is
/// dropped when it eventually arrives.
fn run_calculation(
    adapter: CalculatorAdapter,
    config: Arc<Configuration>,
    date: NaiveDate,
) -> Result<PrayerTimesSnapshot, PrayerError> {
    let timeout = config.refresh.calculator_timeout;
    let name = adapter.calculator_name();
    let (sender, receiver) = mpsc::channel();

    thread::Builder::new()
        .name("prayertimes-calc".to_string())
        .spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| adapter.calculate(date, &config)))
                .unwrap_or_else(|_| Err(PrayerError::unavailable("calculator panicked")));
            let _ = sender.send(result);
        })
        .map_err(|e| PrayerError::unavailable(format!("failed to start calculation: {e}")))?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(PrayerError::unavailable(format!(
            "{name} calculator did not answer within {}s",
            timeout.as_secs()
        ))),
        Err(RecvTimeoutError::Disconnected) => Err(PrayerError::unavailable(format!(
            "{name} calculator stopped without a result"
        ))),
    }
}

/// Body of the refresh timer thread.
///
/// Sleeps until the next scheduled refresh in slices of at most
/// `TIMER_SLICE_SECS`, so a clock jump after suspend is noticed within one
/// slice. Messages wake it early.
fn timer_loop(coordinator: Weak<Coordinator>, receiver: mpsc::Receiver<TimerMessage>) {
    let slice = Duration::from_secs(TIMER_SLICE_SECS);

    loop {
        let wait = {
            let Some(coordinator) = coordinator.upgrade() else {
                break;
            };
            if coordinator.is_shut_down() {
                break;
            }

            match coordinator.refresh_if_due() {
                Some(RefreshOutcome::Coalesced) => COALESCED_RETRY_DELAY,
                Some(_) => continue,
                None => coordinator
                    .time_until_next_refresh()
                    .map_or(slice, |wait| wait.min(slice)),
            }
        };

        match receiver.recv_timeout(wait) {
            Ok(TimerMessage::Wake) | Err(RecvTimeoutError::Timeout) => {}
            Ok(TimerMessage::RefreshNow) => {
                if let Some(coordinator) = coordinator.upgrade() {
                    coordinator.refresh();
                }
            }
            Ok(TimerMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
