//! Foreground daemon that keeps prayer times current.
//!
//! Owns the lifecycle of a run:
//! - Optional file logging
//! - Configuration loading
//! - Coordinator creation, sensors and the refresh timer
//! - Signal handler and config watcher setup
//! - The main loop reacting to refresh, reload and shutdown requests
//!
//! ```no_run
//! use prayertimes::Daemon;
//!
//! # fn main() -> anyhow::Result<()> {
//! Daemon::new(false).with_log_file(Some("/tmp/prayertimes.log".into())).run()?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use crate::common::constants::TIMER_SLICE_SECS;
use crate::common::utils::{format_duration, private_path};
use crate::config;
use crate::coordinator::{Coordinator, LoggingListener, PrayerTimeSensor};
use crate::io::signals::{SignalMessage, SignalState, setup_signal_handler};
use crate::logger::Log;
use crate::time_source::{RealTimeSource, TimeSource};

/// Builder for running the daemon.
pub struct Daemon {
    debug_enabled: bool,
    log_file: Option<String>,
    show_headers: bool,
}

impl Daemon {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            log_file: None,
            show_headers: true,
        }
    }

    /// Mirror all output to `path`.
    pub fn with_log_file(mut self, path: Option<String>) -> Self {
        self.log_file = path;
        self
    }

    /// Skip the version header.
    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Run until a shutdown signal arrives.
    pub fn run(self) -> Result<()> {
        let _log_guard = match &self.log_file {
            Some(path) => Some(
                Log::start_file_logging(path.clone())
                    .with_context(|| format!("Failed to start logging to {path}"))?,
            ),
            None => None,
        };
        Log::set_timestamps(true);

        if self.show_headers {
            log_version!();
        }

        let config_path = config::get_config_path()?;
        let config = match config::load() {
            Ok(config) => config,
            Err(e) => {
                log_error_exit!("Configuration failed");
                return Err(e);
            }
        };

        log_block_start!("Loaded configuration from {}", private_path(&config_path));
        config.log_config();

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        if let Err(e) = config::start_config_watcher(
            config_path.clone(),
            signal_state.signal_sender.clone(),
            self.debug_enabled,
        ) {
            log_pipe!();
            log_warning!("Config file watching unavailable: {e}");
            log_indented!("Hot config reload disabled, use SIGUSR2 for manual reload");
        }

        let coordinator = Arc::new(
            Coordinator::new(
                Arc::new(RealTimeSource),
                Arc::new(LoggingListener::new(self.debug_enabled)),
            )
            .with_debug(self.debug_enabled),
        );

        let sensors = PrayerTimeSensor::all();
        for sensor in &sensors {
            coordinator.subscribe(sensor.clone());
        }

        coordinator
            .configure(config)
            .context("Failed to install configuration")?;
        coordinator.start()?;
        log_decorated!("Refresh timer started");

        let result = self.main_loop(&coordinator, &sensors, &signal_state, &config_path);

        coordinator.shutdown();
        log_block_start!("Stopped");
        log_end!();
        result
    }

    fn main_loop(
        &self,
        coordinator: &Arc<Coordinator>,
        sensors: &[Arc<PrayerTimeSensor>],
        signal_state: &SignalState,
        config_path: &Path,
    ) -> Result<()> {
        while signal_state.running.load(Ordering::SeqCst) {
            match signal_state
                .signal_receiver
                .recv_timeout(Duration::from_secs(TIMER_SLICE_SECS))
            {
                Ok(SignalMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(SignalMessage::Refresh) => {
                    log_block_start!("Refresh requested");
                    coordinator.request_refresh();
                }
                Ok(SignalMessage::Reload) => {
                    reload_configuration(coordinator, config_path);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.debug_enabled {
                        log_sensor_summary(coordinator, sensors);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Re-read the configuration file and install it. A file that fails to load
/// or validate leaves the running configuration in place.
fn reload_configuration(coordinator: &Coordinator, config_path: &Path) {
    log_block_start!("Reloading configuration");

    let new_config = match config::load_from_path(config_path) {
        Ok(config) => config,
        Err(e) => {
            log_warning!("Failed to reload configuration: {e:#}");
            log_indented!("Keeping the previous configuration");
            return;
        }
    };

    if coordinator.configuration().as_deref() == Some(&new_config) {
        log_indented!("Configuration unchanged");
        return;
    }

    new_config.log_config();
    if let Err(e) = coordinator.configure(new_config) {
        log_warning!("Rejected new configuration: {e}");
        log_indented!("Keeping the previous configuration");
    }
}

fn log_sensor_summary(coordinator: &Coordinator, sensors: &[Arc<PrayerTimeSensor>]) {
    let status = coordinator.status();
    log_debug!(
        "Status: {}, failures: {}, next refresh in {}",
        status.phase,
        status.consecutive_failures,
        coordinator
            .time_until_next_refresh()
            .and_then(|wait| chrono::Duration::from_std(wait).ok())
            .map_or_else(|| "never".to_string(), format_duration)
    );

    let Some(config) = coordinator.configuration() else {
        return;
    };
    let now = RealTimeSource.now_in(config.timezone);
    if let Some(next) = sensors
        .iter()
        .filter(|sensor| sensor.prayer().is_prayer())
        .filter_map(|sensor| sensor.native_value().map(|time| (sensor.prayer(), time)))
        .filter(|(_, time)| *time > now)
        .min_by_key(|(_, time)| *time)
    {
        log_indented!(
            "Next: {} at {} (in {})",
            next.0,
            next.1.format("%H:%M"),
            format_duration(next.1 - now)
        );
    }
}
