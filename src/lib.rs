//! # prayertimes
//!
//! Computes the daily Islamic prayer times for one location and keeps them
//! current.
//!
//! ## Architecture
//!
//! - **Coordinator**: `coordinator` owns the cached snapshot for today,
//!   schedules refreshes (calendar rollover, the computed Midnight, retries
//!   with backoff) and notifies observers
//! - **Calculators**: `calc` with the offline solar calculator, the optional
//!   Aladhan API client and the validating adapter in front of both
//! - **Configuration**: `config` for TOML settings with defaults, validation
//!   and hot reload
//! - **Commands**: `commands` for the one-shot CLI commands (show, next, help)
//! - **Daemon**: `daemon` wires everything together for the foreground run
//! - **Infrastructure**: signal handling, logging and the injectable clock

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod calc;
pub mod commands;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod daemon;
pub mod error;
pub mod io;
pub mod prayer;
pub mod time_source;

pub use coordinator::{Coordinator, RefreshOutcome};
pub use daemon::Daemon;
pub use error::{ErrorKind, PrayerError};
pub use prayer::{Prayer, PrayerTimesSnapshot};
