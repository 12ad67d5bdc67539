//! `show` command: print every prayer time for one day.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::coordinator::{HostListener, LoggingListener};
use crate::logger::Log;
use crate::time_source::{RealTimeSource, TimeSource};

/// Compute and print the times for `date`, today by default.
///
/// With `json` only the JSON document is written to stdout.
pub fn run_show_command(date: Option<NaiveDate>, json: bool, debug_enabled: bool) -> Result<()> {
    if json {
        // Keep stdout machine-readable
        Log::set_enabled(false);
    } else {
        log_version!();
    }

    let (config, adapter) = super::load_calculation_context()?;
    let date = date.unwrap_or_else(|| RealTimeSource.now_in(config.timezone).date_naive());

    if debug_enabled && !json {
        log_block_start!("Configuration:");
        config.log_config();
    }

    let snapshot = adapter
        .calculate(date, &config)
        .with_context(|| format!("Failed to calculate prayer times for {date}"))?;

    if json {
        let document = serde_json::to_string_pretty(&snapshot.to_json())
            .context("Failed to serialize prayer times")?;
        println!("{document}");
        return Ok(());
    }

    LoggingListener::new(debug_enabled).on_data_updated(&snapshot);
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("show - Print all prayer times for a day");
    log_block_start!("Usage: prayertimes show [OPTIONS]");
    log_block_start!("Options:");
    log_indented!("--date YYYY-MM-DD   Day to calculate (default: today)");
    log_indented!("-j, --json          Print a JSON document instead");
    log_block_start!("Examples:");
    log_indented!("prayertimes show");
    log_indented!("prayertimes show --date 2025-03-01 --json");
    log_end!();
}
