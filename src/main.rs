//! Main application entry point.
//!
//! Parses the command line and dispatches to the daemon or a one-shot
//! command. Everything else lives in the library.

use anyhow::Result;

use prayertimes::args::{self, CliAction, ParsedArgs};
use prayertimes::commands;
use prayertimes::common::constants::EXIT_FAILURE;
use prayertimes::config;
use prayertimes::logger::Log;
use prayertimes::{Daemon, log_end, log_error, log_pipe};

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    let config_dir = match &parsed_args.action {
        CliAction::Run { config_dir, .. }
        | CliAction::ShowCommand { config_dir, .. }
        | CliAction::NextCommand { config_dir, .. } => config_dir.clone(),
        _ => None,
    };
    config::set_config_dir(config_dir)?;

    let result = match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::HelpCommand { command } => commands::help::run_help_command(command.as_deref()),
        CliAction::Run {
            debug_enabled,
            log_file,
            ..
        } => Daemon::new(debug_enabled).with_log_file(log_file).run(),
        CliAction::ShowCommand {
            debug_enabled,
            date,
            json,
            ..
        } => commands::show::run_show_command(date, json, debug_enabled),
        CliAction::NextCommand { debug_enabled, .. } => {
            commands::next::run_next_command(debug_enabled)
        }
    };

    if let Err(e) = result {
        if !Log::is_enabled() {
            // Logging is off for machine-readable output
            eprintln!("Error: {e:#}");
            std::process::exit(EXIT_FAILURE);
        }
        log_pipe!();
        log_error!("{e:#}");
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }
    Ok(())
}
