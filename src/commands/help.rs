//! Help command implementation for prayertimes.

use anyhow::Result;

/// Show brief usage for a command (used for error messages)
pub fn show_command_usage(command: &str) {
    match command {
        "show" | "s" => log_block_start!("Usage: prayertimes show [--date YYYY-MM-DD] [--json]"),
        "next" | "n" => log_block_start!("Usage: prayertimes next"),
        "help" | "h" => log_block_start!("Usage: prayertimes help [COMMAND]"),
        _ => log_block_start!("Usage: prayertimes [OPTIONS] [COMMAND]"),
    }
}

/// Run the help command (dispatcher)
pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => display_general_help(),
        Some("show") | Some("s") => super::show::display_help(),
        Some("next") | Some("n") => super::next::display_help(),
        Some("help") | Some("h") => display_help_help(),
        Some(unknown) => {
            log_warning!("Unknown command: {unknown}");
            display_general_help();
        }
    }
    Ok(())
}

/// Display general help focused on commands
fn display_general_help() {
    log_version!();
    log_block_start!("Available Commands:");
    log_indented!("help, h [COMMAND]   Show detailed help for a command");
    log_indented!("next, n             Show the next prayer and the time remaining");
    log_indented!("show, s             Print all prayer times for a day");
    log_pipe!();
    log_info!("Use 'prayertimes help <command>' to see detailed help for a specific command.");
    log_indented!("Use 'prayertimes --help' to see all options and general usage.");
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: prayertimes help [COMMAND]");
    log_block_start!("Arguments:");
    log_indented!("COMMAND  Optional command to get help for");
    log_indented!("         If omitted, shows general help");
    log_end!();
}
