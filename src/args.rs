//! Command-line argument parsing and processing.
//!
//! Arguments are parsed by hand into a [`CliAction`]. Global flags may appear
//! anywhere on the command line; the first non-flag argument selects the
//! command. Without a command the daemon runs.

use chrono::NaiveDate;

use crate::time_source::parse_date;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon with these settings
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Compute one day and print all times
    ShowCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
        date: Option<NaiveDate>,
        json: bool,
    },
    /// Print the next prayer and the time remaining
    NextCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Help for one command, or the command overview
    HelpCommand { command: Option<String> },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

#[derive(Clone, Copy, PartialEq)]
enum Command {
    Show,
    Next,
    Help,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "show" | "s" => Some(Command::Show),
            "next" | "n" => Some(Command::Next),
            "help" | "h" => Some(Command::Help),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Show => "show",
            Command::Next => "next",
            Command::Help => "help",
        }
    }
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first item is the program name and is skipped. Version takes
    /// precedence over help, and help over everything else.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        if args_vec
            .iter()
            .any(|arg| arg == "--version" || arg == "-V" || arg == "-v")
        {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if args_vec.iter().any(|arg| arg == "--help" || arg == "-h") {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }

        let mut debug_enabled = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut date: Option<NaiveDate> = None;
        let mut json = false;
        let mut command: Option<Command> = None;
        let mut help_topic: Option<String> = None;
        let mut unknown_arg_found = false;

        let mut i = 0;
        while i < args_vec.len() {
            let arg = args_vec[i].as_str();
            match arg {
                "--debug" | "-d" => debug_enabled = true,
                "--config" | "-c" => match args_vec.get(i + 1) {
                    Some(dir) if !dir.starts_with('-') => {
                        config_dir = Some(dir.clone());
                        i += 1;
                    }
                    _ => {
                        log_warning!("Missing directory for {arg}. Usage: --config <dir>");
                        unknown_arg_found = true;
                    }
                },
                "--log" | "-l" => match args_vec.get(i + 1) {
                    Some(file) if !file.starts_with('-') => {
                        log_file = Some(file.clone());
                        i += 1;
                    }
                    _ => {
                        log_warning!("Missing file for {arg}. Usage: --log <file>");
                        unknown_arg_found = true;
                    }
                },
                "--date" => match args_vec.get(i + 1).map(|value| parse_date(value)) {
                    Some(Ok(parsed)) => {
                        date = Some(parsed);
                        i += 1;
                    }
                    Some(Err(e)) => {
                        log_error!("{e}");
                        unknown_arg_found = true;
                        i += 1;
                    }
                    None => {
                        log_warning!("Missing date for --date. Usage: --date YYYY-MM-DD");
                        unknown_arg_found = true;
                    }
                },
                "--json" | "-j" => json = true,
                _ if arg.starts_with('-') => {
                    log_warning!("Unknown option: {arg}");
                    unknown_arg_found = true;
                }
                _ => match (command, Command::from_arg(arg)) {
                    (None, Some(parsed)) => command = Some(parsed),
                    (None, None) => {
                        log_warning!("Unknown command: {arg}");
                        unknown_arg_found = true;
                    }
                    (Some(Command::Help), _) if help_topic.is_none() => {
                        help_topic = Some(arg.to_string());
                    }
                    (Some(current), Some(_)) => {
                        log_error!(
                            "Cannot use multiple commands at once: '{}' and '{}'",
                            current.name(),
                            arg
                        );
                        unknown_arg_found = true;
                    }
                    (Some(current), None) => {
                        log_warning!("Unexpected argument for {}: {arg}", current.name());
                        unknown_arg_found = true;
                    }
                },
            }
            i += 1;
        }

        // Options that only make sense for one command
        if (date.is_some() || json) && command != Some(Command::Show) {
            log_warning!("--date and --json are only valid with the show command");
            unknown_arg_found = true;
        }
        if log_file.is_some() && command.is_some() {
            log_warning!("--log is only valid when running the daemon");
            unknown_arg_found = true;
        }

        let action = if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else {
            match command {
                None => CliAction::Run {
                    debug_enabled,
                    config_dir,
                    log_file,
                },
                Some(Command::Show) => CliAction::ShowCommand {
                    debug_enabled,
                    config_dir,
                    date,
                    json,
                },
                Some(Command::Next) => CliAction::NextCommand {
                    debug_enabled,
                    config_dir,
                },
                Some(Command::Help) => CliAction::HelpCommand {
                    command: help_topic,
                },
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("prayertimes [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-l, --log <file>       Also write daemon output to a file");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("help, h [COMMAND]      Show detailed help for a command");
    log_indented!("next, n                Show the next prayer and the time remaining");
    log_indented!("show, s [--date D] [--json]  Print all prayer times for a day");
    log_block_start!("Without a command, prayertimes runs in the foreground, keeps");
    log_indented!("today's times current and reacts to signals:");
    log_indented!("SIGUSR1 refresh now, SIGUSR2 reload configuration");
    log_end!();
}
