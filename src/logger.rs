//! Structured logging with box-drawing output.
//!
//! Everything the daemon and the one-shot commands print goes through the
//! macros defined here. Output is grouped into visual blocks:
//!
//! ```text
//! ┏ prayertimes v0.3.0 ━━╸
//! ┃
//! ┣ Prayer times updated for 2024-03-10
//! ┃   Fajr     05:12
//! ┃   Sunrise  06:31
//! ╹
//! ```
//!
//! Logging can be switched off at runtime (tests use this to keep output
//! quiet), prefixed with a wall-clock timestamp (the daemon turns this on) and
//! redirected to a file through a dedicated writer thread.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

static TIMESTAMPS_ENABLED: AtomicBool = AtomicBool::new(false);

// Channel for routing output to file when --log is active
static LOG_CHANNEL: OnceLock<Option<Sender<LogMessage>>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Main logging interface providing structured output formatting.
///
/// ## Logging Conventions
///
/// - **`log_block_start!`** opens a new conceptual block (a refresh result, a
///   configuration load, a shutdown). It prints an empty pipe `┃` for spacing
///   and then `┣ message`.
/// - **`log_decorated!`** continues a block or prints a single-line status.
/// - **`log_indented!`** prints nested details: `┃   message`.
/// - **`log_pipe!`** inserts a single `┃` line; use it before a level macro
///   that starts its own block.
/// - **`log_version!`** prints the startup header, **`log_end!`** the final `╹`.
/// - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`,
///   `log_critical!`** carry a `[LEVEL]` tag for semantic messages.
pub struct Log;

impl Log {
    /// Enable or disable logging.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Prefix every line with the local wall-clock time.
    ///
    /// Long-running daemon output is hard to follow without it; one-shot
    /// commands leave it off.
    pub fn set_timestamps(enabled: bool) {
        TIMESTAMPS_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Start file logging to the specified path.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(Some(tx.clone()))
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => {
                        file.write_all(text.as_bytes())?;
                    }
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix for the current line, or an empty string.
    /// Public for macro access.
    pub fn get_timestamp_prefix() -> String {
        if TIMESTAMPS_ENABLED.load(Ordering::SeqCst) {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Guard for file logging that flushes and joins the writer thread on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// Helper function to strip ANSI color codes from text
fn strip_ansi_codes(text: &str) -> String {
    // Regex pattern for ANSI escape sequences
    // Matches: ESC [ ... m where ... is any sequence of digits and semicolons
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            // Check if this is the start of an ANSI sequence
            if chars.peek() == Some(&'[') {
                chars.next(); // consume '['
                // Skip until we find 'm'
                for ch in chars.by_ref() {
                    if ch == 'm' {
                        break;
                    }
                }
            } else {
                result.push(ch);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

// Public function that routes output (needed by macros)
pub fn write_output(text: &str) {
    if let Some(Some(tx)) = LOG_CHANNEL.get() {
        // Send to file logger thread - strip ANSI codes for clean file output
        let clean_text = strip_ansi_codes(text);
        let _ = tx.send(LogMessage::Formatted(clean_text));
    } else {
        // Normal output with colors
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros

/// Shared expansion for every line-oriented macro below.
///
/// `$before` is printed (with the timestamp prefix) on its own line first when
/// non-empty, `$lead` is the decoration placed in front of the message.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($before:expr, $lead:expr, $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let message = format!($($arg)*);
            let before: &str = $before;
            let formatted = if before.is_empty() {
                format!("{prefix}{}{message}\n", $lead)
            } else {
                format!("{prefix}{before}\n{prefix}{}{message}\n", $lead)
            };
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log a decorated message, typically as part of an existing block.
#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => { $crate::__log_line!("", "┣ ", $fmt $($arg)*) };
    ($expr:expr) => { $crate::__log_line!("", "┣ ", "{}", $expr) };
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => { $crate::__log_line!("", "┃   ", $fmt $($arg)*) };
    ($expr:expr) => { $crate::__log_line!("", "┃   ", "{}", $expr) };
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => { $crate::__log_line!("", "┃", "") };
}

/// Start a new conceptual block of information.
#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => { $crate::__log_line!("┃", "┣ ", $fmt $($arg)*) };
    ($expr:expr) => { $crate::__log_line!("┃", "┣ ", "{}", $expr) };
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::__log_line!("", "┏ ", "prayertimes v{} ━━╸", env!("CARGO_PKG_VERSION"))
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => { $crate::__log_line!("", "╹", "") };
}

/// Log a warning with a yellow `[WARNING]` tag.
#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!("", "┣[\x1b[33mWARNING\x1b[0m] ", $fmt $($arg)*)
    };
    ($expr:expr) => { $crate::__log_line!("", "┣[\x1b[33mWARNING\x1b[0m] ", "{}", $expr) };
}

/// Log an error with a red `[ERROR]` tag.
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!("", "┣[\x1b[31mERROR\x1b[0m] ", $fmt $($arg)*)
    };
    ($expr:expr) => { $crate::__log_line!("", "┣[\x1b[31mERROR\x1b[0m] ", "{}", $expr) };
}

/// Log an error that terminates the current flow, closing the block with `┗`.
#[macro_export]
macro_rules! log_error_exit {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!("┃", "┗[\x1b[31mERROR\x1b[0m] ", $fmt $($arg)*)
    };
    ($expr:expr) => { $crate::__log_line!("┃", "┗[\x1b[31mERROR\x1b[0m] ", "{}", $expr) };
}

/// Log an informational message with a green `[INFO]` tag.
#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!("", "┣[\x1b[32mINFO\x1b[0m] ", $fmt $($arg)*)
    };
    ($expr:expr) => { $crate::__log_line!("", "┣[\x1b[32mINFO\x1b[0m] ", "{}", $expr) };
}

/// Log a debug message with a green `[DEBUG]` tag.
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!("", "┣[\x1b[32mDEBUG\x1b[0m] ", $fmt $($arg)*)
    };
    ($expr:expr) => { $crate::__log_line!("", "┣[\x1b[32mDEBUG\x1b[0m] ", "{}", $expr) };
}

/// Log a critical message with a red `[CRITICAL]` tag.
#[macro_export]
macro_rules! log_critical {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!("", "┣[\x1b[31mCRITICAL\x1b[0m] ", $fmt $($arg)*)
    };
    ($expr:expr) => { $crate::__log_line!("", "┣[\x1b[31mCRITICAL\x1b[0m] ", "{}", $expr) };
}
