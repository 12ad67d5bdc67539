//! Unix signal handling for the daemon.
//!
//! A dedicated thread turns incoming signals into [`SignalMessage`]s on the
//! same channel the config watcher uses, so the main loop has one place to
//! wait on.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

/// Unified message type for everything that wakes the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// Re-read the configuration file (SIGUSR2 or file change)
    Reload,
    /// Recompute prayer times now (SIGUSR1)
    Refresh,
    /// Stop the daemon (SIGTERM, SIGINT, SIGHUP)
    Shutdown,
}

/// Signal handling state shared between threads
pub struct SignalState {
    /// Cleared once a shutdown signal arrives
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    /// Cloned into the config watcher
    pub signal_sender: Sender<SignalMessage>,
}

/// Map a raw signal number to the message it produces.
pub fn message_for_signal(signal: i32) -> Option<SignalMessage> {
    match signal {
        SIGUSR1 => Some(SignalMessage::Refresh),
        SIGUSR2 => Some(SignalMessage::Reload),
        SIGINT | SIGTERM | SIGHUP => Some(SignalMessage::Shutdown),
        _ => None,
    }
}

/// Register handlers and spawn the signal thread.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = std::sync::mpsc::channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running_clone = running.clone();
    let signal_sender_clone = signal_sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            let Some(message) = message_for_signal(sig) else {
                continue;
            };

            match message {
                SignalMessage::Shutdown => {
                    log_pipe!();
                    match sig {
                        SIGINT if debug_enabled => {
                            log_info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...")
                        }
                        SIGINT => log_info!("Received interrupt signal, initiating graceful shutdown..."),
                        SIGHUP => log_info!("Received hangup signal, initiating graceful shutdown..."),
                        _ => log_info!("Received termination request, initiating graceful shutdown..."),
                    }

                    if let Err(e) = signal_sender_clone.send(SignalMessage::Shutdown) {
                        log_warning!("Failed to send shutdown message: {e}");
                    }
                    running_clone.store(false, Ordering::SeqCst);
                    break;
                }
                SignalMessage::Refresh | SignalMessage::Reload => {
                    if debug_enabled {
                        log_pipe!();
                        log_debug!("Received signal {sig} ({message:?})");
                    }
                    if signal_sender_clone.send(message).is_err() {
                        // Main loop has exited
                        break;
                    }
                }
            }
        }
    });

    Ok(SignalState {
        running,
        signal_receiver,
        signal_sender,
    })
}
