//! File watching for hot config reloading.
//!
//! Watches the directory holding the configuration file and sends
//! [`SignalMessage::Reload`] to the main loop when the file changes.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::common::constants::CONFIG_WATCH_DEBOUNCE_MS;
use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Configuration file watcher that triggers reloads.
pub struct ConfigWatcher {
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
    config_path: PathBuf,
}

impl ConfigWatcher {
    pub fn new(config_path: PathBuf, signal_sender: Sender<SignalMessage>, debug_enabled: bool) -> Self {
        Self {
            signal_sender,
            debug_enabled,
            config_path,
        }
    }

    /// Spawn the watcher thread.
    ///
    /// The parent directory is watched rather than the file itself, since
    /// editors commonly save by replacing the file.
    pub fn start(self) -> Result<()> {
        let Some(config_dir) = self.config_path.parent().map(Path::to_path_buf) else {
            return Ok(());
        };
        if !config_dir.is_dir() {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("No configuration directory to watch for hot reload");
            }
            return Ok(());
        }

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Starting config file watcher for hot reload:");
            log_indented!("Watching: {}", private_path(&self.config_path));
        }

        let (tx, rx) = std::sync::mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    )
                {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(&config_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", private_path(&config_dir)))?;

        let ConfigWatcher {
            signal_sender,
            debug_enabled,
            config_path,
        } = self;

        thread::spawn(move || {
            // The watcher stops when dropped
            let _watcher = watcher;
            let quiet = Duration::from_millis(CONFIG_WATCH_DEBOUNCE_MS);

            debounce_events(&rx, &config_path, quiet, || {
                if debug_enabled {
                    log_pipe!();
                    log_info!("Configuration file change detected");
                }
                // Fails once the main loop is gone
                signal_sender.send(SignalMessage::Reload).is_ok()
            });
        });

        Ok(())
    }
}

/// Call `reload` once a burst of config file events has been quiet for
/// `quiet`, so editors that truncate and then write trigger one reload of the
/// final content. Returns when the event channel closes or `reload` returns
/// false.
fn debounce_events(
    events: &Receiver<Event>,
    config_path: &Path,
    quiet: Duration,
    mut reload: impl FnMut() -> bool,
) {
    let touches_config =
        |event: &Event| event.paths.iter().any(|p| is_config_event(p, config_path));

    loop {
        match events.recv() {
            Ok(event) if touches_config(&event) => {}
            Ok(_) => continue,
            Err(_) => return,
        }

        let mut settle_at = Instant::now() + quiet;
        loop {
            match events.recv_timeout(settle_at.saturating_duration_since(Instant::now())) {
                Ok(event) if touches_config(&event) => settle_at = Instant::now() + quiet,
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    reload();
                    return;
                }
            }
        }

        if !reload() {
            return;
        }
    }
}

/// Whether an event path refers to the config file, including the temporary
/// files editors write next to it before renaming.
fn is_config_event(event_path: &Path, config_path: &Path) -> bool {
    if event_path == config_path {
        return true;
    }
    if event_path.parent() != config_path.parent() {
        return false;
    }

    match (
        event_path.file_name().and_then(|n| n.to_str()),
        config_path.file_name().and_then(|n| n.to_str()),
    ) {
        (Some(event_name), Some(config_name)) => {
            event_name.starts_with(config_name) || event_name.starts_with(&format!(".{config_name}"))
        }
        _ => false,
    }
}

/// Start the configuration file watcher.
pub fn start_config_watcher(
    config_path: PathBuf,
    signal_sender: Sender<SignalMessage>,
    debug_enabled: bool,
) -> Result<()> {
    ConfigWatcher::new(config_path, signal_sender, debug_enabled).start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::ModifyKind;
    use std::sync::mpsc::channel;

    const CONFIG: &str = "/home/u/.config/prayertimes/prayertimes.toml";

    fn modified(path: &str) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_burst_of_events_reloads_once() {
        let (tx, rx) = channel();
        // Truncate, write, metadata: one save
        for _ in 0..3 {
            tx.send(modified(CONFIG)).unwrap();
        }
        drop(tx);

        let mut reloads = 0;
        debounce_events(&rx, Path::new(CONFIG), Duration::from_millis(50), || {
            reloads += 1;
            true
        });
        assert_eq!(reloads, 1);
    }

    #[test]
    fn test_separate_saves_reload_separately() {
        let (tx, rx) = channel();
        let sender = thread::spawn(move || {
            tx.send(modified(CONFIG)).unwrap();
            thread::sleep(Duration::from_millis(300));
            tx.send(modified(CONFIG)).unwrap();
        });

        let mut reloads = 0;
        debounce_events(&rx, Path::new(CONFIG), Duration::from_millis(50), || {
            reloads += 1;
            true
        });
        sender.join().unwrap();
        assert_eq!(reloads, 2);
    }

    #[test]
    fn test_unrelated_files_do_not_reload() {
        let (tx, rx) = channel();
        tx.send(modified("/home/u/.config/prayertimes/notes.txt")).unwrap();
        drop(tx);

        let mut reloads = 0;
        debounce_events(&rx, Path::new(CONFIG), Duration::from_millis(50), || {
            reloads += 1;
            true
        });
        assert_eq!(reloads, 0);
    }

    #[test]
    fn test_stops_when_reload_target_is_gone() {
        let (tx, rx) = channel();
        let sender = thread::spawn(move || {
            for _ in 0..3 {
                let _ = tx.send(modified(CONFIG));
                thread::sleep(Duration::from_millis(200));
            }
        });

        let mut reloads = 0;
        debounce_events(&rx, Path::new(CONFIG), Duration::from_millis(50), || {
            reloads += 1;
            false
        });
        assert_eq!(reloads, 1);
        sender.join().unwrap();
    }

    #[test]
    fn test_config_event_matching() {
        let config = Path::new("/home/u/.config/prayertimes/prayertimes.toml");
        assert!(is_config_event(config, config));
        assert!(is_config_event(
            Path::new("/home/u/.config/prayertimes/prayertimes.toml~"),
            config
        ));
        assert!(is_config_event(
            Path::new("/home/u/.config/prayertimes/.prayertimes.toml.swp"),
            config
        ));
        assert!(!is_config_event(
            Path::new("/home/u/.config/prayertimes/notes.txt"),
            config
        ));
        assert!(!is_config_event(
            Path::new("/tmp/prayertimes.toml"),
            config
        ));
    }
}
