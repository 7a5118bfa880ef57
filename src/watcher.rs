//! OS filesystem change notifications, mapped to a small
//! `{path, event_kind, timestamp}` shape and forwarded to a callback on a
//! dedicated thread. Debouncing is the consumer's responsibility; this
//! module only classifies and forwards raw OS events.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tracing::{debug, warn};

use crate::errors::{LinageError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
    pub timestamp: DateTime<Utc>,
}

/// Wraps `notify`'s watcher, translating its events and forwarding them to a
/// user callback on a background thread. Stop is idempotent.
pub struct Watcher {
    _inner: RecommendedWatcher,
    handle: Mutex<Option<JoinHandle<()>>>,
    stop_tx: mpsc::Sender<()>,
}

impl Watcher {
    pub fn start(
        root: PathBuf,
        recursive: bool,
        mut on_event: impl FnMut(WatchEvent) + Send + 'static,
    ) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>();
        let mut inner = RecommendedWatcher::new(event_tx, Config::default())
            .map_err(|e| LinageError::IoError(std::io::Error::other(e.to_string())))?;

        let mode = if recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        inner
            .watch(&root, mode)
            .map_err(|e| LinageError::IoError(std::io::Error::other(e.to_string())))?;

        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = std::thread::spawn(move || {
            loop {
                if stop_rx.try_recv().is_ok() {
                    break;
                }
                match event_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(Ok(event)) => {
                        for watch_event in classify(event) {
                            debug!(path = %watch_event.path.display(), kind = ?watch_event.kind, "watcher event");
                            on_event(watch_event);
                        }
                    }
                    Ok(Err(e)) => warn!(error = %e, "watcher error"),
                    Err(mpsc::RecvTimeoutError::Timeout) => continue,
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Ok(Self { _inner: inner, handle: Mutex::new(Some(handle)), stop_tx })
    }

    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn classify(event: Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => WatchEventKind::Renamed,
        EventKind::Modify(_) => WatchEventKind::Modified,
        EventKind::Remove(_) => WatchEventKind::Deleted,
        _ => return Vec::new(),
    };
    let timestamp = Utc::now();
    event.paths.into_iter().map(|path| WatchEvent { path, kind, timestamp }).collect()
}

/// A shareable handle, for embedders that want `Arc<Watcher>` across threads.
pub type SharedWatcher = Arc<Watcher>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;
    use std::time::Duration as StdDuration;

    #[test]
    fn watcher_reports_created_and_modified_events() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = channel::<WatchEvent>();

        let watcher = Watcher::start(dir.path().to_path_buf(), true, move |event| {
            let _ = tx.send(event);
        })
        .unwrap();

        std::fs::write(dir.path().join("new.txt"), "hi").unwrap();

        let mut saw_event = false;
        for _ in 0..20 {
            if rx.recv_timeout(StdDuration::from_millis(200)).is_ok() {
                saw_event = true;
                break;
            }
        }
        watcher.stop();
        assert!(saw_event, "expected at least one watch event for file creation");
    }
}
