//! Hosts file watcher for hot reload.
//!
//! The watcher only produces reload requests; loading and validation
//! happen on the single reload consumer.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A request to re-read the hosts file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub path: PathBuf,
}

/// A watcher that monitors the hosts file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ReloadRequest>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for reload requests.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ReloadRequest>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread.
    ///
    /// The parent directory is watched so that deleting and re-creating the
    /// file keeps producing events. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let file_name = self.path.file_name().map(OsString::from);
        let directory = watch_root(&self.path);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_relevant(&event.kind) && touches(&event, file_name.as_deref()) {
                        tracing::debug!(path = ?path, kind = ?event.kind, "Hosts file change detected");
                        let _ = tx.send(ReloadRequest { path: path.clone() });
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Hosts file watcher started");
        Ok(watcher)
    }
}

fn watch_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    kind.is_create() || kind.is_modify() || kind.is_remove()
}

fn touches(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name))
}
