// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Watch mode.
//!
//! Keeps re-running reconciliation whenever a markdown file below the main
//! tree changes. Bursts of events are coalesced by a short debounce window,
//! and passes always run one after another on the calling thread.

use crate::sync::SyncError;

use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use std::{
    path::{Component, Path, PathBuf},
    sync::mpsc::{channel, Receiver, RecvTimeoutError},
    time::Duration,
};
use tracing::{debug, info, instrument, warn};

/// Default quiet period before a burst of events triggers a pass.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Watcher of main tree documents.
#[derive(Debug, Clone)]
pub struct DocWatch {
    root: PathBuf,
    debounce: Duration,
}

impl DocWatch {
    /// Construct new watcher over tree at root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Watch tree, calling `on_change` once per burst of relevant events.
    ///
    /// Blocks until the process is interrupted or the event channel closes.
    ///
    /// # Errors
    ///
    /// - Return [`WatchError::Notify`] if the file system watcher fails.
    /// - Return [`WatchError::Sync`] if a pass fails fatally.
    #[instrument(skip(self, on_change), level = "debug")]
    pub fn run(&self, mut on_change: impl FnMut() -> Result<(), SyncError>) -> Result<()> {
        let (sender, receiver) = channel::<notify::Result<Event>>();
        let mut watcher = recommended_watcher(sender)?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!("watching {:?} for changes", self.root.display());

        while let Ok(event) = receiver.recv() {
            let event = match event {
                Ok(event) => event,
                Err(error) => {
                    warn!("watcher error: {error}");
                    continue;
                }
            };
            if !is_relevant(&event) {
                continue;
            }

            debug!("change detected on {:?}", event.paths);
            if !self.drain(&receiver) {
                break;
            }

            info!("re-running sync");
            on_change()?;
        }

        Ok(())
    }

    // Swallow events until the tree stays quiet for a whole debounce window.
    fn drain(&self, receiver: &Receiver<notify::Result<Event>>) -> bool {
        loop {
            match receiver.recv_timeout(self.debounce) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return true,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }
}

/// Check if event should trigger a pass.
///
/// Accesses never do. Anything else does if it touches a markdown path
/// outside of a `.git` directory.
pub fn is_relevant(event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }

    event.paths.iter().any(|path| is_watched_path(path))
}

fn is_watched_path(path: &Path) -> bool {
    crate::path::is_markdown(path)
        && !path
            .components()
            .any(|part| matches!(part, Component::Normal(name) if name == ".git"))
}

/// Watch mode error types.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// File system watcher fails.
    #[error(transparent)]
    Notify(#[from] notify::Error),

    /// Reconciliation pass fails.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Friendly result alias :3
pub type Result<T, E = WatchError> = std::result::Result<T, E>;
