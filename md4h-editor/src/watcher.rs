//! File watching for external changes
//!
//! Watches the backing Markdown file and, after a debounce, hands back
//! the file's new content so the session can run it through inbound
//! classification. The editor's own saves come back through this path
//! too; echo suppression is what keeps them from reloading the document.

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use log::warn;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// File change event
#[derive(Debug, Clone)]
pub enum FileEvent {
    Changed,
}

/// Watches one document for external modification.
pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<FileEvent>,
    watched_path: PathBuf,
    last_event: Option<Instant>,
}

impl DocumentWatcher {
    /// Create a new watcher for the given path
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let watched_path = path.to_path_buf();
        let watched_path_clone = watched_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                // Only care about modification events
                if matches!(
                    event.kind,
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                ) {
                    if event.paths.iter().any(|p| p == &watched_path_clone) {
                        let _ = tx.send(FileEvent::Changed);
                    }
                }
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch file: {}", path.display()))?;

        // Also watch the parent directory (for editors that use atomic rename)
        if let Some(parent) = path.parent() {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .context("Failed to watch parent directory")?;
        }

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            watched_path,
            last_event: None,
        })
    }

    /// Drain pending events and, once the debounce period has elapsed,
    /// read and return the file's current content.
    pub fn poll_update(&mut self, debounce_ms: u64) -> Option<String> {
        while self.receiver.try_recv().is_ok() {
            self.last_event = Some(Instant::now());
        }

        let last = self.last_event?;
        if last.elapsed() < Duration::from_millis(debounce_ms) {
            return None;
        }
        self.last_event = None;

        match fs::read_to_string(&self.watched_path) {
            Ok(content) => Some(content),
            Err(err) => {
                warn!(
                    "failed to read changed file {}: {err}",
                    self.watched_path.display()
                );
                None
            }
        }
    }

    /// Check if there are pending events (not debounced yet)
    pub fn has_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// Get the watched file path
    pub fn path(&self) -> &Path {
        &self.watched_path
    }
}
