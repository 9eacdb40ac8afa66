//! Watch source backed by `notify` with debouncing.
//!
//! Editors tend to produce bursts of events for a single save (truncate,
//! write, chmod). The debouncer coalesces those into one event per file. The
//! debounced event carries no kind, so removal is detected by checking whether
//! the path still exists.
//!
//! The watch is placed on the file's parent directory and events are filtered
//! by file name. A watch on the file itself follows its inode, which is gone
//! after an atomic save (write a temp file, rename it over the original).

use super::{EventSender, WatchEvent, WatchHandle, WatchSource};
use crate::error::WatchError;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, DebouncedEvent, DebouncedEventKind, Debouncer, new_debouncer};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Production [`WatchSource`] built on the platform's recommended watcher.
#[derive(Debug, Clone)]
pub struct NotifySource {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for NotifySource {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

impl NotifySource {
    pub fn new(debounce_duration: Duration) -> Self {
        Self { debounce_duration }
    }
}

struct NotifyHandle {
    debouncer: Debouncer<RecommendedWatcher>,
    dir: PathBuf,
}

impl WatchHandle for NotifyHandle {
    fn close(mut self: Box<Self>) {
        if let Err(e) = self.debouncer.watcher().unwatch(&self.dir) {
            debug!("Unwatch of {} failed: {}", self.dir.display(), e);
        }
        // Dropping the debouncer stops its event thread.
    }
}

impl WatchSource for NotifySource {
    fn acquire(&self, path: &Path, events: EventSender) -> Result<Box<dyn WatchHandle>, WatchError> {
        if !path.is_file() {
            return Err(WatchError::acquisition(path, "no such file or directory"));
        }
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| WatchError::acquisition(path, "path has no file name"))?;
        let dir = watch_dir(path);

        let watched = path.to_path_buf();
        let mut debouncer = new_debouncer(self.debounce_duration, move |result: DebounceEventResult| {
            for event in classify(result, &watched, &file_name) {
                // Receiver gone means the supervisor moved on; nothing to do.
                let _ = events.send(event);
            }
        })
        .map_err(|e| WatchError::acquisition(path, e))?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::acquisition(path, e))?;

        debug!("Watching level file {} in {}", path.display(), dir.display());
        Ok(Box::new(NotifyHandle { debouncer, dir }))
    }
}

/// Directory holding `path`; a bare file name lives in the working directory.
fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Turn a debounced batch into supervisor events.
///
/// Events for other entries of the watched directory are dropped.
fn classify(result: DebounceEventResult, watched: &Path, file_name: &OsString) -> Vec<WatchEvent> {
    match result {
        Ok(events) => events
            .into_iter()
            .filter(|event| is_watched_file(event, file_name))
            .map(|event| match event.kind {
                DebouncedEventKind::Any => classify_path(watched, watched.exists()),
                other => WatchEvent::Unknown(format!("{:?}", other)),
            })
            .collect(),
        Err(e) => vec![WatchEvent::Error(e.to_string())],
    }
}

fn is_watched_file(event: &DebouncedEvent, file_name: &OsString) -> bool {
    event.path.file_name() == Some(file_name.as_os_str())
}

fn classify_path(path: &Path, still_exists: bool) -> WatchEvent {
    if still_exists {
        WatchEvent::Update(path.to_path_buf())
    } else {
        WatchEvent::Remove(path.to_path_buf())
    }
}
