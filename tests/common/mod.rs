//! Shared helpers for supervisor integration tests.

#![allow(dead_code)]

use level_watch::error::WatchError;
use level_watch::watch::{EventSender, WatchHandle};
use level_watch::{Level, LevelHandle, WatchEvent, WatchSource};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Script {
    fail: bool,
    require_existing: bool,
    sender: Option<EventSender>,
}

/// Watch source driven by the test instead of the filesystem.
///
/// Records acquisition attempts and handle closes; events are injected with
/// [`ScriptedSource::emit`] into the most recently acquired watch.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
    attempts: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// Source whose acquisitions always succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose acquisitions always fail.
    pub fn failing() -> Self {
        let source = Self::default();
        source.set_failing(true);
        source
    }

    /// Source that fails to acquire while the path does not exist, like a
    /// real watcher.
    pub fn mirroring_fs() -> Self {
        let source = Self::default();
        source.script.lock().unwrap().require_existing = true;
        source
    }

    pub fn set_failing(&self, fail: bool) {
        self.script.lock().unwrap().fail = fail;
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Deliver an event to the live watch. Returns false if there is none.
    pub fn emit(&self, event: WatchEvent) -> bool {
        let script = self.script.lock().unwrap();
        match &script.sender {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }
}

struct ScriptedHandle {
    closes: Arc<AtomicUsize>,
}

impl WatchHandle for ScriptedHandle {
    fn close(self: Box<Self>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl WatchSource for ScriptedSource {
    fn acquire(&self, path: &Path, events: EventSender) -> Result<Box<dyn WatchHandle>, WatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.fail {
            return Err(WatchError::acquisition(path, "ENOENT"));
        }
        if script.require_existing && !path.exists() {
            return Err(WatchError::acquisition(path, "no such file or directory"));
        }
        script.sender = Some(events);
        Ok(Box::new(ScriptedHandle {
            closes: Arc::clone(&self.closes),
        }))
    }
}

/// Poll `condition` in real time until it holds or five seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Let spawned tasks run without letting a paused clock move.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Level handle that counts how often its level was written.
pub struct CountingHandle {
    level: Mutex<Level>,
    writes: AtomicUsize,
}

impl CountingHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            level: Mutex::new(Level::Silent),
            writes: AtomicUsize::new(0),
        })
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl LevelHandle for CountingHandle {
    fn level(&self) -> Level {
        *self.level.lock().unwrap()
    }

    fn set_level(&self, level: Level) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.level.lock().unwrap() = level;
    }
}
