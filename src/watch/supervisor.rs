//! Watch supervisor: acquisition, reload and recovery.
//!
//! ```text
//!             acquire ok                      error / remove / reload failure
//! Unwatched ------------> Watching -------------------------------------+
//!     |  ^                  |  ^                                        |
//!     |  |                  |  | update: load -> compare -> apply_all   |
//!     |  |                  +--+                                        v
//!     |  +-------------- backoff elapsed ------------------------ RestartPending
//!     |                                                                 ^
//!     +------------------------- acquire failed ------------------------+
//! ```
//!
//! Every anomaly takes the same path: release the watch, wait a fixed
//! backoff, acquire again. The configuration held by the registry is never
//! touched on a failure path.

use super::{WatchEvent, WatchHandle, WatchSource, WatchState};
use crate::config::{self, ChangerSettings, LevelConfig};
use crate::error::{ConfigError, WatchError};
use crate::level::Level;
use crate::logging::Logger;
use crate::registry::LevelRegistry;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Why a live watch is being torn down.
#[derive(Debug)]
enum RestartCause {
    Removed,
    Fault(WatchError),
    Reload(ConfigError),
    EventsClosed,
}

impl fmt::Display for RestartCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartCause::Removed => write!(f, "file removed"),
            RestartCause::Fault(e) => write!(f, "{}", e),
            RestartCause::Reload(e) => write!(f, "{}", e),
            RestartCause::EventsClosed => write!(f, "event stream closed"),
        }
    }
}

struct ActiveWatch {
    handle: Box<dyn WatchHandle>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
}

/// Owns the watch on the level file and pushes validated changes into the
/// registry.
///
/// Construction does not touch the filesystem; [`initialize`] starts the first
/// acquisition attempt.
///
/// [`initialize`]: LevelSupervisor::initialize
pub struct LevelSupervisor<S: WatchSource> {
    settings: ChangerSettings,
    source: S,
    registry: Arc<LevelRegistry>,
    logger: Logger,
    state: watch::Sender<WatchState>,
}

impl<S: WatchSource> LevelSupervisor<S> {
    /// Create a supervisor with a fresh registry at the initial level.
    pub fn new(settings: ChangerSettings, source: S) -> Self {
        let registry = Arc::new(LevelRegistry::new(LevelConfig::new(settings.initial_level)));
        Self::with_registry(settings, source, registry)
    }

    /// Create a supervisor driving an existing registry.
    pub fn with_registry(settings: ChangerSettings, source: S, registry: Arc<LevelRegistry>) -> Self {
        let logger = registry.diagnostics().clone();
        let (state, _) = watch::channel(WatchState::Unwatched);
        Self {
            settings,
            source,
            registry,
            logger,
            state,
        }
    }

    /// Registry this supervisor applies configurations to.
    pub fn registry(&self) -> &Arc<LevelRegistry> {
        &self.registry
    }

    /// Current watch state.
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Spawn the supervisor onto the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn initialize(self) -> SupervisorHandle {
        let state = self.state.subscribe();
        let registry = Arc::clone(&self.registry);
        let task = tokio::spawn(self.run());
        SupervisorHandle {
            state,
            registry,
            task,
        }
    }

    async fn run(self) {
        loop {
            if let Some(mut active) = self.try_start_watching() {
                let cause = self.supervise(&mut active).await;
                self.restart_watcher(active, cause);
            }
            tokio::time::sleep(self.settings.restart_backoff).await;
            self.set_state(WatchState::Unwatched);
        }
    }

    fn try_start_watching(&self) -> Option<ActiveWatch> {
        let (tx, events) = mpsc::unbounded_channel();
        match self.source.acquire(&self.settings.path, tx) {
            Ok(handle) => {
                self.set_state(WatchState::Watching);
                Some(ActiveWatch { handle, events })
            }
            Err(e) => {
                self.logger.trace(&format!(
                    "Got '{}' when trying to start watch. Restarting after {:?}",
                    e, self.settings.restart_backoff
                ));
                self.set_state(WatchState::RestartPending);
                None
            }
        }
    }

    /// Process events until something requires a restart.
    async fn supervise(&self, active: &mut ActiveWatch) -> RestartCause {
        // The watch gives no initial-state notification, so simulate one.
        if let Err(e) = self.handle_update().await {
            return RestartCause::Reload(e);
        }

        while let Some(event) = active.events.recv().await {
            match event {
                WatchEvent::Update(_) => {
                    if let Err(e) = self.handle_update().await {
                        return RestartCause::Reload(e);
                    }
                }
                WatchEvent::Remove(_) => return RestartCause::Removed,
                WatchEvent::Error(message) => return RestartCause::Fault(WatchError::Runtime(message)),
                WatchEvent::Unknown(kind) => {
                    self.logger.trace(&format!("Ignoring unknown event {}", kind));
                }
            }
        }
        RestartCause::EventsClosed
    }

    /// Load the file and apply it if it differs from what is in effect.
    ///
    /// Returns whether levels were re-applied.
    async fn handle_update(&self) -> Result<bool, ConfigError> {
        let current = self.registry.current();
        let next = config::load(&self.settings.path, &current).await?;
        if *next == *current {
            self.logger.trace("Level configuration unchanged");
            return Ok(false);
        }

        if self.logger.enabled(Level::Trace) {
            let data = serde_json::to_value(&*next).unwrap_or_default();
            self.logger.log_with_data(Level::Trace, "Applying new config", data);
        }
        self.registry.apply_all(next);
        Ok(true)
    }

    fn restart_watcher(&self, active: ActiveWatch, cause: RestartCause) {
        self.logger.trace(&format!("Restarting watcher due to {}", cause));
        let ActiveWatch { handle, events } = active;
        drop(events);
        handle.close();
        self.set_state(WatchState::RestartPending);
    }

    fn set_state(&self, next: WatchState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            self.logger.trace(&format!("Watch state {} -> {}", previous, next));
        }
    }
}

/// Handle to a running supervisor.
pub struct SupervisorHandle {
    state: watch::Receiver<WatchState>,
    registry: Arc<LevelRegistry>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Latest published watch state.
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Receiver for watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<WatchState> {
        self.state.clone()
    }

    /// Wait until the supervisor publishes `target`.
    ///
    /// Returns false if the supervisor task has ended.
    pub async fn wait_for_state(&mut self, target: WatchState) -> bool {
        self.state.wait_for(|state| *state == target).await.is_ok()
    }

    /// Registry the supervisor applies configurations to.
    pub fn registry(&self) -> &Arc<LevelRegistry> {
        &self.registry
    }

    /// Stop the supervisor, discarding any pending timer or read.
    pub fn shutdown(self) {
        self.task.abort();
    }
}
