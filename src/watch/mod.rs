//! Filesystem watch capability and the supervisor that drives reloads.
//!
//! The watch primitive is abstracted as a [`WatchSource`] that hands out
//! [`WatchHandle`]s. Events flow through a tokio channel created per
//! acquisition, so a closed watcher can never deliver stale events into the
//! next one.

mod notify_source;
mod supervisor;

pub use notify_source::NotifySource;
pub use supervisor::{LevelSupervisor, SupervisorHandle};

use crate::error::WatchError;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Event reported by a watch source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The watched file was written or replaced.
    Update(PathBuf),
    /// The watched file disappeared.
    Remove(PathBuf),
    /// The watch reported a fault.
    Error(String),
    /// An event kind the supervisor does not act on.
    Unknown(String),
}

/// Sender half handed to a watch source on acquisition.
pub type EventSender = mpsc::UnboundedSender<WatchEvent>;

/// A live watch resource. Closing releases it; dropping does the same.
pub trait WatchHandle: Send {
    /// Detach listeners and release the underlying resource.
    fn close(self: Box<Self>);
}

/// Something that can start watching a path.
pub trait WatchSource: Send + Sync + 'static {
    /// Start watching `path`, delivering events into `events`.
    fn acquire(&self, path: &Path, events: EventSender) -> Result<Box<dyn WatchHandle>, WatchError>;
}

/// Supervisor watch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchState {
    /// No watch is held and no retry is scheduled.
    #[default]
    Unwatched,
    /// A watch is held and events are being processed.
    Watching,
    /// The previous watch was released; a retry is scheduled after the backoff.
    RestartPending,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchState::Unwatched => write!(f, "unwatched"),
            WatchState::Watching => write!(f, "watching"),
            WatchState::RestartPending => write!(f, "restart-pending"),
        }
    }
}
