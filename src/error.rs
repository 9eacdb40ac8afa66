//! Error taxonomy for the level reconfiguration subsystem.
//!
//! Every error here is recovered inside the supervisor. They exist so the
//! failure paths can be logged, tested and matched on, not so they reach the
//! host process.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while turning the configuration file into a [`LevelConfig`].
///
/// [`LevelConfig`]: crate::config::LevelConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is missing, unreadable or permission was denied.
    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not well-formed JSON/YAML.
    #[error("unable to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Well-formed document that does not match the level schema.
    #[error("invalid level configuration: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

/// A single schema violation, located by a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub reason: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure of the filesystem watch itself.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Setting up the watch failed (typically the path does not exist yet).
    #[error("failed to watch {}: {message}", path.display())]
    Acquisition { path: PathBuf, message: String },

    /// The watch reported a fault after it was established.
    #[error("watcher fault: {0}")]
    Runtime(String),
}

impl WatchError {
    pub fn acquisition(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        WatchError::Acquisition {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Umbrella error for callers that do not care which stage failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

pub type Result<T> = std::result::Result<T, Error>;
