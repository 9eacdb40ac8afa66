//! Runtime log level control driven by a watched configuration file.
//!
//! A [`LevelSupervisor`] watches a JSON/YAML level file, validates each
//! revision and pushes the resulting levels into a [`LevelRegistry`] of named
//! logger handles. Broken edits and watch failures never disturb the levels
//! already in effect.
//!
//! ```ignore
//! let settings = ChangerSettings::new("levels.json").with_initial_level(Level::Info);
//! let supervisor = LevelSupervisor::new(settings, NotifySource::default());
//! let factory = LoggerFactory::new(Arc::clone(supervisor.registry()));
//! let handle = supervisor.initialize();
//!
//! let logger = factory.create_logger("Foo");
//! logger.info("follows levels.json");
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod level;
pub mod logging;
pub mod registry;
pub mod watch;

pub use config::{ChangerSettings, LevelConfig};
pub use error::{ConfigError, Error, Result, WatchError};
pub use level::Level;
pub use logging::{LogLevelFilter, Logger, LoggerFactory};
pub use registry::{LevelHandle, LevelRegistry, resolve};
pub use watch::{LevelSupervisor, NotifySource, SupervisorHandle, WatchEvent, WatchSource, WatchState};
