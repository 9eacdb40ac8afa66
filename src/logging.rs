//! Level-controlled logger handles backed by `tracing`.
//!
//! Each [`Logger`] carries a name (its component) and a shared
//! [`LogLevelFilter`]. The filter is what the [`LevelRegistry`] adjusts at
//! runtime; the logger checks it before forwarding a record to `tracing`.
//!
//! [`LevelRegistry`]: crate::registry::LevelRegistry

use crate::config::LevelConfig;
use crate::level::Level;
use crate::registry::{LevelHandle, LevelRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::panic::Location;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU8, Ordering},
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Component name of the factory's root logger.
pub const ROOT_COMPONENT: &str = "root";

/// Atomic level filter that can be adjusted while loggers are in use.
pub struct LogLevelFilter(AtomicU8);

impl LogLevelFilter {
    /// Create a new filter with the given minimum level.
    pub fn new(level: Level) -> Self {
        Self(AtomicU8::new(level.to_u8()))
    }

    /// Get the current minimum level.
    pub fn get(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::Relaxed))
    }

    /// Set the minimum level.
    pub fn set(&self, level: Level) {
        self.0.store(level.to_u8(), Ordering::Relaxed);
    }

    /// Check if a message at the given severity should be logged.
    ///
    /// `Silent` is not a severity; asking about it always returns false.
    pub fn should_log(&self, severity: Level) -> bool {
        severity != Level::Silent && severity >= self.get()
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl LevelHandle for LogLevelFilter {
    fn level(&self) -> Level {
        self.get()
    }

    fn set_level(&self, level: Level) {
        self.set(level);
    }
}

macro_rules! emit {
    ($macro:ident, $name:expr, $message:expr, $data:expr) => {
        match $data {
            Some(data) => tracing::$macro!(logger = %$name, data = %data, "{}", $message),
            None => tracing::$macro!(logger = %$name, "{}", $message),
        }
    };
}

/// Named logger whose level is controlled through its filter.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    level_filter: Arc<LogLevelFilter>,
}

impl Logger {
    /// Create a logger with its own filter at `level`.
    pub fn new(name: impl Into<Arc<str>>, level: Level) -> Self {
        Self {
            name: name.into(),
            level_filter: Arc::new(LogLevelFilter::new(level)),
        }
    }

    /// Component name of this logger.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared level filter. This is the handle to register.
    pub fn level_filter(&self) -> &Arc<LogLevelFilter> {
        &self.level_filter
    }

    /// Current minimum level.
    pub fn level(&self) -> Level {
        self.level_filter.get()
    }

    /// Check if a message at `severity` would be emitted.
    pub fn enabled(&self, severity: Level) -> bool {
        self.level_filter.should_log(severity)
    }

    /// Log a message to the `tracing` backend.
    pub fn log(&self, severity: Level, message: &str, data: Option<&Value>) {
        if !self.enabled(severity) {
            return;
        }

        match severity {
            Level::Trace => emit!(trace, self.name, message, data),
            Level::Debug => emit!(debug, self.name, message, data),
            Level::Info => emit!(info, self.name, message, data),
            Level::Warn => emit!(warn, self.name, message, data),
            Level::Error => emit!(error, self.name, message, data),
            Level::Fatal => match data {
                Some(data) => tracing::error!(logger = %self.name, fatal = true, data = %data, "{}", message),
                None => tracing::error!(logger = %self.name, fatal = true, "{}", message),
            },
            Level::Silent => {}
        }
    }

    /// Log a message with structured data.
    pub fn log_with_data(&self, severity: Level, message: &str, data: Value) {
        self.log(severity, message, Some(&data));
    }

    pub fn trace(&self, msg: &str) {
        self.log(Level::Trace, msg, None);
    }

    pub fn debug(&self, msg: &str) {
        self.log(Level::Debug, msg, None);
    }

    pub fn info(&self, msg: &str) {
        self.log(Level::Info, msg, None);
    }

    pub fn warn(&self, msg: &str) {
        self.log(Level::Warn, msg, None);
    }

    pub fn error(&self, msg: &str) {
        self.log(Level::Error, msg, None);
    }

    pub fn fatal(&self, msg: &str) {
        self.log(Level::Fatal, msg, None);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .finish()
    }
}

/// Creates component loggers and registers them for runtime level control.
///
/// One logger exists per component name. Asking for the same name again
/// returns a clone sharing the same filter.
pub struct LoggerFactory {
    registry: Arc<LevelRegistry>,
    root: Logger,
    loggers: Mutex<HashMap<String, Logger>>,
}

impl LoggerFactory {
    /// Create a factory and register its root logger.
    pub fn new(registry: Arc<LevelRegistry>) -> Self {
        let root = Logger::new(ROOT_COMPONENT, registry.current().default_level);
        registry.register(ROOT_COMPONENT, root.level_filter());
        Self {
            registry,
            root,
            loggers: Mutex::new(HashMap::new()),
        }
    }

    /// Create a factory with its own registry and nothing watching a file.
    ///
    /// Loggers still register, so every one of them starts at `config`'s
    /// level for its component; levels only change through
    /// [`LevelRegistry::apply_all`].
    pub fn unwatched(config: LevelConfig) -> Self {
        Self::new(Arc::new(LevelRegistry::new(config)))
    }

    /// Root logger, for code that does not belong to a named component.
    pub fn root(&self) -> &Logger {
        &self.root
    }

    /// Get the logger for `component`, creating and registering it on first use.
    pub fn create_logger(&self, component: &str) -> Logger {
        let mut loggers = self.loggers.lock().unwrap();
        if let Some(logger) = loggers.get(component) {
            return logger.clone();
        }

        let logger = Logger::new(component, self.registry.current().default_level);
        self.registry.register(component, logger.level_filter());
        loggers.insert(component.to_string(), logger.clone());
        logger
    }

    /// Get the logger named after the calling source file.
    ///
    /// The name is the path reported by [`Location::file`], e.g.
    /// `src/worker.rs`, so every call site in one file shares a logger.
    #[track_caller]
    pub fn create_caller_logger(&self) -> Logger {
        self.create_logger(Location::caller().file())
    }

    /// Registry the factory registers into.
    pub fn registry(&self) -> &Arc<LevelRegistry> {
        &self.registry
    }
}

/// Install the global `tracing` subscriber.
///
/// `target` selects the output: `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a
/// file name opened in append mode. Records from this crate are admitted down
/// to `trace` because each [`Logger`] already gates on its own filter; other
/// crates stay at `info` unless `verbose` is set. `RUST_LOG` replaces the
/// default directive.
pub fn init_tracing(target: &str, verbose: bool) -> anyhow::Result<()> {
    let default_directive = if verbose { "trace" } else { "level_watch=trace,info" };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
    };

    match target {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
