//! CLI definition for the level-watch demo host.
//!
//! Flags override the `LEVEL_WATCH_*` environment variables, which override
//! the built-in defaults.

use crate::config::ChangerSettings;
use crate::level::Level;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Runs a host process whose component log levels follow a watched file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the watched level file (JSON, or YAML by extension)
    #[arg(long)]
    pub levels: Option<PathBuf>,

    /// Default level until the file is read successfully
    #[arg(long)]
    pub level: Option<Level>,

    /// Seconds to wait before re-acquiring a failed watch (at least 1)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub backoff: Option<u64>,

    /// Keep the initial level and do not watch any file
    #[arg(long)]
    pub no_watch: bool,

    /// Seconds between demo log messages
    #[arg(long, default_value_t = 3)]
    pub interval: u64,

    /// Enable verbose logging for dependencies too
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

impl Cli {
    /// Merge flags over environment-derived settings.
    pub fn settings(&self) -> ChangerSettings {
        self.settings_over(ChangerSettings::from_env())
    }

    fn settings_over(&self, mut settings: ChangerSettings) -> ChangerSettings {
        if let Some(path) = &self.levels {
            settings.path = path.clone();
        }
        if let Some(level) = self.level {
            settings.initial_level = level;
        }
        if let Some(secs) = self.backoff {
            settings.restart_backoff = Duration::from_secs(secs);
        }
        settings
    }

    /// Interval between demo messages.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }
}
