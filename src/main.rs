//! Level Watch demo host
//!
//! Starts the level supervisor on a file, creates a few component loggers and
//! logs from each of them periodically. Edit the level file while it runs to
//! see levels change without a restart.

use anyhow::Result;
use clap::Parser;
use level_watch::cli::Cli;
use level_watch::{LevelConfig, LevelSupervisor, LoggerFactory, NotifySource};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    level_watch::logging::init_tracing(&cli.log, cli.verbose)?;

    let settings = cli.settings();
    let (factory, handle) = if cli.no_watch {
        info!("Not watching; all loggers stay at {}", settings.initial_level);
        (LoggerFactory::unwatched(LevelConfig::new(settings.initial_level)), None)
    } else {
        info!(
            "Watching {} (initial level {}, restart backoff {:?})",
            settings.path.display(),
            settings.initial_level,
            settings.restart_backoff
        );
        let supervisor = LevelSupervisor::new(settings, NotifySource::default());
        let factory = LoggerFactory::new(Arc::clone(supervisor.registry()));
        (factory, Some(supervisor.initialize()))
    };

    let main_logger = factory.create_logger("main");
    let worker_logger = factory.create_logger("worker");
    let file_logger = factory.create_caller_logger();
    let interval = cli.interval();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                main_logger.info(&format!(
                    "Logging every {} seconds; set 'main' to warn in the level file to silence this",
                    interval.as_secs()
                ));
                worker_logger.debug("worker heartbeat");
                file_logger.trace(&format!("tick from logger '{}'", file_logger.name()));
                factory.root().trace("root tick");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    if let Some(handle) = handle {
        handle.shutdown();
    }
    Ok(())
}
