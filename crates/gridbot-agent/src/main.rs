//! Agent binary for gridbot.
//!
//! This is the main entry point that wires together the position tag
//! feed, the authority sync loop and the motion loop around one shared
//! [`AgentContext`]. The loops run until Ctrl-C, after which the motors
//! are stopped.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `gridbot-config.yaml` (defaults if missing)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the configuration
//! 4. Build the shared agent context
//! 5. Connect to the authority
//! 6. Spawn the tag feed, sync loop and motion loop
//! 7. Wait for Ctrl-C or the motion loop ending
//! 8. Broadcast shutdown and wait for the motors to stop

mod dry_run;
mod error;
mod tag_feed;

use std::path::Path;
use std::sync::Arc;

use gridbot_core::config::{AgentConfig, LoggingConfig};
use gridbot_core::context::AgentContext;
use gridbot_core::motion::MotionController;
use gridbot_core::sync::SyncClient;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::dry_run::{LoggingActuator, NoLineSensors};
use crate::error::AgentError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "gridbot-config.yaml";

/// Application entry point for the agent.
///
/// # Errors
///
/// Returns an error if configuration, the initial world or the authority
/// connection cannot be set up.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so this comes first.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("gridbot-agent starting");
    if !from_file {
        info!(path = CONFIG_FILE, "Config file not found, using defaults");
    }

    // 3. Validate.
    config.validate().map_err(AgentError::from)?;
    info!(
        rows = config.grid.rows,
        cols = config.grid.cols,
        authority = %config.authority.addr,
        poll_interval_ms = config.authority.poll_interval_ms,
        tick_interval_ms = config.motion.tick_interval_ms,
        initial_heading = %config.heading.initial,
        consume_once = config.heading.consume_once,
        "Configuration loaded"
    );

    // 4. Build the shared context.
    let context = Arc::new(AgentContext::new(&config).map_err(AgentError::from)?);
    info!(
        player_slots = config.wire.player_slots,
        "Agent context initialized"
    );

    // 5. Connect to the authority.
    let addr = config.authority.addr.clone();
    info!(addr = %addr, "Connecting to authority");
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| AgentError::Connect {
            addr: addr.clone(),
            source,
        })?;
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "failed to disable Nagle on authority stream");
    }
    info!(addr = %addr, "Authority connected");

    // 6. Spawn the loops.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let feed_task = tokio::spawn(tag_feed::run(
        tag_feed::spawn_stdin_reader(),
        Arc::clone(&context),
        shutdown_rx.clone(),
    ));

    let client = SyncClient::new(stream, &config, Arc::clone(&context));
    let sync_shutdown = shutdown_rx.clone();
    let sync_task = tokio::spawn(async move {
        match client.run(sync_shutdown).await {
            Ok(cycles) => info!(cycles, "Sync loop finished"),
            Err(e) => error!(
                error = %e,
                "Sync loop terminated, motion continues on the last turn signal"
            ),
        }
    });

    let controller = MotionController::new(
        NoLineSensors,
        LoggingActuator::new(),
        Arc::clone(&context),
        config.motion,
    );
    let mut motion_task = tokio::spawn(controller.run(shutdown_rx));
    info!("Agent loops running, press Ctrl-C to stop");

    // 7. Wait for Ctrl-C or the motion loop ending on its own.
    let (signal_result, motion_result) = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match &signal {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => error!(error = %e, "Ctrl-C handler failed, shutting down"),
            }
            (signal, None)
        }
        result = &mut motion_task => {
            warn!("Motion loop ended before shutdown was requested");
            (Ok(()), Some(result))
        }
    };

    // 8. Broadcast shutdown; the motion loop stops the motors on exit.
    let motion_result = stop_motion(&shutdown_tx, motion_task, motion_result).await;
    match motion_result {
        Ok(ticks) => info!(ticks, "Motion loop stopped"),
        Err(e) => error!(error = %e, "Motion task failed"),
    }
    signal_result.map_err(|source| AgentError::Signal { source })?;
    if let Err(e) = sync_task.await {
        error!(error = %e, "Sync task failed");
    }
    match feed_task.await {
        Ok(accepted) => info!(accepted, "Tag feed stopped"),
        Err(e) => error!(error = %e, "Tag feed task failed"),
    }

    if let Some(cycle) = context.last_cycle() {
        info!(
            last_sample = %cycle.sample,
            last_direction = %cycle.decision.direction,
            revision = cycle.revision,
            "Last completed sync cycle"
        );
    }
    info!("gridbot-agent shutdown complete");

    Ok(())
}

/// Broadcast shutdown and wait for the motion loop to halt the motors.
///
/// `finished` carries the motion result when the task already completed.
async fn stop_motion(
    shutdown: &watch::Sender<bool>,
    motion_task: JoinHandle<u64>,
    finished: Option<Result<u64, JoinError>>,
) -> Result<u64, JoinError> {
    if shutdown.send(true).is_err() {
        warn!("All loops already stopped before shutdown broadcast");
    }
    match finished {
        Some(result) => result,
        None => motion_task.await,
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the agent configuration from [`CONFIG_FILE`].
///
/// Returns the configuration and whether it was read from disk.
fn load_config() -> Result<(AgentConfig, bool), AgentError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        let config = AgentConfig::from_file(config_path)?;
        Ok((config, true))
    } else {
        let mut config = AgentConfig::default();
        config.authority.apply_env_overrides();
        Ok((config, false))
    }
}
