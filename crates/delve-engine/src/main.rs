//! Command-line driver for the Delve simulation.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Initialize structured logging (tracing)
//! 3. Load configuration from `--config` or `delve-config.yaml`
//! 4. Open the save file for the chosen start mode
//! 5. Build the game and play until it ends or input runs out
//! 6. Run any test directives left in the save file

mod cli;
mod error;
mod session;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use delve_core::SimulationConfig;
use delve_core::config::CONFIG_FILE_NAME;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::CliArgs;
use crate::session::Presentation;

/// Application entry point.
///
/// Help and version requests exit successfully; every other argument,
/// configuration, save file, or simulation error is printed and exits with
/// status 1.
#[tokio::main]
async fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let default_level = if args.diagnostics { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &CliArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mode = args.start_mode();
    info!(
        save_file = %args.save_file.display(),
        ?mode,
        snapshot_interval = config.replay.snapshot_interval,
        spawn_chance = config.world.spawn_chance,
        "delve starting"
    );

    let log = session::open_log(mode, &args.save_file, config.replay.snapshot_interval)
        .with_context(|| format!("cannot open {}", args.save_file.display()))?;
    let presentation = Presentation::new(
        args.headless,
        args.diagnostics,
        args.replay_delay.unwrap_or(config.replay.replay_delay_frames),
        config.replay.frame_ms,
    );
    session::play(log, config, presentation).await?;
    Ok(())
}

/// Load configuration from the named file, or from the default file when
/// it exists.
fn load_config(path: Option<&Path>) -> anyhow::Result<SimulationConfig> {
    let config = match path {
        Some(path) => SimulationConfig::from_file(path)
            .map_err(error::EngineError::from)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => SimulationConfig::load_or_default(Path::new(CONFIG_FILE_NAME))
            .map_err(error::EngineError::from)?,
    };
    Ok(config)
}
