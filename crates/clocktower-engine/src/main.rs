//! Scenario runner for the Clocktower game engine.
//!
//! Plays a YAML scenario through a [`Game`](clocktower_core::Game) the way
//! a chat front end would: every command becomes an engine call, and every
//! announcement is narrated to stdout.
//!
//! # Usage
//!
//! ```text
//! clocktower-engine <scenario.yaml> [snapshot.json]
//! ```
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `clocktower-config.yaml` (or `CLOCKTOWER_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Parse the scenario and set up the game
//! 4. Run the commands and print the transcript
//! 5. Write a snapshot if a path was given

mod error;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clocktower_core::ClocktowerConfig;
use clocktower_core::config::LoggingConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::scenario::{Runner, Scenario};

/// Default configuration file, read from the working directory.
const CONFIG_FILE: &str = "clocktower-config.yaml";

/// Environment variable overriding [`CONFIG_FILE`].
const CONFIG_ENV: &str = "CLOCKTOWER_CONFIG";

fn main() -> anyhow::Result<()> {
    // Logging depends on the config, so the config comes first.
    let config = load_config().context("loading configuration")?;
    init_tracing(&config.logging);
    info!(
        seed = config.rules.seed,
        starting_dead_votes = config.rules.starting_dead_votes,
        max_status_depth = config.rules.max_status_depth,
        "Configuration loaded"
    );

    let mut args = std::env::args_os().skip(1);
    let scenario_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: clocktower-engine <scenario.yaml> [snapshot.json]")?;
    let snapshot_path = args.next().map(PathBuf::from);

    let contents = std::fs::read_to_string(&scenario_path)
        .with_context(|| format!("reading {}", scenario_path.display()))?;
    let scenario = Scenario::parse(&contents)?;
    let game = scenario.build(config.rules)?;
    info!(
        game = %game.id(),
        players = game.seating().len(),
        commands = scenario.commands.len(),
        "Scenario loaded"
    );

    let mut runner = Runner::new(game, scenario.preferences);
    let outcome = runner.run_all(&scenario.commands);
    for line in runner.transcript() {
        println!("{line}");
    }
    if let Err(err) = &outcome {
        error!(error = %err, "scenario stopped early");
    }

    if let Some(path) = snapshot_path {
        write_snapshot(&runner, &path)?;
    }
    outcome?;
    Ok(())
}

/// Load configuration from [`CONFIG_ENV`] or [`CONFIG_FILE`].
///
/// A missing file yields the defaults.
fn load_config() -> Result<ClocktowerConfig, EngineError> {
    let path = std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    if path.exists() {
        Ok(ClocktowerConfig::from_file(&path)?)
    } else {
        Ok(ClocktowerConfig::default())
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn write_snapshot(runner: &Runner, path: &Path) -> Result<(), EngineError> {
    let json = runner.game().snapshot()?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "Snapshot written");
    Ok(())
}
