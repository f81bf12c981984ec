//! Game loop binary for the Skeld simulation.
//!
//! Wires together configuration, the decision provider, and the game
//! orchestrator, then ticks the game at a fixed cadence until it ends.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line flags (`--loop`, `--ticks N`)
//! 2. Load configuration from `SKELD_CONFIG` (default `skeld-config.yaml`)
//! 3. Initialize structured logging (tracing)
//! 4. Select the decision provider: language model when `LLM_BACKEND` is
//!    set, offline rules otherwise
//! 5. Build the game and start the countdown
//! 6. Run the loop
//! 7. Log the result

mod args;
mod driver;
mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser as _;
use skeld_core::config::GameConfig;
use skeld_core::decision::{DecisionProvider, OfflineProvider};
use skeld_core::game::Game;
use skeld_runner::config::RunnerConfig;
use skeld_runner::provider::LlmDecisionProvider;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::EngineArgs;
use crate::error::EngineError;

/// Config file used when `SKELD_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "skeld-config.yaml";

/// Application entry point for the game loop.
///
/// # Errors
///
/// Returns an error if configuration, the provider, or the game cannot be
/// set up. Bad flags print usage and exit.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Command line.
    let args = EngineArgs::parse();

    // 2. Configuration.
    let config_path = std::env::var("SKELD_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, found) = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // 3. Logging.
    init_logging(&config)?;
    info!("skeld-engine starting");
    if found {
        info!(path = %config_path.display(), "configuration loaded");
    } else {
        info!(path = %config_path.display(), "config file not found, using defaults");
    }
    info!(
        seed = config.game.seed,
        agents = config.game.agent_count(),
        impostors = config.game.impostor_count(),
        tick_interval_ms = config.timing.tick_interval_ms,
        extra_roles = config.game.extra_roles,
        "game configuration"
    );

    // 4. Decision provider.
    let provider = select_provider(&config)?;

    // 5. Game.
    let mut game = Game::new(config, provider).map_err(EngineError::from)?;
    game.start();

    // 6. Loop.
    let outcome = driver::run(&mut game, &args).await;

    // 7. Result.
    info!(
        ticks = outcome.ticks,
        games_finished = outcome.games_finished,
        reason = ?outcome.reason,
        status = %game.status_line(),
        "skeld-engine shutdown complete"
    );
    Ok(())
}

/// Read the config file, or fall back to defaults when it does not exist.
///
/// The flag reports whether the file was found.
fn load_config(path: &Path) -> Result<(GameConfig, bool), EngineError> {
    if path.exists() {
        Ok((GameConfig::from_file(path)?, true))
    } else {
        Ok((GameConfig::parse("")?, false))
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &GameConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log level {}: {e}", config.logging.level),
        })?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Language-model provider when the environment configures one and the
/// config allows it; the offline provider otherwise.
fn select_provider(config: &GameConfig) -> Result<Box<dyn DecisionProvider>, EngineError> {
    let default_timeout = Duration::from_millis(config.decision.timeout_ms);
    match RunnerConfig::from_env(default_timeout)? {
        Some(runner) if config.decision.enabled => {
            let provider = LlmDecisionProvider::new(&runner)?;
            info!(
                backend = provider.name(),
                model = %runner.backend.model,
                timeout = ?runner.decision_timeout,
                max_concurrent_calls = runner.max_concurrent_calls,
                personality = runner.personality.as_str(),
                "language-model decisions enabled"
            );
            Ok(Box::new(provider))
        }
        Some(_) => {
            info!("decision.enabled is false, playing with rule-based decisions");
            Ok(Box::new(OfflineProvider::new()))
        }
        None => {
            info!("LLM_BACKEND not set, playing with rule-based decisions");
            Ok(Box::new(OfflineProvider::new()))
        }
    }
}
