//! Error types for the game loop binary.
//!
//! [`EngineError`] wraps every failure mode during startup so `main` can
//! propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: skeld_core::config::ConfigError,
    },

    /// The game could not be built.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: skeld_core::game::GameError,
    },

    /// The language-model provider could not be configured.
    #[error("decision provider error: {source}")]
    Provider {
        /// The underlying runner error.
        #[from]
        source: skeld_runner::error::RunnerError,
    },

    /// Logging could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
