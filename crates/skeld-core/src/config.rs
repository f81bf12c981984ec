//! Configuration loading and typed config structures for the Skeld simulation.
//!
//! The canonical configuration lives in `skeld-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file. Every
//! field has a default, so an empty file describes a standard 12-agent game.

use std::path::Path;

use serde::Deserialize;
use skeld_agents::{AgentTuning, ImpostorTuning, Tuning};
use skeld_types::{Color, ExtraRole, Role};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
///
/// Mirrors the structure of `skeld-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Roster and seed.
    #[serde(default)]
    pub game: GameSection,

    /// Loop cadence and start delay.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Shared agent behavior.
    #[serde(default)]
    pub agent: AgentTuning,

    /// Impostor behavior.
    #[serde(default)]
    pub impostor: ImpostorTuning,

    /// Meeting durations and limits.
    #[serde(default)]
    pub meeting: MeetingConfig,

    /// Ranges and timers the orchestrator enforces.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Decision provider switches.
    #[serde(default)]
    pub decision: DecisionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `SKELD_SEED` overrides `game.seed` when set to a valid integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.game.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Both tuning sections in the shape agents take them.
    pub fn tuning(&self) -> Tuning {
        Tuning {
            agent: self.agent.clone(),
            impostor: self.impostor.clone(),
        }
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let agents = self.game.agent_count();
        let impostors = self.game.impostor_count();
        let palette = self.game.palette_size();
        if agents > palette {
            return Err(invalid(format!(
                "{agents} agents requested but only {palette} colors are available"
            )));
        }
        if impostors == 0 || impostors >= agents {
            return Err(invalid(format!(
                "impostor count must be at least 1 and below the agent count ({agents}), got {impostors}"
            )));
        }
        if self.timing.tick_interval_ms == 0 {
            return Err(invalid("timing.tick_interval_ms must be positive".to_owned()));
        }
        if self.timing.max_delta_ms == 0 {
            return Err(invalid("timing.max_delta_ms must be positive".to_owned()));
        }
        let i = &self.impostor;
        if i.borderline_threshold > i.kill_threshold {
            return Err(invalid(
                "impostor.borderline_threshold must not exceed impostor.kill_threshold".to_owned(),
            ));
        }
        if let (Some(role), Some(forced)) = (self.game.player_role, self.game.forced_extra_role)
            && forced.team() != role
        {
            return Err(invalid(format!(
                "forced extra role {} does not belong to the {} team",
                forced.as_str(),
                role.as_str()
            )));
        }
        Ok(())
    }
}

const fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}

/// Roster configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSection {
    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Agents in the game; 12 (18 with extended colors) when absent.
    #[serde(default)]
    pub agents: Option<usize>,

    /// Impostors in the game; 2 (3 with extended colors) when absent.
    #[serde(default)]
    pub impostors: Option<usize>,

    /// Use the 18-color palette.
    #[serde(default)]
    pub extended_colors: bool,

    /// Hand out extra roles.
    #[serde(default = "default_true")]
    pub extra_roles: bool,

    /// Extra role forced on the human agent when it matches their team.
    #[serde(default)]
    pub forced_extra_role: Option<ExtraRole>,

    /// Color of the human agent. `None` runs bots only.
    #[serde(default)]
    pub player_color: Option<Color>,

    /// Team the human agent should land on.
    #[serde(default)]
    pub player_role: Option<Role>,
}

impl GameSection {
    /// Apply environment variable overrides.
    ///
    /// - `SKELD_SEED` overrides `seed`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SKELD_SEED")
            && let Ok(seed) = val.trim().parse()
        {
            self.seed = seed;
        }
    }

    /// Colors available for the roster.
    pub const fn palette_size(&self) -> usize {
        if self.extended_colors {
            Color::ALL.len()
        } else {
            Color::STANDARD_COUNT
        }
    }

    /// Effective agent count.
    pub fn agent_count(&self) -> usize {
        self.agents.unwrap_or(if self.extended_colors { 18 } else { 12 })
    }

    /// Effective impostor count.
    pub fn impostor_count(&self) -> usize {
        self.impostors
            .unwrap_or(if self.extended_colors { 3 } else { 2 })
    }

    /// Crewmates that receive an extra role.
    pub const fn crew_extra_roles(&self) -> usize {
        if self.extended_colors { 5 } else { 3 }
    }
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            agents: None,
            impostors: None,
            extended_colors: false,
            extra_roles: default_true(),
            forced_extra_role: None,
            player_color: None,
            player_role: None,
        }
    }
}

/// Loop cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Wall-clock milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Largest delta applied in one tick.
    #[serde(default = "default_max_delta_ms")]
    pub max_delta_ms: u64,

    /// Countdown between `starting` and `playing`.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,

    /// Simulated time between status log lines.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_delta_ms: default_max_delta_ms(),
            start_delay_ms: default_start_delay_ms(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

/// Meeting durations and limits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeetingConfig {
    /// Splash screen before discussion.
    #[serde(default = "default_splash_ms")]
    pub splash_ms: u64,

    /// Discussion budget.
    #[serde(default = "default_discussion_ms")]
    pub discussion_ms: u64,

    /// Voting budget.
    #[serde(default = "default_voting_ms")]
    pub voting_ms: u64,

    /// Results display.
    #[serde(default = "default_results_ms")]
    pub results_ms: u64,

    /// Ejection display.
    #[serde(default = "default_ejection_ms")]
    pub ejection_ms: u64,

    /// Pause before the next meeting may be called.
    #[serde(default = "default_meeting_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Emergency meetings per game.
    #[serde(default = "default_emergency_meetings")]
    pub emergency_meetings: u32,

    /// Chance per tick that a bot in the Cafeteria presses the button.
    #[serde(default = "default_emergency_press_chance")]
    pub emergency_press_chance: f64,

    /// Delay before the first provider-chosen speaker.
    #[serde(default = "default_first_speaker_ms")]
    pub first_speaker_ms: u64,

    /// Minimum gap between provider-chosen speakers.
    #[serde(default = "default_speaker_interval_min_ms")]
    pub speaker_interval_min_ms: u64,

    /// Random extra gap between provider-chosen speakers.
    #[serde(default = "default_speaker_interval_jitter_ms")]
    pub speaker_interval_jitter_ms: u64,

    /// Investigations a human detective may run per meeting.
    #[serde(default = "default_investigations")]
    pub investigations: usize,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            splash_ms: default_splash_ms(),
            discussion_ms: default_discussion_ms(),
            voting_ms: default_voting_ms(),
            results_ms: default_results_ms(),
            ejection_ms: default_ejection_ms(),
            cooldown_ms: default_meeting_cooldown_ms(),
            emergency_meetings: default_emergency_meetings(),
            emergency_press_chance: default_emergency_press_chance(),
            first_speaker_ms: default_first_speaker_ms(),
            speaker_interval_min_ms: default_speaker_interval_min_ms(),
            speaker_interval_jitter_ms: default_speaker_interval_jitter_ms(),
            investigations: default_investigations(),
        }
    }
}

/// Ranges and timers enforced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RulesConfig {
    /// Kill range for a human impostor.
    #[serde(default = "default_player_kill_range")]
    pub player_kill_range: f64,

    /// Report range for a human agent.
    #[serde(default = "default_report_range")]
    pub report_range: f64,

    /// Distance from the emergency button within which it can be pressed.
    #[serde(default = "default_button_range")]
    pub button_range: f64,

    /// A sabotage resolves on its own after this long.
    #[serde(default = "default_sabotage_duration_ms")]
    pub sabotage_duration_ms: u64,

    /// Share of crewmates sent to the repair room.
    #[serde(default = "default_sabotage_route_chance")]
    pub sabotage_route_chance: f64,

    /// How long a noisemaker's death alert lasts.
    #[serde(default = "default_noisemaker_alert_ms")]
    pub noisemaker_alert_ms: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            player_kill_range: default_player_kill_range(),
            report_range: default_report_range(),
            button_range: default_button_range(),
            sabotage_duration_ms: default_sabotage_duration_ms(),
            sabotage_route_chance: default_sabotage_route_chance(),
            noisemaker_alert_ms: default_noisemaker_alert_ms(),
        }
    }
}

/// Decision provider switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecisionConfig {
    /// Use the language-model provider when the environment configures one.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-call deadline.
    #[serde(default = "default_decision_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            timeout_ms: default_decision_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_true() -> bool {
    true
}

const fn default_tick_interval_ms() -> u64 {
    16
}

const fn default_max_delta_ms() -> u64 {
    50
}

const fn default_start_delay_ms() -> u64 {
    5000
}

const fn default_status_interval_ms() -> u64 {
    10_000
}

const fn default_splash_ms() -> u64 {
    3000
}

const fn default_discussion_ms() -> u64 {
    60_000
}

const fn default_voting_ms() -> u64 {
    15_000
}

const fn default_results_ms() -> u64 {
    4000
}

const fn default_ejection_ms() -> u64 {
    5000
}

const fn default_meeting_cooldown_ms() -> u64 {
    15_000
}

const fn default_emergency_meetings() -> u32 {
    1
}

const fn default_emergency_press_chance() -> f64 {
    0.000_05
}

const fn default_first_speaker_ms() -> u64 {
    3000
}

const fn default_speaker_interval_min_ms() -> u64 {
    3000
}

const fn default_speaker_interval_jitter_ms() -> u64 {
    5000
}

const fn default_investigations() -> usize {
    3
}

const fn default_player_kill_range() -> f64 {
    60.0
}

const fn default_report_range() -> f64 {
    80.0
}

const fn default_button_range() -> f64 {
    100.0
}

const fn default_sabotage_duration_ms() -> u64 {
    30_000
}

const fn default_sabotage_route_chance() -> f64 {
    0.6
}

const fn default_noisemaker_alert_ms() -> u64 {
    10_000
}

const fn default_decision_timeout_ms() -> u64 {
    8000
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> String {
    "pretty".to_owned()
}
