//! Numeric knobs for agent behavior.
//!
//! Both structs deserialize with container-level defaults, so a YAML section
//! only needs the fields it overrides. Distances are map pixels, durations
//! milliseconds, chances per roll in `[0, 1]`.

use serde::Deserialize;

/// Tuning shared by every agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Distance walked per tick.
    pub speed: f64,
    /// Radius within which other agents and bodies are seen.
    pub vision_radius: f64,
    /// A waypoint counts as reached inside this distance.
    pub arrival_distance: f64,
    /// Half-width of the square around a room center used as a target.
    pub room_jitter: f64,
    /// Minimum idle time before choosing a destination.
    pub idle_min_ms: u64,
    /// Random extra idle time.
    pub idle_jitter_ms: u64,
    /// Minimum pause between decision-provider calls.
    pub decision_cooldown_min_ms: u64,
    /// Random extra pause between decision-provider calls.
    pub decision_cooldown_jitter_ms: u64,
    /// Minimum decision pause after a round reset.
    pub round_decision_cooldown_min_ms: u64,
    /// Random extra decision pause after a round reset.
    pub round_decision_cooldown_jitter_ms: u64,
    /// Destination decisions remembered for prompts.
    pub decision_history_cap: usize,
    /// Companions unseen for longer than this are forgotten.
    pub companion_expiry_ms: u64,
    /// Sightings older than this are purged.
    pub sighting_window_ms: u64,
    /// Co-presence needed before a companion is cleared.
    pub clear_threshold_ms: u64,
    /// Co-presence needed for a companion to appear in an alibi snapshot.
    pub alibi_threshold_ms: u64,
    /// Bodies are invisible for this long after death.
    pub body_detection_delay_ms: u64,
    /// A witness reports the victim once this close to the body.
    pub witness_report_radius: f64,
    /// Scientist vitals cooldown.
    pub vitals_cooldown_ms: u64,
    /// Rooms a detective remembers.
    pub detective_history: usize,
    /// Follow re-paths when the target is farther than this.
    pub follow_far: f64,
    /// Follow may re-path when the target is farther than this.
    pub follow_near: f64,
    /// Follow stops when the target is closer than this.
    pub follow_stop: f64,
    /// Chance per tick of a follow or camp re-path while already moving.
    pub follow_repath_chance: f64,
    /// How long a speech bubble stays up.
    pub speech_ms: u64,
    /// Collision radius used when the human agent walks into walls.
    pub wall_radius: f64,
    /// Spawn spread around the Cafeteria center after a meeting, x axis.
    pub spawn_spread_x: f64,
    /// Spawn spread around the Cafeteria center after a meeting, y axis.
    pub spawn_spread_y: f64,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            speed: 1.8,
            vision_radius: 200.0,
            arrival_distance: 5.0,
            room_jitter: 30.0,
            idle_min_ms: 800,
            idle_jitter_ms: 2000,
            decision_cooldown_min_ms: 8000,
            decision_cooldown_jitter_ms: 4000,
            round_decision_cooldown_min_ms: 2000,
            round_decision_cooldown_jitter_ms: 3000,
            decision_history_cap: 10,
            companion_expiry_ms: 5000,
            sighting_window_ms: 45_000,
            clear_threshold_ms: 8000,
            alibi_threshold_ms: 3000,
            body_detection_delay_ms: 600,
            witness_report_radius: 250.0,
            vitals_cooldown_ms: 10_000,
            detective_history: 5,
            follow_far: 150.0,
            follow_near: 80.0,
            follow_stop: 60.0,
            follow_repath_chance: 0.02,
            speech_ms: 3000,
            wall_radius: 15.0,
            spawn_spread_x: 50.0,
            spawn_spread_y: 40.0,
        }
    }
}

/// Tuning specific to impostors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImpostorTuning {
    /// Kill cooldown after a kill.
    pub kill_cooldown_ms: u64,
    /// Kill cooldown at game start and after each meeting.
    pub round_kill_timer_ms: u64,
    /// Maximum distance to a victim.
    pub kill_range: f64,
    /// Agents this close to a prospective victim count as witnesses.
    pub witness_radius: f64,
    /// A single witness farther than this only makes a kill risky.
    pub lone_witness_distance: f64,
    /// A vent in the same room within this distance earns a bonus.
    pub vent_bonus_radius: f64,
    /// Targets farther than this take a travel penalty.
    pub far_target_distance: f64,
    /// Score at or above which a kill executes.
    pub kill_threshold: f64,
    /// Lower edge of the band where the decision provider is consulted.
    pub borderline_threshold: f64,
    /// Minimum score for a hunt to pick a victim.
    pub hunt_threshold: f64,
    /// Alive agents in the room that turn a kill into a stack kill.
    pub stack_kill_crowd: usize,
    /// Lower bound of the cautiousness trait.
    pub cautiousness_min: f64,
    /// Random extra cautiousness.
    pub cautiousness_jitter: f64,
    /// Minimum idle time.
    pub idle_min_ms: u64,
    /// Random extra idle time.
    pub idle_jitter_ms: u64,
    /// Chance per tick of looking for bodies.
    pub body_check_chance: f64,
    /// Chance of escaping through a vent right after a kill.
    pub escape_vent_chance: f64,
    /// Maximum distance to a vent used for escape.
    pub escape_vent_radius: f64,
    /// Minimum time spent inside a vent.
    pub vent_min_ms: u64,
    /// Random extra time inside a vent.
    pub vent_jitter_ms: u64,
    /// Self-report lockout after a kill.
    pub self_report_cooldown_ms: u64,
    /// Chance that the self-report lockout applies.
    pub self_report_delay_chance: f64,
    /// Sabotage cooldown.
    pub sabotage_cooldown_ms: u64,
    /// Chance per tick of sabotaging once the cooldown is over.
    pub sabotage_chance: f64,
    /// How long a disguise lasts.
    pub shapeshift_duration_ms: u64,
    /// Shapeshift cooldown.
    pub shapeshift_cooldown_ms: u64,
    /// Suspicion added to observers of a fresh disguise.
    pub shapeshift_suspicion: f64,
    /// How long invisibility lasts.
    pub phantom_duration_ms: u64,
    /// Phantom cooldown.
    pub phantom_cooldown_ms: u64,
    /// Chance per idle cycle of using an extra-role ability.
    pub ability_chance: f64,
    /// Chance per idle cycle of asking the decision provider for a room.
    pub destination_decision_chance: f64,
    /// Pause between destination decisions.
    pub destination_decision_cooldown_ms: u64,
    /// Viper victims' bodies disappear after this long.
    pub viper_body_ms: u64,
}

impl Default for ImpostorTuning {
    fn default() -> Self {
        Self {
            kill_cooldown_ms: 30_000,
            round_kill_timer_ms: 15_000,
            kill_range: 80.0,
            witness_radius: 280.0,
            lone_witness_distance: 200.0,
            vent_bonus_radius: 120.0,
            far_target_distance: 400.0,
            kill_threshold: 0.6,
            borderline_threshold: 0.4,
            hunt_threshold: 0.3,
            stack_kill_crowd: 5,
            cautiousness_min: 0.55,
            cautiousness_jitter: 0.35,
            idle_min_ms: 1500,
            idle_jitter_ms: 2000,
            body_check_chance: 0.12,
            escape_vent_chance: 0.65,
            escape_vent_radius: 100.0,
            vent_min_ms: 3000,
            vent_jitter_ms: 5000,
            self_report_cooldown_ms: 10_000,
            self_report_delay_chance: 0.8,
            sabotage_cooldown_ms: 30_000,
            sabotage_chance: 0.0008,
            shapeshift_duration_ms: 10_000,
            shapeshift_cooldown_ms: 30_000,
            shapeshift_suspicion: 0.15,
            phantom_duration_ms: 6000,
            phantom_cooldown_ms: 30_000,
            ability_chance: 0.1,
            destination_decision_chance: 0.15,
            destination_decision_cooldown_ms: 15_000,
            viper_body_ms: 20_000,
        }
    }
}

/// Both tuning sections together, as agents need them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Shared knobs.
    pub agent: AgentTuning,
    /// Impostor knobs.
    pub impostor: ImpostorTuning,
}
