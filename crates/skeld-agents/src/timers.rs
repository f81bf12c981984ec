//! Per-agent timer registry.
//!
//! Every cooldown, window and in-flight flag an agent carries lives here, so
//! advancing time and resetting for a new round are each one call.

use rand::Rng;

use crate::tuning::Tuning;

/// A millisecond countdown that saturates at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Countdown(u64);

impl Countdown {
    /// An expired countdown.
    pub const ZERO: Self = Self(0);

    /// Start counting down from `ms`.
    pub const fn from_ms(ms: u64) -> Self {
        Self(ms)
    }

    /// Restart from `ms`.
    pub const fn set(&mut self, ms: u64) {
        self.0 = ms;
    }

    /// Advance by `dt` milliseconds.
    pub const fn tick(&mut self, dt: u64) {
        self.0 = self.0.saturating_sub(dt);
    }

    /// Whether the countdown has run out.
    pub const fn is_ready(self) -> bool {
        self.0 == 0
    }

    /// Milliseconds left.
    pub const fn remaining(self) -> u64 {
        self.0
    }

    /// Force the countdown to zero.
    pub const fn clear(&mut self) {
        self.0 = 0;
    }
}

/// `min + U(0, jitter)` milliseconds.
pub fn jittered(rng: &mut impl Rng, min: u64, jitter: u64) -> u64 {
    if jitter == 0 {
        return min;
    }
    min.saturating_add(rng.random_range(0..=jitter))
}

/// All timers owned by one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerRegistry {
    /// Time left before an idle agent picks a destination.
    pub idle: Countdown,
    /// Time left in the current task step.
    pub task: Countdown,
    /// Time left between two steps of a multi-step task.
    pub wait: Countdown,
    /// Pause before the next decision-provider call.
    pub decision: Countdown,
    /// Set while a destination call is outstanding.
    pub decision_pending: bool,
    /// Scientist vitals cooldown.
    pub vitals: Countdown,
    /// Remaining speech bubble time.
    pub speech: Countdown,
    /// Kill cooldown.
    pub kill: Countdown,
    /// Sabotage cooldown.
    pub sabotage: Countdown,
    /// Own-victim report lockout.
    pub self_report: Countdown,
    /// Time left inside a vent.
    pub vent: Countdown,
    /// Remaining disguise time.
    pub shapeshift: Countdown,
    /// Shapeshift cooldown.
    pub shapeshift_cooldown: Countdown,
    /// Remaining invisibility.
    pub phantom: Countdown,
    /// Phantom cooldown.
    pub phantom_cooldown: Countdown,
    /// Pause between impostor destination calls.
    pub destination_decision: Countdown,
}

impl TimerRegistry {
    /// Timers for a fresh agent at game start.
    pub const fn new(tuning: &Tuning) -> Self {
        Self {
            idle: Countdown::ZERO,
            task: Countdown::ZERO,
            wait: Countdown::ZERO,
            decision: Countdown::ZERO,
            decision_pending: false,
            vitals: Countdown::ZERO,
            speech: Countdown::ZERO,
            kill: Countdown::from_ms(tuning.impostor.round_kill_timer_ms),
            sabotage: Countdown::from_ms(tuning.impostor.sabotage_cooldown_ms),
            self_report: Countdown::ZERO,
            vent: Countdown::ZERO,
            shapeshift: Countdown::ZERO,
            shapeshift_cooldown: Countdown::ZERO,
            phantom: Countdown::ZERO,
            phantom_cooldown: Countdown::ZERO,
            destination_decision: Countdown::ZERO,
        }
    }

    /// Advance every countdown by `dt`.
    pub const fn tick(&mut self, dt: u64) {
        self.idle.tick(dt);
        self.task.tick(dt);
        self.wait.tick(dt);
        self.decision.tick(dt);
        self.vitals.tick(dt);
        self.speech.tick(dt);
        self.kill.tick(dt);
        self.sabotage.tick(dt);
        self.self_report.tick(dt);
        self.vent.tick(dt);
        self.shapeshift.tick(dt);
        self.shapeshift_cooldown.tick(dt);
        self.phantom.tick(dt);
        self.phantom_cooldown.tick(dt);
        self.destination_decision.tick(dt);
    }

    /// Start the decision-provider cooldown after issuing a call.
    pub fn start_decision_cooldown(&mut self, rng: &mut impl Rng, tuning: &Tuning) {
        self.decision.set(jittered(
            rng,
            tuning.agent.decision_cooldown_min_ms,
            tuning.agent.decision_cooldown_jitter_ms,
        ));
    }

    /// Reset the timers that do not survive a meeting.
    ///
    /// Ability cooldowns and the sabotage cooldown carry over.
    pub fn reset_for_round(&mut self, rng: &mut impl Rng, tuning: &Tuning) {
        self.idle.clear();
        self.task.clear();
        self.wait.clear();
        self.decision.set(jittered(
            rng,
            tuning.agent.round_decision_cooldown_min_ms,
            tuning.agent.round_decision_cooldown_jitter_ms,
        ));
        self.decision_pending = false;
        self.kill.set(tuning.impostor.round_kill_timer_ms);
        self.self_report.clear();
        self.vent.clear();
        self.destination_decision.clear();
    }
}
