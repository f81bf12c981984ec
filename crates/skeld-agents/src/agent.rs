//! The per-agent behavior machine.
//!
//! An [`Agent`] advances once per tick through [`Agent::update`]. It reads
//! the world through a [`TickContext`] (the map, a [`Presence`] for every
//! agent, the set of already reported bodies) and never touches another
//! agent directly. Anything that affects others (a report, a kill, a request
//! to the decision provider) is returned as an [`AgentEvent`] for the
//! orchestrator to apply.
//!
//! Role behavior dispatches on [`Role`]: crewmates run the task loop below,
//! impostors run the loop in [`crate::impostor`].

use std::collections::{BTreeSet, VecDeque};

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use skeld_types::{
    Activity, AgentId, AgentSnapshot, AgentState, Color, ExtraRole, Point, Role, RoomId,
    SabotageKind,
};
use skeld_world::ShipMap;
use tracing::{debug, info};

use crate::impostor::ImpostorKit;
use crate::memory::{Observation, SocialMemory, Witness};
use crate::personality::Personality;
use crate::task::{StepOutcome, TaskList};
use crate::timers::{TimerRegistry, jittered};
use crate::tuning::Tuning;

/// Player speed is given per 60 Hz frame; this converts it to per millisecond.
const FRAME_SCALE: f64 = 0.06;

/// Impostors controlled by a human walk slightly faster.
const IMPOSTOR_PLAYER_SPEED: f64 = 1.1;

// ---------------------------------------------------------------------------
// Context and events
// ---------------------------------------------------------------------------

/// Where a dead agent's body lies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Body {
    /// Position at death.
    pub position: Point,
    /// Game time of death.
    pub died_at: u64,
}

/// Read-only view of one agent, rebuilt by the orchestrator every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presence {
    /// True color.
    pub color: Color,
    /// Color others currently see (differs while shapeshifted).
    pub display_color: Color,
    /// Team.
    pub role: Role,
    /// Position.
    pub position: Point,
    /// Room at the current position, `None` in a corridor.
    pub room: Option<RoomId>,
    /// Last room the agent stood in.
    pub last_room: RoomId,
    /// Behavior state.
    pub state: AgentState,
    /// Whether the agent is alive.
    pub alive: bool,
    /// Whether the agent can be seen (not venting, not a phantom).
    pub visible: bool,
    /// Body, for dead agents that left one.
    pub body: Option<Body>,
}

/// Everything an agent may read during its update.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Game time in milliseconds.
    pub now: u64,
    /// Milliseconds since the previous tick.
    pub dt: u64,
    /// The ship.
    pub map: &'a ShipMap,
    /// Every agent, including the one being updated.
    pub roster: &'a [Presence],
    /// Victims whose bodies were already reported.
    pub reported: &'a BTreeSet<Color>,
    /// Behavior tuning.
    pub tuning: &'a Tuning,
    /// Whether the decision provider is connected.
    pub provider_connected: bool,
    /// Whether a sabotage is in progress.
    pub sabotage_active: bool,
    /// Color of the human-controlled agent, if any.
    pub player: Option<Color>,
}

impl<'a> TickContext<'a> {
    /// Presence of `color`.
    pub fn find(&self, color: Color) -> Option<&'a Presence> {
        self.roster.iter().find(|p| p.color == color)
    }

    /// Every presence except `me`.
    pub fn others(&self, me: Color) -> impl Iterator<Item = &'a Presence> + use<'a> {
        self.roster.iter().filter(move |p| p.color != me)
    }
}

/// Something an agent wants the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentEvent {
    /// Report the body of `victim`.
    ReportBody {
        /// Whose body.
        victim: Color,
    },
    /// Ask the decision provider where to go next.
    RequestDestination,
    /// Ask the decision provider whether to kill a borderline target.
    RequestKillDecision {
        /// Prospective victim.
        target: Color,
        /// Opportunity score in `[0, 1]`.
        score: f64,
    },
    /// Kill `victim` now.
    Kill {
        /// Victim.
        victim: Color,
    },
    /// Start a sabotage.
    StartSabotage(SabotageKind),
    /// Shapeshifted into `disguise`; observers grow suspicious of it.
    Shapeshifted {
        /// New display color.
        disguise: Color,
    },
    /// A crewmate finished a task step.
    TaskStepCompleted,
}

/// Social command issued from meeting chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SocialCommand {
    /// Stay close to the human agent.
    FollowPlayer,
    /// Stay close to another agent.
    FollowAgent(Color),
    /// Go to a room and stay there.
    Camp(RoomId),
}

/// One destination chosen by the decision provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecisionRecord {
    /// Room the agent was in.
    pub from: RoomId,
    /// Room it chose.
    pub to: RoomId,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// One crew member, bot or human-controlled.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Stable identifier.
    pub id: AgentId,
    /// Color, which is also the public name.
    pub color: Color,
    /// Team. Never changes.
    pub role: Role,
    /// Optional special ability.
    pub extra_role: Option<ExtraRole>,
    /// Driven by input instead of the behavior machine.
    pub is_player: bool,
    /// Alive or ghost.
    pub alive: bool,
    /// Position on the ship.
    pub position: Point,
    /// Behavior state.
    pub state: AgentState,
    /// Last room stood in.
    pub room: RoomId,
    /// Assigned tasks and progress.
    pub tasks: TaskList,
    /// Polyline being walked.
    pub path: Vec<Point>,
    /// Index of the next point on `path`.
    pub path_index: usize,
    /// Traits.
    pub personality: Personality,
    /// Social memory.
    pub memory: SocialMemory,
    /// Cooldowns and windows.
    pub timers: TimerRegistry,
    /// Body left at death.
    pub body: Option<Body>,
    /// Active social command.
    pub command: Option<SocialCommand>,
    /// Speech bubble text.
    pub speech: Option<String>,
    /// Whether the first move since the last reset has been made.
    pub first_move_done: bool,
    /// Recent provider-chosen destinations, oldest first.
    pub decisions: VecDeque<DecisionRecord>,
    /// Agent followed by a tracker.
    pub tracked: Option<Color>,
    /// Impostor-only state.
    pub impostor: Option<ImpostorKit>,
}

impl Agent {
    /// Create an agent standing at `position`.
    pub fn new(
        color: Color,
        role: Role,
        position: Point,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) -> Self {
        let impostor = match role {
            Role::Impostor => Some(ImpostorKit::new(&tuning.impostor, rng)),
            Role::Crewmate => None,
        };
        let mut agent = Self {
            id: AgentId::new(),
            color,
            role,
            extra_role: None,
            is_player: false,
            alive: true,
            position,
            state: AgentState::Idle,
            room: RoomId::Cafeteria,
            tasks: TaskList::default(),
            path: Vec::new(),
            path_index: 0,
            personality: Personality::roll(rng),
            memory: SocialMemory::new(),
            timers: TimerRegistry::new(tuning),
            body: None,
            command: None,
            speech: None,
            first_move_done: false,
            decisions: VecDeque::new(),
            tracked: None,
            impostor,
        };
        agent.enter_idle(tuning, rng);
        agent
    }

    /// Display name.
    pub const fn name(&self) -> &'static str {
        self.color.name()
    }

    /// Color others see.
    pub fn display_color(&self) -> Color {
        self.impostor
            .as_ref()
            .and_then(|kit| kit.disguise)
            .unwrap_or(self.color)
    }

    /// Whether others can see this agent.
    pub fn is_visible(&self) -> bool {
        self.alive
            && self
                .impostor
                .as_ref()
                .is_none_or(|kit| !kit.phantom && kit.vent.is_none())
    }

    /// Read-only view for other agents.
    pub fn presence(&self, map: &ShipMap) -> Presence {
        Presence {
            color: self.color,
            display_color: self.display_color(),
            role: self.role,
            position: self.position,
            room: map.room_at(self.position),
            last_room: self.room,
            state: self.state,
            alive: self.alive,
            visible: self.is_visible(),
            body: self.body,
        }
    }

    /// Renderer view.
    pub fn snapshot(&self, map: &ShipMap) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            color: self.color,
            display_color: self.display_color(),
            role: self.role,
            extra_role: self.extra_role,
            position: self.position,
            state: self.state,
            alive: self.alive,
            visible: self.is_visible(),
            is_player: self.is_player,
            room: map.room_at(self.position),
            speech: self.speech.clone(),
            tasks_done: self.tasks.completed_steps(),
            tasks_total: self.tasks.total_steps(),
        }
    }

    // -------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------

    /// Advance one tick and return the events raised.
    ///
    /// Dead agents are inert. The orchestrator does not call this during a
    /// meeting.
    pub fn update(&mut self, ctx: &TickContext<'_>, rng: &mut impl Rng) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        if !self.alive {
            return events;
        }

        self.timers.tick(ctx.dt);
        if self.timers.speech.is_ready() {
            self.speech = None;
        }
        if let Some(room) = ctx.map.room_at(self.position) {
            self.room = room;
        }
        self.perceive(ctx);

        if self.role == Role::Impostor {
            self.expire_abilities();
        }
        if self.is_player {
            return events;
        }

        match self.role {
            Role::Impostor => self.impostor_tick(ctx, rng, &mut events),
            Role::Crewmate => self.crew_tick(ctx, rng, &mut events),
        }
        events
    }

    fn crew_tick(
        &mut self,
        ctx: &TickContext<'_>,
        rng: &mut impl Rng,
        events: &mut Vec<AgentEvent>,
    ) {
        if self.extra_role == Some(ExtraRole::Detective) {
            self.memory
                .note_location(self.room, ctx.tuning.agent.detective_history);
        }

        self.follow_command(ctx, rng);

        match self.state {
            AgentState::Idle => self.crew_idle(ctx, rng, events),
            AgentState::Moving => self.walk(ctx.map, ctx.tuning, rng),
            AgentState::DoingTask => self.work_on_task(ctx.tuning, rng, events),
            AgentState::Waiting => self.wait_between_steps(ctx.tuning, rng),
            AgentState::Dead => {}
        }

        if let Some(report) = self.check_for_bodies(ctx) {
            events.push(report);
        }
    }

    /// Rebuild sightings and companions from everyone within vision.
    fn perceive(&mut self, ctx: &TickContext<'_>) {
        let radius = ctx.tuning.agent.vision_radius;
        let seen: Vec<Observation> = ctx
            .others(self.color)
            .filter(|p| p.alive && p.visible)
            .filter(|p| p.position.distance(self.position) < radius)
            .map(|p| Observation {
                color: p.display_color,
                room: p.last_room,
                activity: Activity::from_state(p.state),
            })
            .collect();
        self.memory.observe(ctx.now, &seen, &ctx.tuning.agent);
    }

    // -------------------------------------------------------------------
    // Social commands
    // -------------------------------------------------------------------

    fn follow_command(&mut self, ctx: &TickContext<'_>, rng: &mut impl Rng) {
        let Some(command) = self.command else {
            return;
        };
        let t = &ctx.tuning.agent;
        let target = match command {
            SocialCommand::FollowPlayer => ctx.player.and_then(|c| ctx.find(c)),
            SocialCommand::FollowAgent(color) => ctx.find(color),
            SocialCommand::Camp(room) => {
                self.camp(room, ctx, rng);
                return;
            }
        };
        let Some(target) = target.filter(|p| p.alive) else {
            return;
        };

        let dist = target.position.distance(self.position);
        let stale = self.state != AgentState::Moving || rng.random::<f64>() < t.follow_repath_chance;
        if dist > t.follow_far || (dist > t.follow_near && stale) {
            self.navigate_to_point(target.position, ctx.map);
        }
        if dist < t.follow_stop && self.state == AgentState::Moving && self.on_last_leg() {
            self.stop();
        }
    }

    fn camp(&mut self, room: RoomId, ctx: &TickContext<'_>, rng: &mut impl Rng) {
        if ctx.map.room_at(self.position) == Some(room) {
            if self.state == AgentState::Moving && self.on_last_leg() {
                self.stop();
            }
            return;
        }
        if self.state != AgentState::Moving
            || rng.random::<f64>() < ctx.tuning.agent.follow_repath_chance
        {
            self.navigate_to_room(room, ctx.map, ctx.tuning, rng);
        }
    }

    fn on_last_leg(&self) -> bool {
        self.path_index.saturating_add(1) >= self.path.len()
    }

    fn stop(&mut self) {
        self.state = AgentState::Idle;
        self.path.clear();
        self.path_index = 0;
    }

    // -------------------------------------------------------------------
    // Idle: destination selection
    // -------------------------------------------------------------------

    /// Enter `Idle` with a fresh idle window.
    pub fn enter_idle(&mut self, tuning: &Tuning, rng: &mut impl Rng) {
        self.state = AgentState::Idle;
        let (min, jitter) = match self.role {
            Role::Crewmate => (tuning.agent.idle_min_ms, tuning.agent.idle_jitter_ms),
            Role::Impostor => (tuning.impostor.idle_min_ms, tuning.impostor.idle_jitter_ms),
        };
        self.timers.idle.set(jittered(rng, min, jitter));
    }

    fn crew_idle(
        &mut self,
        ctx: &TickContext<'_>,
        rng: &mut impl Rng,
        events: &mut Vec<AgentEvent>,
    ) {
        if !self.timers.idle.is_ready() {
            return;
        }
        self.enter_idle(ctx.tuning, rng);

        match self.command {
            Some(SocialCommand::FollowPlayer | SocialCommand::FollowAgent(_)) => return,
            Some(SocialCommand::Camp(room)) => {
                self.navigate_to_room(room, ctx.map, ctx.tuning, rng);
                return;
            }
            None => {}
        }

        if self.extra_role == Some(ExtraRole::Scientist) && self.timers.vitals.is_ready() {
            self.check_vitals(ctx, rng);
        }

        if !self.first_move_done {
            self.first_move_done = true;
            self.go_to_task_or_wander(ctx.map, ctx.tuning, rng);
            return;
        }

        if ctx.provider_connected
            && self.timers.decision.is_ready()
            && !self.timers.decision_pending
        {
            events.push(AgentEvent::RequestDestination);
        } else {
            self.go_to_task_or_wander(ctx.map, ctx.tuning, rng);
        }
    }

    fn check_vitals(&mut self, ctx: &TickContext<'_>, rng: &mut impl Rng) {
        self.timers.vitals.set(ctx.tuning.agent.vitals_cooldown_ms);
        let unreported = ctx
            .others(self.color)
            .any(|p| p.body.is_some() && !ctx.reported.contains(&p.color));
        if unreported {
            info!(agent = %self.color, "scientist senses a death");
            self.say("I sense someone is dead...", ctx.tuning);
            self.wander(ctx.map, ctx.tuning, rng);
        }
    }

    /// Walk to the current task room, or anywhere once tasks are done.
    pub fn go_to_task_or_wander(&mut self, map: &ShipMap, tuning: &Tuning, rng: &mut impl Rng) {
        match self.tasks.current() {
            Some(step) => {
                self.navigate_to_room(step.room, map, tuning, rng);
            }
            None => self.wander(map, tuning, rng),
        }
    }

    /// Apply a destination call's outcome.
    ///
    /// `Some(room)` is recorded and followed; `None` (failure or an
    /// unrecognized reply) falls back to the task-or-wander policy. Impostors
    /// ignore a room they are already in and do nothing on failure.
    pub fn apply_destination(
        &mut self,
        room: Option<RoomId>,
        map: &ShipMap,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) {
        self.timers.decision_pending = false;
        match (self.role, room) {
            (Role::Impostor, Some(room)) if room != self.room => {
                debug!(agent = %self.color, room = %room, "impostor follows provider destination");
                self.navigate_to_room(room, map, tuning, rng);
            }
            (Role::Impostor, _) => {}
            (Role::Crewmate, Some(room)) => {
                debug!(agent = %self.color, from = %self.room, room = %room, "provider destination");
                self.decisions.push_back(DecisionRecord {
                    from: self.room,
                    to: room,
                });
                while self.decisions.len() > tuning.agent.decision_history_cap {
                    self.decisions.pop_front();
                }
                self.navigate_to_room(room, map, tuning, rng);
            }
            (Role::Crewmate, None) => self.go_to_task_or_wander(map, tuning, rng),
        }
    }

    /// Mark a provider call as in flight and start the call cooldown.
    pub fn begin_decision(&mut self, tuning: &Tuning, rng: &mut impl Rng) {
        self.timers.decision_pending = true;
        self.timers.start_decision_cooldown(rng, tuning);
    }

    // -------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------

    /// Path to a random point near a room center. Returns whether a path was
    /// found; on failure the agent keeps its state.
    pub fn navigate_to_room(
        &mut self,
        room: RoomId,
        map: &ShipMap,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) -> bool {
        let Some(target) = map.random_point_near_center(room, tuning.agent.room_jitter, rng) else {
            self.wander(map, tuning, rng);
            return self.state == AgentState::Moving;
        };
        self.navigate_to_point(target, map)
    }

    /// Path to an arbitrary point. Returns whether a path was found.
    pub fn navigate_to_point(&mut self, target: Point, map: &ShipMap) -> bool {
        match map.find_path_between_points(self.position, target) {
            Some(path) if !path.is_empty() => {
                self.path = path;
                self.path_index = 0;
                self.state = AgentState::Moving;
                true
            }
            _ => {
                debug!(agent = %self.color, "no path, staying put");
                false
            }
        }
    }

    /// Head for a uniformly random room.
    pub fn wander(&mut self, map: &ShipMap, tuning: &Tuning, rng: &mut impl Rng) {
        if let Some(room) = map.room_ids().choose(rng).copied() {
            self.navigate_to_room(room, map, tuning, rng);
        }
    }

    /// Step along the path. Bots only need the next position to be walkable.
    pub(crate) fn walk(&mut self, map: &ShipMap, tuning: &Tuning, rng: &mut impl Rng) {
        let Some(target) = self.path.get(self.path_index).copied() else {
            self.enter_idle(tuning, rng);
            self.arrive(tuning, rng);
            return;
        };

        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let dist = dx.hypot(dy);
        if dist < tuning.agent.arrival_distance {
            self.path_index = self.path_index.saturating_add(1);
            return;
        }

        let step_x = dx / dist * tuning.agent.speed;
        let step_y = dy / dist * tuning.agent.speed;
        let both = self.position.offset(step_x, step_y);
        let only_x = self.position.offset(step_x, 0.0);
        let only_y = self.position.offset(0.0, step_y);

        if map.is_walkable(both) {
            self.position = both;
        } else if map.is_walkable(only_x) {
            self.position = only_x;
        } else if map.is_walkable(only_y) {
            self.position = only_y;
        } else {
            self.stop();
        }
    }

    /// Path exhausted: start the task if this is its room.
    fn arrive(&mut self, tuning: &Tuning, rng: &mut impl Rng) {
        let faking = self.impostor.as_ref().is_some_and(|kit| kit.faking_task);
        if self.role == Role::Impostor && !faking {
            return;
        }
        if let Some(step) = self.tasks.current()
            && step.room == self.room
        {
            self.state = AgentState::DoingTask;
            self.timers.task.set(step.task.duration_ms);
            return;
        }
        if let Some(kit) = self.impostor.as_mut() {
            kit.faking_task = false;
        }
        self.enter_idle(tuning, rng);
    }

    // -------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------

    fn work_on_task(
        &mut self,
        tuning: &Tuning,
        rng: &mut impl Rng,
        events: &mut Vec<AgentEvent>,
    ) {
        if !self.timers.task.is_ready() {
            return;
        }
        match self.tasks.complete_step() {
            Some(StepOutcome::Wait(ms)) => {
                events.push(AgentEvent::TaskStepCompleted);
                self.state = AgentState::Waiting;
                self.timers.wait.set(ms);
            }
            Some(StepOutcome::Continue) => {
                events.push(AgentEvent::TaskStepCompleted);
                self.enter_idle(tuning, rng);
            }
            None => self.enter_idle(tuning, rng),
        }
    }

    pub(crate) fn wait_between_steps(&mut self, tuning: &Tuning, rng: &mut impl Rng) {
        if self.timers.wait.is_ready() {
            self.enter_idle(tuning, rng);
        }
    }

    // -------------------------------------------------------------------
    // Bodies and witnessing
    // -------------------------------------------------------------------

    /// Look for a body to report.
    ///
    /// A witnessed kill is reported first, from within the witness report
    /// radius. Otherwise any visible body older than the detection delay is
    /// recorded and reported. Impostors hold back on their own victims while
    /// the self-report lockout runs.
    pub(crate) fn check_for_bodies(&mut self, ctx: &TickContext<'_>) -> Option<AgentEvent> {
        let t = &ctx.tuning.agent;

        if let Some(Witness::SawKill { victim, .. }) = self.memory.witness()
            && !ctx.reported.contains(&victim)
            && let Some(body) = ctx.find(victim).and_then(|p| p.body)
            && body.position.distance(self.position) < t.witness_report_radius
        {
            return Some(AgentEvent::ReportBody { victim });
        }

        for other in ctx.others(self.color) {
            let Some(body) = other.body else {
                continue;
            };
            if other.alive || ctx.now.saturating_sub(body.died_at) < t.body_detection_delay_ms {
                continue;
            }
            if body.position.distance(self.position) >= t.vision_radius
                || ctx.reported.contains(&other.color)
            {
                continue;
            }

            self.memory.record_witness(Witness::SawBody {
                victim: other.color,
                room: ctx.map.room_at(body.position),
            });

            let own_kill = self
                .impostor
                .as_ref()
                .is_some_and(|kit| kit.killed(other.color));
            if own_kill && !self.timers.self_report.is_ready() {
                continue;
            }
            return Some(AgentEvent::ReportBody {
                victim: other.color,
            });
        }
        None
    }

    /// Saw `killer` strike `victim`; crewmates rush to the body.
    pub fn witness_kill(&mut self, killer: Color, victim: Color, body: Point, map: &ShipMap) {
        if self.role == Role::Impostor {
            return;
        }
        self.memory.record_witness(Witness::SawKill {
            killer,
            victim,
            room: self.room,
        });
        if !self.is_player {
            self.navigate_to_point(body, map);
        }
    }

    /// Saw `victim` die in a crowd without seeing the killer.
    pub fn witness_stack_kill(&mut self, victim: Color, room: RoomId) {
        if self.role == Role::Impostor {
            return;
        }
        self.memory
            .record_witness(Witness::SawStackKill { victim, room });
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Die where standing and leave a body.
    pub fn die(&mut self, now: u64) {
        self.alive = false;
        self.state = AgentState::Dead;
        self.body = Some(Body {
            position: self.position,
            died_at: now,
        });
        self.path.clear();
        self.command = None;
        self.speech = None;
    }

    /// Die without a body (ejection).
    pub fn eject(&mut self) {
        self.alive = false;
        self.state = AgentState::Dead;
        self.body = None;
        self.path.clear();
        self.command = None;
        self.speech = None;
    }

    /// Show a speech bubble.
    pub fn say(&mut self, text: impl Into<String>, tuning: &Tuning) {
        self.speech = Some(text.into());
        self.timers.speech.set(tuning.agent.speech_ms);
    }

    /// Capture the alibi used in the coming meeting.
    pub fn snapshot_alibi(&mut self, now: u64, tuning: &Tuning) {
        self.memory.snapshot_alibi(now, self.room, &tuning.agent);
    }

    /// Prepare for the next round after a meeting.
    ///
    /// Alive agents regroup near the Cafeteria center with a clean slate;
    /// dead agents lose their body. `alive_others` feeds the tracker's pick.
    pub fn reset_for_round(
        &mut self,
        map: &ShipMap,
        alive_others: &[Color],
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) {
        if !self.alive {
            self.body = None;
            return;
        }

        self.timers.reset_for_round(rng, tuning);
        self.enter_idle(tuning, rng);
        self.path.clear();
        self.path_index = 0;
        self.memory.reset_for_round();
        self.command = None;
        self.first_move_done = false;

        if let Some(center) = map.room_center(RoomId::Cafeteria) {
            let a = &tuning.agent;
            let dx = (rng.random::<f64>() - 0.5) * 2.0 * a.spawn_spread_x;
            let dy = (rng.random::<f64>() - 0.5) * 2.0 * a.spawn_spread_y;
            self.position = center.offset(dx, dy);
            self.room = RoomId::Cafeteria;
        }

        if self.extra_role == Some(ExtraRole::Tracker)
            && let Some(target) = alive_others.choose(rng)
        {
            info!(agent = %self.color, target = %target, "tracker picks a target");
            self.tracked = Some(*target);
        }

        if let Some(kit) = self.impostor.as_mut() {
            kit.reset_for_round();
        }
    }

    // -------------------------------------------------------------------
    // Human control
    // -------------------------------------------------------------------

    /// Move the human agent one tick along `(dx, dy)`, each in `-1..=1`.
    ///
    /// The next position must be walkable and clear of walls.
    pub fn move_player(&mut self, dx: i8, dy: i8, dt: u64, map: &ShipMap, tuning: &Tuning) {
        if !self.alive || self.impostor.as_ref().is_some_and(|k| k.vent.is_some()) {
            return;
        }
        if dx == 0 && dy == 0 {
            if self.state == AgentState::Moving {
                self.state = AgentState::Idle;
            }
            return;
        }
        let fx = f64::from(dx.signum());
        let fy = f64::from(dy.signum());
        let len = fx.hypot(fy);
        let boost = if self.role == Role::Impostor {
            IMPOSTOR_PLAYER_SPEED
        } else {
            1.0
        };
        let dt_ms = f64::from(u32::try_from(dt).unwrap_or(u32::MAX));
        let step = tuning.agent.speed * boost * dt_ms * FRAME_SCALE;
        let next = self.position.offset(fx / len * step, fy / len * step);

        if map.is_walkable(next) && !map.collides_with_wall(next, tuning.agent.wall_radius) {
            self.position = next;
            if let Some(room) = map.room_at(next) {
                self.room = room;
            }
        }
        self.state = AgentState::Moving;
    }
}
