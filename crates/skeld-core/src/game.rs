//! Game orchestrator: the phase machine that drives the whole simulation.
//!
//! [`Game`] owns the roster, the ship, the meeting engine and the decision
//! provider. Global phases run `lobby → starting → playing ⇄ meeting →
//! gameover`. Each `playing` tick runs these steps in order:
//!
//! 1. **Timers** -- meeting cooldown, sabotage, viper bodies, noisemaker
//!    alert.
//! 2. **Human** -- move the human agent along the current intent.
//! 3. **Replies** -- poll outstanding decision calls; apply the ones still
//!    current, discard the stale ones.
//! 4. **Agents** -- tick every agent and route the events it raises (kills,
//!    reports, sabotage, decision requests). A report stops the pass.
//! 5. **Emergency** -- a crewmate bot in the Cafeteria may press the button.
//! 6. **Win check** -- impostors gone, parity, or every task done.
//!
//! During `meeting` only the [`MeetingEngine`] runs. All randomness comes
//! from one seeded [`StdRng`], so the same seed and an offline provider give
//! the same game.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use skeld_agents::{
    Agent, AgentEvent, Countdown, Presence, TaskList, TickContext, Tuning, assign_tasks,
    knowledge_summary,
};
use skeld_types::{
    AgentState, BodySnapshot, Color, ExtraRole, GamePhase, GameSnapshot, KillFeedEntry,
    MeetingKind, Point, Role, RoomId, SabotageKind, Vote, Winner,
};
use skeld_world::{Area, ShipMap, WorldError, build_skeld};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, GameConfig};
use crate::decision::{
    DecisionError, DecisionKind, DecisionProvider, DecisionRequest, InFlight, KillChoice,
    KillContext, OfflineProvider, ReplyPoll, RoomContext, interpret_kill, interpret_room,
};
use crate::dialogue::MeetingBrief;
use crate::history::MeetingHistory;
use crate::meeting::{MeetingCtx, MeetingEngine, MeetingOutcome, MeetingStep};

/// Horizontal radius of the starting circle around the Cafeteria center.
const SPAWN_RADIUS_X: f64 = 80.0;

/// Vertical radius of the starting circle.
const SPAWN_RADIUS_Y: f64 = 50.0;

/// Suspicion entries sent with a destination call.
const PROMPT_SUSPECTS: usize = 3;

/// Errors that can occur while setting up a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The configuration failed validation.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The map could not be built.
    #[error("map error: {source}")]
    World {
        /// The underlying map error.
        #[from]
        source: WorldError,
    },

    /// The roster cannot be built from the configuration.
    #[error("roster error: {message}")]
    Roster {
        /// Description of the problem.
        message: String,
    },
}

#[derive(Debug, Clone, Copy)]
struct ActiveSabotage {
    kind: SabotageKind,
    remaining: Countdown,
}

#[derive(Debug, Clone, Copy)]
struct NoiseAlert {
    body: Point,
    remaining: Countdown,
}

/// One game session.
pub struct Game {
    config: GameConfig,
    tuning: Tuning,
    map: ShipMap,
    agents: Vec<Agent>,
    phase: GamePhase,
    meeting: MeetingEngine,
    provider: Box<dyn DecisionProvider>,
    rng: StdRng,
    in_flight: BTreeMap<Color, InFlight>,
    epoch: u64,
    elapsed: u64,
    start_timer: Countdown,
    meeting_cooldown: Countdown,
    emergency_left: u32,
    reported: BTreeSet<Color>,
    stack_victims: BTreeSet<Color>,
    kill_feed: Vec<KillFeedEntry>,
    sabotage: Option<ActiveSabotage>,
    body_timers: BTreeMap<Color, Countdown>,
    alert: Option<NoiseAlert>,
    tasks_total: u32,
    winner: Option<Winner>,
    reason: Option<String>,
    player: Option<Color>,
    intent: (i8, i8),
}

impl Game {
    /// A game on the built-in Skeld map, waiting in the lobby.
    ///
    /// When `decision.enabled` is off the provider is replaced by
    /// [`OfflineProvider`].
    pub fn new(config: GameConfig, provider: Box<dyn DecisionProvider>) -> Result<Self, GameError> {
        let map = build_skeld()?;
        Self::with_map(config, map, provider)
    }

    /// A game on a custom map, waiting in the lobby.
    pub fn with_map(
        config: GameConfig,
        map: ShipMap,
        provider: Box<dyn DecisionProvider>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        if let Some(color) = config.game.player_color
            && !Color::ALL
                .iter()
                .take(config.game.agent_count())
                .any(|c| *c == color)
        {
            return Err(GameError::Roster {
                message: format!("player color {color} is not in the roster"),
            });
        }
        let provider: Box<dyn DecisionProvider> = if config.decision.enabled {
            provider
        } else {
            Box::new(OfflineProvider::new())
        };
        info!(
            seed = config.game.seed,
            agents = config.game.agent_count(),
            impostors = config.game.impostor_count(),
            provider = provider.name(),
            "game created"
        );
        Ok(Self {
            tuning: config.tuning(),
            rng: StdRng::seed_from_u64(config.game.seed),
            emergency_left: config.meeting.emergency_meetings,
            config,
            map,
            agents: Vec::new(),
            phase: GamePhase::Lobby,
            meeting: MeetingEngine::new(),
            provider,
            in_flight: BTreeMap::new(),
            epoch: 0,
            elapsed: 0,
            start_timer: Countdown::ZERO,
            meeting_cooldown: Countdown::ZERO,
            reported: BTreeSet::new(),
            stack_victims: BTreeSet::new(),
            kill_feed: Vec::new(),
            sabotage: None,
            body_timers: BTreeMap::new(),
            alert: None,
            tasks_total: 0,
            winner: None,
            reason: None,
            player: None,
            intent: (0, 0),
        })
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Global phase.
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    /// The roster, living and dead.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Direct roster access for scenario setup.
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Look up an agent by color.
    pub fn agent(&self, color: Color) -> Option<&Agent> {
        self.agents.iter().find(|a| a.color == color)
    }

    /// The ship.
    pub const fn map(&self) -> &ShipMap {
        &self.map
    }

    /// Active configuration.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The meeting engine.
    pub const fn meeting(&self) -> &MeetingEngine {
        &self.meeting
    }

    /// Cross-meeting memory.
    pub const fn history(&self) -> &MeetingHistory {
        self.meeting.history()
    }

    /// Elapsed play time in milliseconds.
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed
    }

    /// Winning team once the game is over.
    pub const fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// Why the game ended.
    pub fn game_over_reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Color of the human agent.
    pub const fn player(&self) -> Option<Color> {
        self.player
    }

    /// Active sabotage.
    pub fn sabotage(&self) -> Option<SabotageKind> {
        self.sabotage.map(|s| s.kind)
    }

    /// Emergency meetings still available.
    pub const fn emergency_meetings_left(&self) -> u32 {
        self.emergency_left
    }

    /// Kills so far, oldest first.
    pub fn kill_feed(&self) -> &[KillFeedEntry] {
        &self.kill_feed
    }

    /// Bodies that have been reported since the last meeting.
    pub const fn reported(&self) -> &BTreeSet<Color> {
        &self.reported
    }

    /// Crew task completion in `[0, 1]`.
    pub fn task_bar(&self) -> f64 {
        if self.tasks_total == 0 {
            return 0.0;
        }
        let done: u32 = self
            .agents
            .iter()
            .filter(|a| a.role == Role::Crewmate)
            .map(|a| a.tasks.completed_steps())
            .fold(0, u32::saturating_add);
        (f64::from(done) / f64::from(self.tasks_total)).min(1.0)
    }

    fn alive_count(&self, role: Role) -> usize {
        self.agents.iter().filter(|a| a.alive && a.role == role).count()
    }

    fn index_of(&self, color: Color) -> Option<usize> {
        self.agents.iter().position(|a| a.color == color)
    }

    fn roster(&self) -> Vec<Presence> {
        self.agents.iter().map(|a| a.presence(&self.map)).collect()
    }

    fn provider_connected(&self) -> bool {
        self.provider.is_connected()
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Build the roster and begin the start countdown. Lobby only.
    pub fn start(&mut self) -> bool {
        if self.phase != GamePhase::Lobby {
            debug!(phase = %self.phase, "start ignored");
            return false;
        }
        self.build_roster();
        self.phase = GamePhase::Starting;
        self.start_timer.set(self.config.timing.start_delay_ms);
        info!(phase = %self.phase, delay_ms = self.config.timing.start_delay_ms, "game starting");
        true
    }

    /// Throw everything away, history included, and start again.
    pub fn restart(&mut self) -> bool {
        self.agents.clear();
        self.meeting.reset();
        self.in_flight.clear();
        self.epoch = self.epoch.saturating_add(1);
        self.elapsed = 0;
        self.meeting_cooldown.clear();
        self.emergency_left = self.config.meeting.emergency_meetings;
        self.reported.clear();
        self.stack_victims.clear();
        self.kill_feed.clear();
        self.sabotage = None;
        self.body_timers.clear();
        self.alert = None;
        self.tasks_total = 0;
        self.winner = None;
        self.reason = None;
        self.player = None;
        self.intent = (0, 0);
        self.phase = GamePhase::Lobby;
        info!("game restarted");
        self.start()
    }

    fn build_roster(&mut self) {
        let g = &self.config.game;
        let n = g.agent_count();
        let colors: Vec<Color> = Color::ALL.iter().copied().take(n).collect();
        let rng = &mut self.rng;

        let player = match (g.player_color, g.player_role) {
            (Some(color), _) => colors.iter().position(|c| *c == color),
            (None, Some(_)) => Some(rng.random_range(0..n)),
            (None, None) => None,
        };

        let mut impostors: BTreeSet<usize> = BTreeSet::new();
        if g.player_role == Some(Role::Impostor)
            && let Some(p) = player
        {
            impostors.insert(p);
        }
        let mut pool: Vec<usize> = (0..n)
            .filter(|i| g.player_role.is_none() || Some(*i) != player)
            .collect();
        pool.shuffle(rng);
        for i in pool {
            if impostors.len() >= g.impostor_count() {
                break;
            }
            impostors.insert(i);
        }

        let center = self.map.room_center(RoomId::Cafeteria).unwrap_or_else(|| {
            Point::new(self.map.width() / 2.0, self.map.height() / 2.0)
        });
        let count = f64::from(u32::try_from(n).unwrap_or(u32::MAX).max(1));
        let mut held: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut agents = Vec::with_capacity(n);
        for (i, color) in colors.into_iter().enumerate() {
            let role = if impostors.contains(&i) {
                Role::Impostor
            } else {
                Role::Crewmate
            };
            let angle = TAU * f64::from(u32::try_from(i).unwrap_or(0)) / count;
            let position = center.offset(angle.cos() * SPAWN_RADIUS_X, angle.sin() * SPAWN_RADIUS_Y);
            let mut agent = Agent::new(color, role, position, &self.tuning, rng);

            let tasks = assign_tasks(&held, rng);
            for task in &tasks {
                let entry = held.entry(task.id).or_insert(0);
                *entry = entry.saturating_add(1);
            }
            agent.tasks = TaskList::new(tasks);
            agent.is_player = Some(i) == player;
            agents.push(agent);
        }

        if g.extra_roles {
            assign_extra_roles(&mut agents, g.crew_extra_roles(), rng);
            if let Some(forced) = g.forced_extra_role
                && let Some(human) = player.and_then(|p| agents.get_mut(p))
                && forced.team() == human.role
            {
                human.extra_role = Some(forced);
            }
        }

        let colors: Vec<Color> = agents.iter().map(|a| a.color).collect();
        for agent in &mut agents {
            if agent.extra_role == Some(ExtraRole::Tracker) {
                let others: Vec<Color> = colors.iter().copied().filter(|c| *c != agent.color).collect();
                agent.tracked = others.choose(rng).copied();
            }
            info!(
                agent = %agent.color,
                role = %agent.role,
                extra_role = ?agent.extra_role,
                player = agent.is_player,
                "agent joined"
            );
        }

        self.tasks_total = agents
            .iter()
            .filter(|a| a.role == Role::Crewmate)
            .map(|a| a.tasks.total_steps())
            .fold(0, u32::saturating_add);
        self.player = player.and_then(|p| agents.get(p)).map(|a| a.color);
        self.agents = agents;
    }

    fn begin_play(&mut self) {
        self.phase = GamePhase::Playing;
        self.meeting_cooldown.set(self.config.meeting.cooldown_ms);
        info!(phase = %self.phase, tasks = self.tasks_total, "game on");
    }

    /// Advance the game by `dt` milliseconds, clamped to the max delta.
    pub fn update(&mut self, dt: u64) {
        let dt = dt.min(self.config.timing.max_delta_ms);
        match self.phase {
            GamePhase::Lobby | GamePhase::GameOver => {}
            GamePhase::Starting => {
                self.start_timer.tick(dt);
                if self.start_timer.is_ready() {
                    self.begin_play();
                }
            }
            GamePhase::Playing => {
                self.elapsed = self.elapsed.saturating_add(dt);
                self.tick_playing(dt);
            }
            GamePhase::Meeting => {
                self.elapsed = self.elapsed.saturating_add(dt);
                self.tick_meeting(dt);
            }
        }
    }

    fn end_game(&mut self, winner: Winner, reason: &str) {
        self.phase = GamePhase::GameOver;
        self.winner = Some(winner);
        self.reason = Some(reason.to_owned());
        self.in_flight.clear();
        info!(winner = ?winner, reason, elapsed_ms = self.elapsed, "game over");
    }

    /// Evaluate the win conditions. Returns whether the game ended.
    ///
    /// No impostor alive is checked first, then parity, then tasks.
    pub fn check_win(&mut self) -> bool {
        if !matches!(self.phase, GamePhase::Playing | GamePhase::Meeting) {
            return false;
        }
        let impostors = self.alive_count(Role::Impostor);
        let crew = self.alive_count(Role::Crewmate);
        if impostors == 0 {
            self.end_game(Winner::Crewmates, "Crewmates Win! All impostors were found!");
            return true;
        }
        if impostors >= crew {
            self.end_game(Winner::Impostors, "Impostors Win! They outnumber the crew!");
            return true;
        }
        if self.tasks_total > 0 && self.task_bar() >= 1.0 {
            self.end_game(Winner::Crewmates, "Crewmates Win! All tasks completed!");
            return true;
        }
        false
    }

    // -------------------------------------------------------------------
    // Playing
    // -------------------------------------------------------------------

    fn tick_playing(&mut self, dt: u64) {
        self.tick_timers(dt);
        self.move_player(dt);
        self.poll_decisions();

        let connected = self.provider_connected();
        for i in 0..self.agents.len() {
            if self.phase != GamePhase::Playing {
                return;
            }
            let roster = self.roster();
            let events = {
                let ctx = TickContext {
                    now: self.elapsed,
                    dt,
                    map: &self.map,
                    roster: &roster,
                    reported: &self.reported,
                    tuning: &self.tuning,
                    provider_connected: connected,
                    sabotage_active: self.sabotage.is_some(),
                    player: self.player,
                };
                let Some(agent) = self.agents.get_mut(i) else {
                    continue;
                };
                agent.update(&ctx, &mut self.rng)
            };
            for event in events {
                if self.phase != GamePhase::Playing {
                    break;
                }
                self.handle_event(i, event);
            }
        }

        if self.phase != GamePhase::Playing {
            return;
        }
        self.maybe_press_emergency();
        if self.phase == GamePhase::Playing {
            self.check_win();
        }
    }

    fn tick_timers(&mut self, dt: u64) {
        self.meeting_cooldown.tick(dt);

        if let Some(sabotage) = self.sabotage.as_mut() {
            sabotage.remaining.tick(dt);
            if sabotage.remaining.is_ready() {
                info!(sabotage = ?sabotage.kind, "sabotage resolved");
                self.sabotage = None;
            }
        }

        let mut dissolved = Vec::new();
        for (victim, timer) in &mut self.body_timers {
            timer.tick(dt);
            if timer.is_ready() {
                dissolved.push(*victim);
            }
        }
        for victim in dissolved {
            self.body_timers.remove(&victim);
            if let Some(agent) = self.agents.iter_mut().find(|a| a.color == victim) {
                agent.body = None;
                info!(victim = %victim, "body dissolved");
            }
        }

        if let Some(alert) = self.alert.as_mut() {
            alert.remaining.tick(dt);
            if alert.remaining.is_ready() {
                self.alert = None;
            } else {
                let body = alert.body;
                for agent in self.agents.iter_mut().filter(|a| {
                    a.alive && !a.is_player && a.role == Role::Crewmate && a.state == AgentState::Idle
                }) {
                    agent.navigate_to_point(body, &self.map);
                }
            }
        }
    }

    fn move_player(&mut self, dt: u64) {
        let (dx, dy) = self.intent;
        let Some(color) = self.player else {
            return;
        };
        if let Some(agent) = self.agents.iter_mut().find(|a| a.color == color) {
            agent.move_player(dx, dy, dt, &self.map, &self.tuning);
        }
    }

    fn handle_event(&mut self, index: usize, event: AgentEvent) {
        let Some(color) = self.agents.get(index).map(|a| a.color) else {
            return;
        };
        match event {
            AgentEvent::ReportBody { victim } => {
                self.report_body(color, victim);
            }
            AgentEvent::RequestDestination => self.request_destination(index),
            AgentEvent::RequestKillDecision { target, score } => {
                self.request_kill_decision(index, target, score);
            }
            AgentEvent::Kill { victim } => {
                let range = self.tuning.impostor.kill_range;
                self.execute_kill(color, victim, range);
            }
            AgentEvent::StartSabotage(kind) => self.start_sabotage(color, kind),
            AgentEvent::Shapeshifted { disguise } => self.on_shapeshift(color, disguise),
            AgentEvent::TaskStepCompleted => {
                debug!(agent = %color, bar = self.task_bar(), "task step completed");
            }
        }
    }

    fn start_sabotage(&mut self, by: Color, kind: SabotageKind) {
        if self.sabotage.is_some() {
            return;
        }
        self.sabotage = Some(ActiveSabotage {
            kind,
            remaining: Countdown::from_ms(self.config.rules.sabotage_duration_ms),
        });
        info!(agent = %by, sabotage = ?kind, room = %kind.repair_room(), "sabotage started");
        let chance = self.config.rules.sabotage_route_chance;
        for agent in &mut self.agents {
            if agent.alive && !agent.is_player && agent.role == Role::Crewmate && self.rng.random::<f64>() < chance {
                agent.navigate_to_room(kind.repair_room(), &self.map, &self.tuning, &mut self.rng);
            }
        }
    }

    fn on_shapeshift(&mut self, shifter: Color, disguise: Color) {
        let Some(origin) = self.agent(shifter).map(|a| a.position) else {
            return;
        };
        let radius = self.tuning.agent.vision_radius;
        let amount = self.tuning.impostor.shapeshift_suspicion;
        for agent in &mut self.agents {
            if agent.color != shifter && agent.alive && agent.position.distance(origin) < radius {
                agent.memory.add_suspicion(disguise, amount);
            }
        }
        info!(agent = %shifter, disguise = %disguise, "shapeshift");
    }

    // -------------------------------------------------------------------
    // Decision calls
    // -------------------------------------------------------------------

    /// Free the agent's slot if it holds a call from an older state.
    fn slot_free(&mut self, color: Color) -> bool {
        let Some(slot) = self.in_flight.get(&color) else {
            return true;
        };
        if slot.is_current(self.epoch, self.meeting.number(), self.phase) {
            return false;
        }
        debug!(agent = %color, kind = slot.kind.as_str(), "replacing stale decision slot");
        self.in_flight.remove(&color);
        true
    }

    fn issue(&mut self, index: usize, kind: DecisionKind, target: Option<Color>, request: DecisionRequest) {
        let Some(agent) = self.agents.get_mut(index) else {
            return;
        };
        let reply = self.provider.request(request);
        agent.begin_decision(&self.tuning, &mut self.rng);
        debug!(agent = %agent.color, kind = kind.as_str(), "decision call issued");
        self.in_flight.insert(
            agent.color,
            InFlight {
                kind,
                epoch: self.epoch,
                meeting: self.meeting.number(),
                phase: self.phase,
                target,
                reply,
            },
        );
    }

    fn request_destination(&mut self, index: usize) {
        let Some(color) = self.agents.get(index).map(|a| a.color) else {
            return;
        };
        if !self.slot_free(color) {
            if let Some(agent) = self.agents.get_mut(index) {
                agent.go_to_task_or_wander(&self.map, &self.tuning, &mut self.rng);
            }
            return;
        }
        let Some(request) = self.room_request(index) else {
            return;
        };
        self.issue(index, DecisionKind::Room, None, request);
    }

    fn room_request(&mut self, index: usize) -> Option<DecisionRequest> {
        let roster = self.roster();
        let agent = self.agents.get(index)?;
        let vision = self.tuning.agent.vision_radius;
        let nearby = roster
            .iter()
            .filter(|p| p.color != agent.color && p.alive && p.visible)
            .filter(|p| p.position.distance(agent.position) < vision)
            .map(|p| {
                format!(
                    "{} ({})",
                    p.display_color.name(),
                    skeld_types::Activity::from_state(p.state).as_str()
                )
            })
            .collect();
        let tracked = agent.tracked.and_then(|t| {
            let p = roster.iter().find(|p| p.color == t && p.alive)?;
            Some(format!("{} is in {}", t.name(), p.room.map_or("a hallway", RoomId::name)))
        });
        let context = RoomContext {
            agent: agent.name().to_owned(),
            role: agent.role,
            extra_role: agent.extra_role,
            current_room: agent.room.name().to_owned(),
            rooms: self.map.room_ids().into_iter().map(|r| r.name().to_owned()).collect(),
            nearby,
            knowledge: knowledge_summary(agent, &roster, &mut self.rng),
            task: agent
                .tasks
                .current()
                .map(|s| format!("{} in {}", s.task.name, s.room.name())),
            suspicions: agent
                .memory
                .top_suspects(PROMPT_SUSPECTS)
                .into_iter()
                .map(|(c, s)| format!("{}: {s:.1}", c.name()))
                .collect(),
            recent_decisions: agent
                .decisions
                .iter()
                .map(|d| format!("{} -> {}", d.from.name(), d.to.name()))
                .collect(),
            alive: roster.iter().filter(|p| p.alive).map(|p| p.color.name().to_owned()).collect(),
            dead: roster.iter().filter(|p| !p.alive).map(|p| p.color.name().to_owned()).collect(),
            last_meeting: self.meeting.history().last_summary(),
            tracked,
        };
        Some(DecisionRequest::Room(Box::new(context)))
    }

    fn request_kill_decision(&mut self, index: usize, target: Color, score: f64) {
        let Some(agent) = self.agents.get(index) else {
            return;
        };
        let color = agent.color;
        let position = agent.position;
        let room = agent.room;
        if !self.slot_free(color) {
            return;
        }
        let radius = self.tuning.impostor.witness_radius;
        let witnesses = self
            .agents
            .iter()
            .filter(|a| a.alive && a.color != color && a.color != target)
            .filter(|a| a.position.distance(position) < radius)
            .count();
        let request = DecisionRequest::Kill(KillContext {
            agent: color.name().to_owned(),
            target: target.name().to_owned(),
            score,
            room: room.name().to_owned(),
            witnesses,
            alive_crew: self.alive_count(Role::Crewmate),
            alive_impostors: self.alive_count(Role::Impostor),
        });
        self.issue(index, DecisionKind::Kill, Some(target), request);
    }

    fn poll_decisions(&mut self) {
        let mut settled: Vec<(Color, Result<String, DecisionError>)> = Vec::new();
        for (color, slot) in &mut self.in_flight {
            match slot.reply.poll_reply() {
                ReplyPoll::Pending => {}
                ReplyPoll::Ready(result) => settled.push((*color, result)),
                ReplyPoll::Closed => settled.push((*color, Err(DecisionError::Closed))),
            }
        }

        for (color, result) in settled {
            let Some(slot) = self.in_flight.remove(&color) else {
                continue;
            };
            let alive = self.agent(color).is_some_and(|a| a.alive);
            if !alive || !slot.is_current(self.epoch, self.meeting.number(), self.phase) {
                debug!(agent = %color, kind = slot.kind.as_str(), "stale decision discarded");
                continue;
            }
            match slot.kind {
                DecisionKind::Room => self.apply_room_reply(color, result),
                DecisionKind::Kill => self.apply_kill_reply(color, slot.target, result),
                DecisionKind::Dialogue | DecisionKind::Vote | DecisionKind::NextSpeaker => {}
            }
        }
    }

    fn apply_room_reply(&mut self, color: Color, result: Result<String, DecisionError>) {
        let room = match result {
            Ok(text) => {
                let room = interpret_room(&text, &self.map);
                if room.is_none() {
                    debug!(agent = %color, reply = %text, "unrecognized room, falling back");
                }
                room
            }
            Err(e) => {
                warn!(agent = %color, error = %e, "destination call failed, falling back");
                None
            }
        };
        if let Some(agent) = self.agents.iter_mut().find(|a| a.color == color) {
            agent.apply_destination(room, &self.map, &self.tuning, &mut self.rng);
        }
    }

    fn apply_kill_reply(&mut self, color: Color, target: Option<Color>, result: Result<String, DecisionError>) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.color == color) {
            agent.timers.decision_pending = false;
        }
        let choice = match result {
            Ok(text) => interpret_kill(&text),
            Err(e) => {
                warn!(agent = %color, error = %e, "kill call failed, waiting");
                None
            }
        };
        debug!(agent = %color, choice = ?choice, "kill decision");
        if choice == Some(KillChoice::Kill)
            && let Some(target) = target
        {
            let range = self.tuning.impostor.kill_range;
            self.execute_kill(color, target, range);
        }
    }

    // -------------------------------------------------------------------
    // Kills
    // -------------------------------------------------------------------

    /// Carry out a kill if it is legal right now. Returns whether it happened.
    fn execute_kill(&mut self, killer: Color, victim: Color, range: f64) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        let roster = self.roster();
        let (Some(k), Some(target)) = (
            self.index_of(killer),
            roster.iter().find(|p| p.color == victim),
        ) else {
            return false;
        };
        let Some(killer_agent) = self.agents.get(k) else {
            return false;
        };
        if !killer_agent.can_kill(target, range) {
            debug!(agent = %killer, victim = %victim, "kill rejected");
            return false;
        }
        let origin = killer_agent.position;
        let killer_visible = killer_agent.is_visible();
        let seen_as = killer_agent.display_color();
        let killer_extra = killer_agent.extra_role;

        let kill_room = self.map.room_at(origin);
        let kill_area = self.map.area_at(origin);
        let crowd = if kill_area == Area::Void {
            0
        } else {
            roster
                .iter()
                .filter(|p| p.alive && self.map.area_at(p.position) == kill_area)
                .count()
        };
        let stack_kill = crowd >= self.tuning.impostor.stack_kill_crowd;

        let now = self.elapsed;
        let Some(victim_agent) = self.agents.iter_mut().find(|a| a.color == victim) else {
            return false;
        };
        victim_agent.die(now);
        let body = victim_agent.position;
        let noisemaker = victim_agent.extra_role == Some(ExtraRole::Noisemaker);

        let vision = self.tuning.agent.vision_radius;
        for agent in &mut self.agents {
            if agent.color == killer || agent.color == victim || !agent.alive {
                continue;
            }
            if agent.position.distance(origin) >= vision {
                continue;
            }
            if stack_kill || !killer_visible {
                let room = kill_room.unwrap_or(agent.room);
                agent.witness_stack_kill(victim, room);
            } else {
                agent.witness_kill(seen_as, victim, body, &self.map);
            }
        }

        if let Some(killer_agent) = self.agents.get_mut(k) {
            killer_agent.after_kill(victim, stack_kill, now, &self.map, &self.tuning, &mut self.rng);
        }
        if stack_kill {
            self.stack_victims.insert(victim);
        }
        self.kill_feed.push(KillFeedEntry {
            killer,
            victim,
            time_ms: now,
            room: kill_room,
        });
        info!(
            killer = %killer,
            victim = %victim,
            room = ?kill_room,
            crowd,
            stack_kill,
            "kill"
        );

        if killer_extra == Some(ExtraRole::Viper) {
            self.body_timers
                .insert(victim, Countdown::from_ms(self.tuning.impostor.viper_body_ms));
        }
        if noisemaker {
            self.raise_alert(victim, body);
        }
        true
    }

    fn raise_alert(&mut self, victim: Color, body: Point) {
        info!(victim = %victim, "noisemaker alert");
        self.alert = Some(NoiseAlert {
            body,
            remaining: Countdown::from_ms(self.config.rules.noisemaker_alert_ms),
        });
        let mut first = true;
        for agent in &mut self.agents {
            if !agent.alive || agent.is_player || agent.role != Role::Crewmate {
                continue;
            }
            if first {
                agent.say("I HEARD SOMETHING!", &self.tuning);
                first = false;
            }
            agent.navigate_to_point(body, &self.map);
        }
    }

    // -------------------------------------------------------------------
    // Meetings
    // -------------------------------------------------------------------

    /// Report `victim`'s body on behalf of `reporter`.
    ///
    /// Ignored outside `playing`, for a body already reported, or when
    /// there is no body.
    pub fn report_body(&mut self, reporter: Color, victim: Color) -> bool {
        if self.phase != GamePhase::Playing || self.reported.contains(&victim) {
            debug!(reporter = %reporter, victim = %victim, "report ignored");
            return false;
        }
        if !self.agent(reporter).is_some_and(|a| a.alive) {
            return false;
        }
        let Some(body) = self.agent(victim).and_then(|a| a.body) else {
            return false;
        };
        self.reported.insert(victim);
        info!(reporter = %reporter, victim = %victim, "body reported");
        self.open_meeting(MeetingBrief {
            kind: MeetingKind::BodyReport,
            reporter,
            victim: Some(victim),
            body_room: self.map.room_at(body.position),
            stack_kill: self.stack_victims.contains(&victim),
        });
        true
    }

    /// Call an emergency meeting.
    ///
    /// Needs `playing`, a ready meeting cooldown and a meeting left; the
    /// human agent must stand near the Cafeteria button.
    pub fn press_emergency_button(&mut self, caller: Color) -> bool {
        if self.phase != GamePhase::Playing || self.emergency_left == 0 || !self.meeting_cooldown.is_ready() {
            debug!(caller = %caller, "emergency button ignored");
            return false;
        }
        let Some(agent) = self.agent(caller).filter(|a| a.alive) else {
            return false;
        };
        if agent.is_player {
            let near = self
                .map
                .room_center(RoomId::Cafeteria)
                .is_some_and(|button| button.distance(agent.position) <= self.config.rules.button_range);
            if !near {
                return false;
            }
        }
        self.emergency_left = self.emergency_left.saturating_sub(1);
        info!(caller = %caller, left = self.emergency_left, "emergency meeting");
        self.open_meeting(MeetingBrief {
            kind: MeetingKind::Emergency,
            reporter: caller,
            victim: None,
            body_room: None,
            stack_kill: false,
        });
        true
    }

    fn maybe_press_emergency(&mut self) {
        if self.emergency_left == 0 || !self.meeting_cooldown.is_ready() {
            return;
        }
        let chance = self.config.meeting.emergency_press_chance;
        let mut caller = None;
        for agent in &self.agents {
            if agent.alive
                && !agent.is_player
                && agent.role == Role::Crewmate
                && self.map.room_at(agent.position) == Some(RoomId::Cafeteria)
                && self.rng.random::<f64>() < chance
            {
                caller = Some(agent.color);
                break;
            }
        }
        if let Some(caller) = caller {
            self.press_emergency_button(caller);
        }
    }

    fn open_meeting(&mut self, brief: MeetingBrief) {
        self.epoch = self.epoch.saturating_add(1);
        let now = self.elapsed;
        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            agent.snapshot_alibi(now, &self.tuning);
        }
        self.intent = (0, 0);
        self.phase = GamePhase::Meeting;
        self.meeting.begin(brief, &self.config.meeting);
    }

    fn tick_meeting(&mut self, dt: u64) {
        let mut ctx = MeetingCtx {
            agents: &mut self.agents,
            map: &self.map,
            provider: self.provider.as_ref(),
            tuning: &self.tuning,
            config: &self.config.meeting,
        };
        if let MeetingStep::Finished(outcome) = self.meeting.update(dt, &mut ctx, &mut self.rng) {
            self.end_meeting(outcome);
        }
    }

    fn end_meeting(&mut self, outcome: MeetingOutcome) {
        self.phase = GamePhase::Playing;
        self.epoch = self.epoch.saturating_add(1);
        self.meeting_cooldown.set(self.config.meeting.cooldown_ms);

        let alive: Vec<Color> = self.agents.iter().filter(|a| a.alive).map(|a| a.color).collect();
        for agent in &mut self.agents {
            let others: Vec<Color> = alive.iter().copied().filter(|c| *c != agent.color).collect();
            agent.reset_for_round(&self.map, &others, &self.tuning, &mut self.rng);
        }

        if let Some(target) = outcome.track_target
            && let Some(human) = self.player.and_then(|p| self.agents.iter_mut().find(|a| a.color == p))
        {
            info!(agent = %human.color, target = %target, "tracker target chosen");
            human.tracked = Some(target);
        }

        let mut spots: Vec<Point> = self.map.waypoints().iter().map(|w| w.position).collect();
        spots.shuffle(&mut self.rng);
        let mut spots = spots.into_iter();
        for agent in self.agents.iter_mut().filter(|a| a.alive && !a.is_player) {
            let Some(spot) = spots.next() else {
                break;
            };
            agent.position = spot;
            if let Some(room) = self.map.room_at(spot) {
                agent.room = room;
            }
        }

        self.reported.clear();
        self.stack_victims.clear();
        self.body_timers.clear();
        self.alert = None;
        info!(
            phase = %self.phase,
            alive_crew = self.alive_count(Role::Crewmate),
            alive_impostors = self.alive_count(Role::Impostor),
            "back to play"
        );
        self.check_win();
    }

    // -------------------------------------------------------------------
    // Human controls
    // -------------------------------------------------------------------

    fn human(&self) -> Option<&Agent> {
        self.player.and_then(|p| self.agent(p)).filter(|a| a.alive)
    }

    /// Set the human agent's movement direction; each axis in `-1..=1`.
    pub fn set_player_intent(&mut self, dx: i8, dy: i8) -> bool {
        if self.human().is_none() {
            return false;
        }
        self.intent = (dx.signum(), dy.signum());
        true
    }

    /// Kill the nearest crewmate in range as the human impostor.
    pub fn player_kill(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        let Some(human) = self.human() else {
            return false;
        };
        let color = human.color;
        let position = human.position;
        let range = self.config.rules.player_kill_range;
        let roster = self.roster();
        let target = roster
            .iter()
            .filter(|p| human.can_kill(p, range))
            .min_by(|a, b| {
                a.position
                    .distance(position)
                    .total_cmp(&b.position.distance(position))
            })
            .map(|p| p.color);
        match target {
            Some(victim) => self.execute_kill(color, victim, range),
            None => false,
        }
    }

    /// Report the nearest unreported body within reach of the human agent.
    pub fn player_report(&mut self) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        let Some(human) = self.human() else {
            return false;
        };
        let color = human.color;
        let position = human.position;
        let range = self.config.rules.report_range;
        let victim = self
            .agents
            .iter()
            .filter(|a| !self.reported.contains(&a.color))
            .filter_map(|a| a.body.map(|b| (a.color, b.position.distance(position))))
            .filter(|(_, d)| *d <= range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c);
        victim.is_some_and(|v| self.report_body(color, v))
    }

    /// Add a chat line from the human agent. Meeting discussion only.
    pub fn submit_player_chat(&mut self, text: &str) -> bool {
        let Some(color) = self.human().map(|a| a.color) else {
            return false;
        };
        if self.phase != GamePhase::Meeting {
            return false;
        }
        self.meeting
            .submit_chat(color, text, &mut self.agents, &self.tuning, &mut self.rng)
    }

    /// Cast the human agent's ballot. Voting only; the last ballot wins.
    pub fn cast_player_vote(&mut self, vote: Vote) -> bool {
        let Some(color) = self.human().map(|a| a.color) else {
            return false;
        };
        if self.phase != GamePhase::Meeting {
            return false;
        }
        self.meeting.cast_vote(color, vote, &self.agents)
    }

    /// Detective ability for the human agent: the room `target` was in when
    /// the meeting was called. `None` when the request is not allowed.
    pub fn investigate(&mut self, target: Color) -> Option<RoomId> {
        let color = self.human()?.color;
        if self.phase != GamePhase::Meeting {
            return None;
        }
        self.meeting
            .investigate(color, target, &self.agents, self.config.meeting.investigations)
    }

    /// Tracker ability for the human agent, applied when the meeting ends.
    pub fn choose_track_target(&mut self, target: Color) -> bool {
        let Some(color) = self.human().map(|a| a.color) else {
            return false;
        };
        if self.phase != GamePhase::Meeting {
            return false;
        }
        self.meeting.choose_track_target(color, target, &self.agents)
    }

    // -------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------

    /// Everything a renderer needs for one frame.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            elapsed_ms: self.elapsed,
            task_bar: self.task_bar(),
            sabotage: self.sabotage(),
            emergency_meetings_left: self.emergency_left,
            winner: self.winner,
            game_over_reason: self.reason.clone(),
            kill_feed: self.kill_feed.clone(),
            agents: self.agents.iter().map(|a| a.snapshot(&self.map)).collect(),
            bodies: self
                .agents
                .iter()
                .filter_map(|a| {
                    a.body.map(|b| BodySnapshot {
                        color: a.color,
                        position: b.position,
                        room: self.map.room_at(b.position),
                    })
                })
                .collect(),
            meeting: self.meeting.snapshot(),
        }
    }

    /// One-line status for periodic logs.
    pub fn status_line(&self) -> String {
        let alive = self.agents.iter().filter(|a| a.alive).count();
        format!(
            "phase={} t={}s alive={alive}/{} impostors={} tasks={:.0}% meetings={} kills={}",
            self.phase,
            self.elapsed / 1000,
            self.agents.len(),
            self.alive_count(Role::Impostor),
            self.task_bar() * 100.0,
            self.meeting.number(),
            self.kill_feed.len(),
        )
    }
}

/// Give every impostor an impostor role and `crew_slots` random crewmates a
/// crew role. The human agent is eligible like anyone else.
fn assign_extra_roles(agents: &mut [Agent], crew_slots: usize, rng: &mut impl Rng) {
    let mut crew: Vec<usize> = Vec::new();
    for (i, agent) in agents.iter_mut().enumerate() {
        match agent.role {
            Role::Impostor => agent.extra_role = ExtraRole::IMPOSTOR.choose(rng).copied(),
            Role::Crewmate => crew.push(i),
        }
    }
    crew.shuffle(rng);
    for i in crew.into_iter().take(crew_slots) {
        if let Some(agent) = agents.get_mut(i) {
            agent.extra_role = ExtraRole::CREW.choose(rng).copied();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skeld_agents::Witness;

    use super::*;

    fn make_config(yaml: &str) -> GameConfig {
        GameConfig::parse(yaml).unwrap()
    }

    fn make_game(yaml: &str) -> Game {
        let mut game = Game::new(make_config(yaml), Box::new(OfflineProvider::new())).unwrap();
        assert!(game.start());
        game
    }

    fn run_until_playing(game: &mut Game) {
        for _ in 0..200 {
            game.update(50);
            if game.phase() == GamePhase::Playing {
                return;
            }
        }
    }

    #[test]
    fn roster_matches_configuration() {
        let game = make_game("");
        assert_eq!(game.agents().len(), 12);
        assert_eq!(game.alive_count(Role::Impostor), 2);
        assert!(game.player().is_none());
        let impostor_roles = game
            .agents()
            .iter()
            .filter(|a| a.role == Role::Impostor)
            .all(|a| a.extra_role.is_some_and(|r| r.team() == Role::Impostor));
        assert!(impostor_roles);
        let crew_roles = game
            .agents()
            .iter()
            .filter(|a| a.role == Role::Crewmate && a.extra_role.is_some())
            .count();
        assert_eq!(crew_roles, 3);
        assert!(game.agents().iter().all(|a| !a.tasks.tasks().is_empty()));
    }

    #[test]
    fn extended_roster_has_eighteen_agents() {
        let game = make_game("game:\n  extended_colors: true\n");
        assert_eq!(game.agents().len(), 18);
        assert_eq!(game.alive_count(Role::Impostor), 3);
    }

    #[test]
    fn player_role_and_forced_extra_role_apply() {
        let game = make_game(
            "game:\n  player_color: red\n  player_role: impostor\n  forced_extra_role: phantom\n",
        );
        let human = game.agent(Color::Red).unwrap();
        assert!(human.is_player);
        assert_eq!(human.role, Role::Impostor);
        assert_eq!(human.extra_role, Some(ExtraRole::Phantom));
        assert_eq!(game.alive_count(Role::Impostor), 2);
    }

    #[test]
    fn player_color_outside_roster_is_rejected() {
        let config = make_config("game:\n  player_color: coral\n");
        assert!(matches!(
            Game::new(config, Box::new(OfflineProvider::new())),
            Err(GameError::Roster { .. })
        ));
    }

    #[test]
    fn starting_counts_down_into_play() {
        let mut game = make_game("");
        assert_eq!(game.phase(), GamePhase::Starting);
        game.update(4_000);
        assert_eq!(game.phase(), GamePhase::Starting);
        run_until_playing(&mut game);
        assert_eq!(game.phase(), GamePhase::Playing);
        assert!(!game.start());
    }

    #[test]
    fn delta_time_is_clamped() {
        let mut game = make_game("");
        run_until_playing(&mut game);
        let before = game.elapsed_ms();
        game.update(10_000);
        assert_eq!(game.elapsed_ms().saturating_sub(before), 50);
    }

    #[test]
    fn same_seed_gives_same_game() {
        let mut a = make_game("game:\n  seed: 7\n");
        let mut b = make_game("game:\n  seed: 7\n");
        for _ in 0..2_000 {
            a.update(16);
            b.update(16);
        }
        let pa: Vec<Point> = a.agents().iter().map(|x| x.position).collect();
        let pb: Vec<Point> = b.agents().iter().map(|x| x.position).collect();
        assert_eq!(pa, pb);
        assert_eq!(a.kill_feed(), b.kill_feed());
    }

    #[test]
    fn ejecting_the_last_impostor_ends_the_game_at_once() {
        let mut game = make_game("");
        run_until_playing(&mut game);
        let impostors: Vec<Color> = game
            .agents()
            .iter()
            .filter(|a| a.role == Role::Impostor)
            .map(|a| a.color)
            .collect();
        for agent in game.agents_mut() {
            if impostors.contains(&agent.color) {
                agent.eject();
            }
        }
        assert!(game.check_win());
        assert_eq!(game.winner(), Some(Winner::Crewmates));
        assert_eq!(game.phase(), GamePhase::GameOver);
    }

    #[test]
    fn parity_hands_the_game_to_impostors() {
        let mut game = make_game("");
        run_until_playing(&mut game);
        let mut crew_left = game.alive_count(Role::Crewmate);
        for agent in game.agents_mut() {
            if agent.role == Role::Crewmate && crew_left > 2 {
                agent.eject();
                crew_left = crew_left.saturating_sub(1);
            }
        }
        assert!(game.check_win());
        assert_eq!(game.winner(), Some(Winner::Impostors));
    }

    /// Electrical, out of sight of the kill spots below.
    const FAR: Point = Point::new(760.0, 800.0);
    /// Hallway between Cafeteria and Weapons.
    const HALLWAY: Point = Point::new(1750.0, 240.0);
    /// Cafeteria center.
    const CAFETERIA: Point = Point::new(1450.0, 275.0);

    /// Put one impostor, a victim and `bystanders` crewmates on `spot`;
    /// everyone else waits in Electrical.
    fn stage_kill(game: &mut Game, spot: Point, bystanders: usize) -> (Color, Color, Vec<Color>) {
        let killer = game
            .agents()
            .iter()
            .find(|a| a.role == Role::Impostor)
            .map(|a| a.color)
            .unwrap();
        let crew: Vec<Color> = game
            .agents()
            .iter()
            .filter(|a| a.role == Role::Crewmate)
            .map(|a| a.color)
            .collect();
        let victim = *crew.first().unwrap();
        let witnesses: Vec<Color> = crew.iter().skip(1).take(bystanders).copied().collect();
        for agent in game.agents_mut() {
            let on_spot = agent.color == killer
                || agent.color == victim
                || witnesses.contains(&agent.color);
            agent.position = if on_spot { spot } else { FAR };
            if agent.color == killer {
                agent.timers.kill.clear();
            }
        }
        (killer, victim, witnesses)
    }

    fn kill(game: &mut Game, killer: Color, victim: Color) -> bool {
        let range = game.tuning.impostor.kill_range;
        game.execute_kill(killer, victim, range)
    }

    fn witness_of(game: &Game, color: Color) -> Option<Witness> {
        game.agent(color).unwrap().memory.witness()
    }

    #[test]
    fn crowded_corridor_kill_hides_the_killer() {
        let mut game = make_game("game:\n  extra_roles: false\ntiming:\n  start_delay_ms: 0\n");
        run_until_playing(&mut game);
        assert_eq!(game.map.room_at(HALLWAY), None);
        let (killer, victim, witnesses) = stage_kill(&mut game, HALLWAY, 4);

        assert!(kill(&mut game, killer, victim));
        assert!(!game.agent(victim).unwrap().alive);
        assert!(game.stack_victims.contains(&victim));
        for color in witnesses {
            assert!(matches!(
                witness_of(&game, color),
                Some(Witness::SawStackKill { victim: v, .. }) if v == victim
            ));
        }
    }

    #[test]
    fn crowded_room_kill_hides_the_killer() {
        let mut game = make_game("game:\n  extra_roles: false\ntiming:\n  start_delay_ms: 0\n");
        run_until_playing(&mut game);
        let (killer, victim, witnesses) = stage_kill(&mut game, CAFETERIA, 3);

        assert!(kill(&mut game, killer, victim));
        assert!(game.stack_victims.contains(&victim));
        for color in witnesses {
            assert_eq!(
                witness_of(&game, color),
                Some(Witness::SawStackKill {
                    victim,
                    room: RoomId::Cafeteria,
                })
            );
        }
    }

    #[test]
    fn small_crowd_sees_the_killer() {
        let mut game = make_game("game:\n  extra_roles: false\ntiming:\n  start_delay_ms: 0\n");
        run_until_playing(&mut game);
        let (killer, victim, witnesses) = stage_kill(&mut game, HALLWAY, 2);

        assert!(kill(&mut game, killer, victim));
        assert!(!game.stack_victims.contains(&victim));
        for color in witnesses {
            let agent = game.agent(color).unwrap();
            assert_eq!(agent.memory.witnessed_killer(), Some(killer));
        }
        let far_crew = game
            .agents()
            .iter()
            .filter(|a| a.position == FAR && a.role == Role::Crewmate)
            .all(|a| a.memory.witness().is_none());
        assert!(far_crew);
    }

    #[test]
    fn invisible_killer_is_never_named() {
        let mut game = make_game("game:\n  extra_roles: false\ntiming:\n  start_delay_ms: 0\n");
        run_until_playing(&mut game);
        let (killer, victim, witnesses) = stage_kill(&mut game, HALLWAY, 2);
        for agent in game.agents_mut() {
            if agent.color == killer
                && let Some(kit) = agent.impostor.as_mut()
            {
                kit.phantom = true;
            }
        }

        assert!(kill(&mut game, killer, victim));
        assert!(!game.stack_victims.contains(&victim));
        for color in witnesses {
            let witness = witness_of(&game, color);
            assert!(matches!(witness, Some(Witness::SawStackKill { .. })));
            assert_eq!(game.agent(color).unwrap().memory.witnessed_killer(), None);
        }
    }
}
