//! Impostor behavior: kill scoring, hunting, venting, fake tasks, sabotage,
//! and the shapeshifter and phantom abilities.
//!
//! An impostor is an [`Agent`] whose [`ImpostorKit`] is populated. The kit
//! holds the state only impostors need; the timers live in the shared
//! [`crate::timers::TimerRegistry`].
//!
//! # Kill opportunity score
//!
//! A prospective victim is scored in `[0, 1]`:
//!
//! | Term | Effect |
//! |------|--------|
//! | no witness near the target | 1.0 |
//! | one witness, farther than the lone-witness distance | 0.4 |
//! | otherwise | 0.05 |
//! | vent of the impostor's room within reach | +0.15 |
//! | impostor in a high-traffic room | -0.1 |
//! | target far away | -0.2 |
//! | `(1 - cautiousness) * 0.2` | subtracted |

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use skeld_types::{AgentState, Color, ExtraRole, Role, RoomId, SabotageKind};
use skeld_world::{ShipMap, VentId};
use tracing::{debug, info};

use crate::agent::{Agent, AgentEvent, Presence, TickContext};
use crate::timers::jittered;
use crate::tuning::{ImpostorTuning, Tuning};

/// One kill, remembered for lying and self-report decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KillRecord {
    /// Victim.
    pub victim: Color,
    /// Room the impostor was in.
    pub room: RoomId,
    /// Game time of the kill.
    pub time: u64,
    /// Whether the room was crowded enough to hide the killer.
    pub stack_kill: bool,
}

/// State carried only by impostors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpostorKit {
    /// Personal risk aversion in `[0.55, 0.9]`.
    pub cautiousness: f64,
    /// Kills this game.
    pub kills: Vec<KillRecord>,
    /// Room claimed as an alibi after the last kill.
    pub fake_alibi_room: Option<RoomId>,
    /// Victim being hunted.
    pub target: Option<Color>,
    /// Walking to, or standing at, a task it will not really do.
    pub faking_task: bool,
    /// Vent currently hidden in.
    pub vent: Option<VentId>,
    /// Disguise color while shapeshifted.
    pub disguise: Option<Color>,
    /// Invisible while set.
    pub phantom: bool,
}

impl ImpostorKit {
    /// Fresh kit with a rolled cautiousness.
    pub fn new(tuning: &ImpostorTuning, rng: &mut impl Rng) -> Self {
        Self {
            cautiousness: tuning.cautiousness_min + rng.random::<f64>() * tuning.cautiousness_jitter,
            kills: Vec::new(),
            fake_alibi_room: None,
            target: None,
            faking_task: false,
            vent: None,
            disguise: None,
            phantom: false,
        }
    }

    /// Whether this impostor killed `victim`.
    pub fn killed(&self, victim: Color) -> bool {
        self.kills.iter().any(|k| k.victim == victim)
    }

    /// Leave vents and drop hunting and faking state.
    pub const fn reset_for_round(&mut self) {
        self.vent = None;
        self.target = None;
        self.faking_task = false;
    }
}

impl Agent {
    // -------------------------------------------------------------------
    // Scoring
    // -------------------------------------------------------------------

    /// Opportunity score for killing `target` right now.
    pub fn kill_score(&self, target: &Presence, roster: &[Presence], map: &ShipMap, tuning: &Tuning) -> f64 {
        let t = &tuning.impostor;
        let cautiousness = self.impostor.as_ref().map_or(1.0, |k| k.cautiousness);

        let mut witnesses = 0_usize;
        let mut nearest = f64::INFINITY;
        for other in roster {
            if other.color == self.color || other.color == target.color || !other.alive {
                continue;
            }
            let d = other.position.distance(target.position);
            if d < t.witness_radius {
                witnesses = witnesses.saturating_add(1);
                nearest = nearest.min(d);
            }
        }

        let mut score = match witnesses {
            0 => 1.0,
            1 if nearest > t.lone_witness_distance => 0.4,
            _ => 0.05,
        };
        if map
            .vent_near(self.position, self.room, t.vent_bonus_radius)
            .is_some()
        {
            score += 0.15;
        }
        if self.room.is_high_traffic() {
            score -= 0.1;
        }
        if target.position.distance(self.position) > t.far_target_distance {
            score -= 0.2;
        }
        score -= (1.0 - cautiousness) * 0.2;
        score.clamp(0.0, 1.0)
    }

    /// Whether a kill on `target` within `range` is legal right now.
    ///
    /// Never a role-mate, never while the cooldown runs, never from a vent.
    pub fn can_kill(&self, target: &Presence, range: f64) -> bool {
        let Some(kit) = self.impostor.as_ref() else {
            return false;
        };
        self.alive
            && self.role == Role::Impostor
            && kit.vent.is_none()
            && self.timers.kill.is_ready()
            && target.alive
            && target.role == Role::Crewmate
            && target.color != self.color
            && target.position.distance(self.position) <= range
    }

    // -------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------

    /// Drop a disguise or invisibility whose time is up.
    pub(crate) fn expire_abilities(&mut self) {
        let shift_over = self.timers.shapeshift.is_ready();
        let phantom_over = self.timers.phantom.is_ready();
        if let Some(kit) = self.impostor.as_mut() {
            if shift_over && kit.disguise.take().is_some() {
                debug!(agent = %self.color, "disguise wears off");
            }
            if phantom_over {
                kit.phantom = false;
            }
        }
    }

    pub(crate) fn impostor_tick(
        &mut self,
        ctx: &TickContext<'_>,
        rng: &mut impl Rng,
        events: &mut Vec<AgentEvent>,
    ) {
        if self.impostor.as_ref().is_some_and(|k| k.vent.is_some()) {
            if self.timers.vent.is_ready() {
                self.exit_vent(ctx.map, ctx.tuning, rng);
            }
            return;
        }

        if self.timers.kill.is_ready()
            && let Some(event) = self.evaluate_kill(ctx)
        {
            events.push(event);
        }

        match self.state {
            AgentState::Idle => self.impostor_idle(ctx, rng, events),
            AgentState::Moving => self.walk(ctx.map, ctx.tuning, rng),
            AgentState::DoingTask => self.fake_task(ctx.tuning, rng),
            AgentState::Waiting => self.wait_between_steps(ctx.tuning, rng),
            AgentState::Dead => {}
        }

        let t = &ctx.tuning.impostor;
        if self.timers.sabotage.is_ready()
            && !ctx.sabotage_active
            && rng.random::<f64>() < t.sabotage_chance
            && let Some(kind) = SabotageKind::ALL.choose(rng)
        {
            self.timers.sabotage.set(t.sabotage_cooldown_ms);
            events.push(AgentEvent::StartSabotage(*kind));
        }

        if rng.random::<f64>() < t.body_check_chance
            && let Some(report) = self.check_for_bodies(ctx)
        {
            events.push(report);
        }
    }

    /// Look for a crewmate in range worth killing.
    fn evaluate_kill(&self, ctx: &TickContext<'_>) -> Option<AgentEvent> {
        let t = &ctx.tuning.impostor;
        for other in ctx.others(self.color) {
            if !self.can_kill(other, t.kill_range) {
                continue;
            }
            let score = self.kill_score(other, ctx.roster, ctx.map, ctx.tuning);
            let borderline = score >= t.borderline_threshold && score < t.kill_threshold;
            if borderline
                && ctx.provider_connected
                && !self.timers.decision_pending
                && self.timers.decision.is_ready()
            {
                return Some(AgentEvent::RequestKillDecision {
                    target: other.color,
                    score,
                });
            }
            if score >= t.kill_threshold {
                return Some(AgentEvent::Kill {
                    victim: other.color,
                });
            }
        }
        None
    }

    fn impostor_idle(
        &mut self,
        ctx: &TickContext<'_>,
        rng: &mut impl Rng,
        events: &mut Vec<AgentEvent>,
    ) {
        if !self.timers.idle.is_ready() {
            return;
        }
        self.enter_idle(ctx.tuning, rng);

        let roll = rng.random::<f64>();
        if roll < 0.35 && self.timers.kill.is_ready() {
            self.hunt(ctx, rng);
        } else if roll < 0.65 {
            self.go_fake_task(ctx.map, ctx.tuning, rng);
        } else {
            self.wander(ctx.map, ctx.tuning, rng);
        }

        let t = &ctx.tuning.impostor;
        match self.extra_role {
            Some(ExtraRole::Shapeshifter)
                if self.timers.shapeshift_cooldown.is_ready()
                    && rng.random::<f64>() < t.ability_chance =>
            {
                if let Some(disguise) = self.shapeshift(ctx, rng) {
                    events.push(AgentEvent::Shapeshifted { disguise });
                }
            }
            Some(ExtraRole::Phantom)
                if self.timers.phantom_cooldown.is_ready()
                    && rng.random::<f64>() < t.ability_chance =>
            {
                self.go_phantom(ctx.tuning);
            }
            _ => {}
        }

        if ctx.provider_connected
            && self.timers.destination_decision.is_ready()
            && !self.timers.decision_pending
            && rng.random::<f64>() < t.destination_decision_chance
        {
            self.timers
                .destination_decision
                .set(t.destination_decision_cooldown_ms);
            events.push(AgentEvent::RequestDestination);
        }
    }

    /// Head for the best-scoring crewmate, or fake a task if none is worth it.
    fn hunt(&mut self, ctx: &TickContext<'_>, rng: &mut impl Rng) {
        let mut best: Option<(&Presence, f64)> = None;
        for other in ctx.others(self.color) {
            if !other.alive || other.role != Role::Crewmate {
                continue;
            }
            let score = self.kill_score(other, ctx.roster, ctx.map, ctx.tuning);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((other, score));
            }
        }

        match best {
            Some((target, score)) if score > ctx.tuning.impostor.hunt_threshold => {
                debug!(agent = %self.color, target = %target.color, score, "hunting");
                if let Some(kit) = self.impostor.as_mut() {
                    kit.target = Some(target.color);
                }
                self.navigate_to_point(target.position, ctx.map);
            }
            _ => self.go_fake_task(ctx.map, ctx.tuning, rng),
        }
    }

    // -------------------------------------------------------------------
    // Fake tasks
    // -------------------------------------------------------------------

    fn go_fake_task(&mut self, map: &ShipMap, tuning: &Tuning, rng: &mut impl Rng) {
        match self.tasks.current() {
            Some(step) => {
                self.navigate_to_room(step.room, map, tuning, rng);
                if let Some(kit) = self.impostor.as_mut() {
                    kit.faking_task = true;
                }
            }
            None => self.wander(map, tuning, rng),
        }
    }

    /// Stand at the task for its duration, then move the cursor on without
    /// counting toward the task bar.
    fn fake_task(&mut self, tuning: &Tuning, rng: &mut impl Rng) {
        if !self.timers.task.is_ready() {
            return;
        }
        if let Some(kit) = self.impostor.as_mut() {
            kit.faking_task = false;
        }
        let _ = self.tasks.complete_step();
        self.enter_idle(tuning, rng);
    }

    // -------------------------------------------------------------------
    // Kill aftermath and vents
    // -------------------------------------------------------------------

    /// Bookkeeping after this impostor killed `victim`.
    ///
    /// Restarts the kill cooldown, rolls the self-report lockout, picks a
    /// fake alibi room next to the kill room and, for bots, escapes by vent
    /// or on foot.
    pub fn after_kill(
        &mut self,
        victim: Color,
        stack_kill: bool,
        now: u64,
        map: &ShipMap,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) {
        let t = &tuning.impostor;
        self.timers.kill.set(t.kill_cooldown_ms);
        if rng.random::<f64>() < t.self_report_delay_chance {
            self.timers.self_report.set(t.self_report_cooldown_ms);
        } else {
            self.timers.self_report.clear();
        }

        let room = self.room;
        let alibi = map.adjacent_rooms(room).choose(rng).copied().unwrap_or(room);
        if let Some(kit) = self.impostor.as_mut() {
            kit.target = None;
            kit.fake_alibi_room = Some(alibi);
            kit.kills.push(KillRecord {
                victim,
                room,
                time: now,
                stack_kill,
            });
        }
        info!(agent = %self.color, victim = %victim, room = %room, alibi = %alibi, stack_kill, "kill executed");

        if self.is_player {
            return;
        }
        if rng.random::<f64>() < t.escape_vent_chance {
            self.try_vent(map, tuning, rng);
        } else {
            self.wander(map, tuning, rng);
        }
    }

    /// Hide in a vent of the current room if one is close, else walk away.
    pub fn try_vent(&mut self, map: &ShipMap, tuning: &Tuning, rng: &mut impl Rng) {
        let t = &tuning.impostor;
        match map.vent_near(self.position, self.room, t.escape_vent_radius) {
            Some(vent) => {
                debug!(agent = %self.color, vent = %vent, "entering vent");
                if let Some(kit) = self.impostor.as_mut() {
                    kit.vent = Some(vent);
                }
                self.timers
                    .vent
                    .set(jittered(rng, t.vent_min_ms, t.vent_jitter_ms));
                self.path.clear();
                self.path_index = 0;
                self.state = AgentState::Idle;
            }
            None => self.wander(map, tuning, rng),
        }
    }

    /// Pop out of a random linked vent.
    fn exit_vent(&mut self, map: &ShipMap, tuning: &Tuning, rng: &mut impl Rng) {
        let Some(current) = self.impostor.as_mut().and_then(|k| k.vent.take()) else {
            return;
        };
        let exit = map
            .vent(current)
            .and_then(|v| v.links.choose(rng))
            .and_then(|id| map.vent(*id));
        if let Some(exit) = exit {
            self.position = exit.position;
            self.room = exit.room;
        }
        self.enter_idle(tuning, rng);
    }

    // -------------------------------------------------------------------
    // Abilities
    // -------------------------------------------------------------------

    /// Teleport to the waypoint farthest from every other living agent and
    /// take on another color. Returns the disguise.
    pub fn shapeshift(&mut self, ctx: &TickContext<'_>, rng: &mut impl Rng) -> Option<Color> {
        let ready = self.timers.shapeshift_cooldown.is_ready();
        let kit = self.impostor.as_ref()?;
        if kit.disguise.is_some() || !ready {
            return None;
        }

        let others: Vec<_> = ctx
            .others(self.color)
            .filter(|p| p.alive)
            .map(|p| p.position)
            .collect();
        if let Some(wp) = ctx.map.farthest_waypoint_from(&others) {
            self.position = wp.position;
            if let Some(room) = wp.room.or_else(|| ctx.map.room_at(wp.position)) {
                self.room = room;
            }
            self.state = AgentState::Idle;
            self.path.clear();
            self.path_index = 0;
        }

        let choices: Vec<Color> = Color::ALL
            .iter()
            .take(Color::STANDARD_COUNT)
            .copied()
            .filter(|c| *c != self.color)
            .collect();
        let disguise = *choices.choose(rng)?;

        let t = &ctx.tuning.impostor;
        self.timers.shapeshift.set(t.shapeshift_duration_ms);
        self.timers.shapeshift_cooldown.set(t.shapeshift_cooldown_ms);
        if let Some(kit) = self.impostor.as_mut() {
            kit.disguise = Some(disguise);
        }
        info!(agent = %self.color, disguise = %disguise, "shapeshifted");
        Some(disguise)
    }

    /// Turn invisible for a while. Returns whether it happened.
    pub fn go_phantom(&mut self, tuning: &Tuning) -> bool {
        let ready = self.timers.phantom_cooldown.is_ready();
        let Some(kit) = self.impostor.as_mut() else {
            return false;
        };
        if kit.phantom || !ready {
            return false;
        }
        kit.phantom = true;
        self.timers.phantom.set(tuning.impostor.phantom_duration_ms);
        self.timers
            .phantom_cooldown
            .set(tuning.impostor.phantom_cooldown_ms);
        info!(agent = %self.color, "went phantom");
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use skeld_types::{Point, Rect};

    use super::*;

    /// Electrical (high traffic), Storage with a vent, and a far-off Reactor
    /// with the linked vent.
    fn make_map() -> ShipMap {
        let mut map = ShipMap::new(2000.0, 1000.0);
        map.add_room(
            RoomId::Electrical,
            Rect::new(0.0, 0.0, 300.0, 300.0),
            Point::new(150.0, 150.0),
        )
        .unwrap();
        map.add_room(
            RoomId::Storage,
            Rect::new(300.0, 0.0, 300.0, 300.0),
            Point::new(450.0, 150.0),
        )
        .unwrap();
        map.add_room(
            RoomId::Reactor,
            Rect::new(1500.0, 0.0, 300.0, 300.0),
            Point::new(1650.0, 150.0),
        )
        .unwrap();
        map.add_corridor("Long", Rect::new(600.0, 130.0, 900.0, 40.0));
        let e = map
            .add_waypoint(Point::new(150.0, 150.0), Some(RoomId::Electrical))
            .unwrap();
        let s = map
            .add_waypoint(Point::new(450.0, 150.0), Some(RoomId::Storage))
            .unwrap();
        let r = map
            .add_waypoint(Point::new(1650.0, 150.0), Some(RoomId::Reactor))
            .unwrap();
        map.add_edge(e, s).unwrap();
        map.add_edge(s, r).unwrap();
        map.add_vent("storage", Point::new(400.0, 50.0), RoomId::Storage)
            .unwrap();
        map.add_vent("reactor", Point::new(1700.0, 100.0), RoomId::Reactor)
            .unwrap();
        map.link_vents("storage", "reactor").unwrap();
        map.set_adjacent(RoomId::Storage, &[RoomId::Electrical]).unwrap();
        map
    }

    fn make_agent(color: Color, role: Role, at: Point, map: &ShipMap) -> Agent {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut agent = Agent::new(color, role, at, &Tuning::default(), &mut rng);
        if let Some(room) = map.room_at(at) {
            agent.room = room;
        }
        agent
    }

    fn fearless(agent: &mut Agent) {
        agent.impostor.as_mut().unwrap().cautiousness = 1.0;
    }

    #[test]
    fn isolated_target_scores_high_crowded_scores_low() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(450.0, 250.0), &map);
        fearless(&mut imp);
        let crew = make_agent(Color::Blue, Role::Crewmate, Point::new(500.0, 250.0), &map);

        let roster = [imp.presence(&map), crew.presence(&map)];
        let alone = imp.kill_score(&roster[1], &roster, &map, &tuning);
        assert!((alone - 1.0).abs() < 1e-9);

        let w1 = make_agent(Color::Green, Role::Crewmate, Point::new(500.0, 200.0), &map);
        let w2 = make_agent(Color::Pink, Role::Crewmate, Point::new(520.0, 260.0), &map);
        let roster = [
            imp.presence(&map),
            crew.presence(&map),
            w1.presence(&map),
            w2.presence(&map),
        ];
        let crowded = imp.kill_score(&roster[1], &roster, &map, &tuning);
        assert!((crowded - 0.05).abs() < 1e-9);
    }

    #[test]
    fn lone_distant_witness_is_risky_and_vent_helps() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(420.0, 60.0), &map);
        fearless(&mut imp);
        let crew = make_agent(Color::Blue, Role::Crewmate, Point::new(440.0, 60.0), &map);
        let witness = make_agent(Color::Green, Role::Crewmate, Point::new(440.0, 285.0), &map);
        let roster = [imp.presence(&map), crew.presence(&map), witness.presence(&map)];
        let score = imp.kill_score(&roster[1], &roster, &map, &tuning);
        assert!((score - 0.55).abs() < 1e-9);
    }

    #[test]
    fn high_traffic_far_target_and_caution_penalties() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(100.0, 250.0), &map);
        imp.impostor.as_mut().unwrap().cautiousness = 0.5;
        let crew = make_agent(Color::Blue, Role::Crewmate, Point::new(1650.0, 150.0), &map);
        let roster = [imp.presence(&map), crew.presence(&map)];
        let score = imp.kill_score(&roster[1], &roster, &map, &tuning);
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn never_targets_a_role_mate_or_kills_on_cooldown() {
        let map = make_map();
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(450.0, 250.0), &map);
        let mate = make_agent(Color::Black, Role::Impostor, Point::new(460.0, 250.0), &map);
        let crew = make_agent(Color::Blue, Role::Crewmate, Point::new(470.0, 250.0), &map);

        assert!(!imp.can_kill(&crew.presence(&map), 80.0));
        imp.timers.kill.clear();
        assert!(imp.can_kill(&crew.presence(&map), 80.0));
        assert!(!imp.can_kill(&mate.presence(&map), 80.0));
        assert!(!crew.can_kill(&imp.presence(&map), 80.0));
    }

    #[test]
    fn clear_opportunity_emits_kill_borderline_asks_provider() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(450.0, 250.0), &map);
        fearless(&mut imp);
        imp.timers.kill.clear();
        let crew = make_agent(Color::Blue, Role::Crewmate, Point::new(470.0, 250.0), &map);
        let reported = BTreeSet::new();
        let roster = [imp.presence(&map), crew.presence(&map)];
        let mut ctx = TickContext {
            now: 0,
            dt: 16,
            map: &map,
            roster: &roster,
            reported: &reported,
            tuning: &tuning,
            provider_connected: true,
            sabotage_active: false,
            player: None,
        };
        assert_eq!(
            imp.evaluate_kill(&ctx),
            Some(AgentEvent::Kill {
                victim: Color::Blue
            })
        );

        let witness = make_agent(Color::Green, Role::Crewmate, Point::new(470.0, 40.0), &map);
        let crowded = [imp.presence(&map), crew.presence(&map), witness.presence(&map)];
        ctx.roster = &crowded;
        assert!(matches!(
            imp.evaluate_kill(&ctx),
            Some(AgentEvent::RequestKillDecision {
                target: Color::Blue,
                ..
            })
        ));

        ctx.provider_connected = false;
        assert_eq!(imp.evaluate_kill(&ctx), None);
    }

    #[test]
    fn after_kill_sets_cooldown_alibi_and_record() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(410.0, 60.0), &map);
        imp.timers.kill.clear();
        imp.after_kill(Color::Blue, false, 1234, &map, &tuning, &mut rng);

        assert_eq!(imp.timers.kill.remaining(), 30_000);
        let kit = imp.impostor.as_ref().unwrap();
        assert_eq!(kit.fake_alibi_room, Some(RoomId::Electrical));
        assert!(kit.killed(Color::Blue));
        assert!(
            kit.vent.is_some() || imp.state == AgentState::Moving,
            "escapes by vent or on foot"
        );
        let lockout = imp.timers.self_report.remaining();
        assert!(lockout == 0 || lockout == 10_000);
    }

    #[test]
    fn vent_exit_lands_on_linked_vent() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(410.0, 60.0), &map);
        imp.try_vent(&map, &tuning, &mut rng);
        assert!(imp.impostor.as_ref().unwrap().vent.is_some());
        assert!(!imp.is_visible());
        assert!((3000..=8000).contains(&imp.timers.vent.remaining()));

        imp.timers.vent.clear();
        imp.exit_vent(&map, &tuning, &mut rng);
        assert_eq!(imp.position, Point::new(1700.0, 100.0));
        assert_eq!(imp.room, RoomId::Reactor);
        assert!(imp.is_visible());
    }

    #[test]
    fn shapeshift_moves_away_and_disguises() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(150.0, 150.0), &map);
        imp.extra_role = Some(ExtraRole::Shapeshifter);
        let crew = make_agent(Color::Blue, Role::Crewmate, Point::new(160.0, 150.0), &map);
        let reported = BTreeSet::new();
        let roster = [imp.presence(&map), crew.presence(&map)];
        let ctx = TickContext {
            now: 0,
            dt: 16,
            map: &map,
            roster: &roster,
            reported: &reported,
            tuning: &tuning,
            provider_connected: false,
            sabotage_active: false,
            player: None,
        };

        let disguise = imp.shapeshift(&ctx, &mut rng).unwrap();
        assert_ne!(disguise, Color::Red);
        assert_eq!(imp.display_color(), disguise);
        assert_eq!(imp.position, Point::new(1650.0, 150.0));
        assert!(imp.shapeshift(&ctx, &mut rng).is_none());

        imp.timers.shapeshift.clear();
        imp.expire_abilities();
        assert_eq!(imp.display_color(), Color::Red);
    }

    #[test]
    fn phantom_respects_cooldown() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(150.0, 150.0), &map);
        assert!(imp.go_phantom(&tuning));
        assert!(!imp.is_visible());
        assert!(!imp.go_phantom(&tuning));
        imp.timers.phantom.clear();
        imp.expire_abilities();
        assert!(imp.is_visible());
        assert!(!imp.go_phantom(&tuning));
    }

    #[test]
    fn withholds_own_victim_during_lockout() {
        let map = make_map();
        let tuning = Tuning::default();
        let mut imp = make_agent(Color::Red, Role::Impostor, Point::new(450.0, 150.0), &map);
        imp.impostor.as_mut().unwrap().kills.push(KillRecord {
            victim: Color::Blue,
            room: RoomId::Storage,
            time: 0,
            stack_kill: false,
        });
        imp.timers.self_report.set(10_000);
        let mut victim = make_agent(Color::Blue, Role::Crewmate, Point::new(480.0, 150.0), &map);
        victim.die(0);
        let reported = BTreeSet::new();
        let roster = [imp.presence(&map), victim.presence(&map)];
        let ctx = TickContext {
            now: 5000,
            dt: 16,
            map: &map,
            roster: &roster,
            reported: &reported,
            tuning: &tuning,
            provider_connected: false,
            sabotage_active: false,
            player: None,
        };
        assert_eq!(imp.check_for_bodies(&ctx), None);
        imp.timers.self_report.clear();
        assert_eq!(
            imp.check_for_bodies(&ctx),
            Some(AgentEvent::ReportBody {
                victim: Color::Blue
            })
        );
    }
}
