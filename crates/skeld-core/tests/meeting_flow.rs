//! Integration tests for the meeting engine.
//!
//! Meetings run on their own, outside a [`Game`](skeld_core::game::Game),
//! against a five-agent roster: Red is the impostor, Orange is the body,
//! Blue reports it.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use skeld_agents::{Agent, Tuning};
use skeld_core::config::MeetingConfig;
use skeld_core::decision::{
    DecisionError, DecisionKind, DecisionProvider, DecisionRequest, OfflineProvider, PendingReply,
    ReplySender,
};
use skeld_core::dialogue::MeetingBrief;
use skeld_core::history::Ejection;
use skeld_core::meeting::{MeetingCtx, MeetingEngine, MeetingStep};
use skeld_types::{Color, MeetingKind, MeetingPhase, Point, Role, RoomId, Vote};
use skeld_world::{ShipMap, build_skeld};

/// Milliseconds per simulated tick.
const STEP: u64 = 50;

/// How a [`CannedProvider`] answers.
#[derive(Clone, Copy)]
enum Answer {
    /// Accuse Red, name Green as next speaker, vote Red.
    AccuseRed,
    /// Every call fails.
    Fail,
    /// No call ever settles.
    Silent,
}

/// A connected provider that answers immediately from a fixed policy.
struct CannedProvider {
    answer: Answer,
    calls: Mutex<Vec<DecisionKind>>,
    held: Mutex<Vec<ReplySender>>,
}

impl CannedProvider {
    fn new(answer: Answer) -> Self {
        Self {
            answer,
            calls: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<DecisionKind> {
        self.calls.lock().unwrap().clone()
    }
}

impl DecisionProvider for CannedProvider {
    fn name(&self) -> &'static str {
        "canned"
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn request(&self, request: DecisionRequest) -> PendingReply {
        self.calls.lock().unwrap().push(request.kind());
        match self.answer {
            Answer::AccuseRed => PendingReply::ready(Ok(match request {
                DecisionRequest::Dialogue(_) => "Red is sus, he was near Admin.".to_owned(),
                DecisionRequest::NextSpeaker(_) => "Green".to_owned(),
                DecisionRequest::Vote(_) => "Red".to_owned(),
                DecisionRequest::Room(_) | DecisionRequest::Kill(_) => String::new(),
            })),
            Answer::Fail => PendingReply::ready(Err(DecisionError::Backend {
                message: "backend down".to_owned(),
            })),
            Answer::Silent => {
                let (tx, reply) = PendingReply::channel();
                self.held.lock().unwrap().push(tx);
                reply
            }
        }
    }
}

fn make_agents(rng: &mut SmallRng) -> Vec<Agent> {
    let tuning = Tuning::default();
    let mut agents: Vec<Agent> = [
        (Color::Red, Role::Impostor),
        (Color::Blue, Role::Crewmate),
        (Color::Green, Role::Crewmate),
        (Color::Pink, Role::Crewmate),
        (Color::Orange, Role::Crewmate),
    ]
    .into_iter()
    .map(|(c, r)| Agent::new(c, r, Point::new(100.0, 100.0), &tuning, rng))
    .collect();
    agents.last_mut().unwrap().die(0);
    agents
}

fn body_report() -> MeetingBrief {
    MeetingBrief {
        kind: MeetingKind::BodyReport,
        reporter: Color::Blue,
        victim: Some(Color::Orange),
        body_room: Some(RoomId::Admin),
        stack_kill: false,
    }
}

/// Tick until `phase` is reached or the meeting finishes.
fn run_to(
    engine: &mut MeetingEngine,
    phase: MeetingPhase,
    agents: &mut [Agent],
    map: &ShipMap,
    provider: &dyn DecisionProvider,
    rng: &mut SmallRng,
) -> MeetingStep {
    let tuning = Tuning::default();
    let config = MeetingConfig::default();
    for _ in 0..20_000 {
        let mut ctx = MeetingCtx {
            agents: &mut *agents,
            map,
            provider,
            tuning: &tuning,
            config: &config,
        };
        let step = engine.update(STEP, &mut ctx, rng);
        if engine.phase() == phase || matches!(step, MeetingStep::Finished(_)) {
            return step;
        }
    }
    MeetingStep::Running
}

#[test]
fn connected_discussion_opens_with_the_reporter() {
    let map = build_skeld().unwrap();
    let mut rng = SmallRng::seed_from_u64(21);
    let mut agents = make_agents(&mut rng);
    let provider = CannedProvider::new(Answer::AccuseRed);
    let mut engine = MeetingEngine::new();
    engine.begin(body_report(), &MeetingConfig::default());

    run_to(&mut engine, MeetingPhase::Voting, &mut agents, &map, &provider, &mut rng);
    let first = engine.transcript().first().unwrap();
    assert_eq!(first.speaker, Color::Blue);
    assert_eq!(first.text, "Red is sus, he was near Admin.");
    assert!(engine.transcript().iter().any(|l| l.speaker == Color::Green));

    let calls = provider.calls();
    assert_eq!(calls.first(), Some(&DecisionKind::Dialogue));
    assert!(calls.contains(&DecisionKind::NextSpeaker));
}

#[test]
fn provider_ballots_eject_the_accused_and_update_trust() {
    let map = build_skeld().unwrap();
    let mut rng = SmallRng::seed_from_u64(22);
    let mut agents = make_agents(&mut rng);
    let provider = CannedProvider::new(Answer::AccuseRed);
    let mut engine = MeetingEngine::new();
    engine.begin(body_report(), &MeetingConfig::default());

    run_to(&mut engine, MeetingPhase::Results, &mut agents, &map, &provider, &mut rng);
    let votes = engine.votes().unwrap();
    assert_eq!(votes.get(&Color::Blue), Some(&Vote::Player(Color::Red)));
    // Red cannot vote for themselves, so "Red" reads as a skip.
    assert_eq!(votes.get(&Color::Red), Some(&Vote::Skip));

    let step = run_to(&mut engine, MeetingPhase::Inactive, &mut agents, &map, &provider, &mut rng);
    let ejected = match step {
        MeetingStep::Finished(outcome) => outcome.ejected,
        MeetingStep::Idle | MeetingStep::Running => None,
    };
    assert_eq!(
        ejected,
        Some(Ejection {
            color: Color::Red,
            was_impostor: true,
        })
    );
    assert!(!agents.first().unwrap().alive);

    let history = engine.history();
    assert_eq!(history.ejections().len(), 1);
    assert!(history.trust_of(Color::Blue).correct_calls >= 1);
    assert_eq!(history.trust_of(Color::Blue).wrong_calls, 0);
    assert!(!history.accusations_by(Color::Blue).is_empty());
}

#[test]
fn failing_provider_falls_back_to_rules() {
    let map = build_skeld().unwrap();
    let mut rng = SmallRng::seed_from_u64(23);
    let mut agents = make_agents(&mut rng);
    let provider = CannedProvider::new(Answer::Fail);
    let mut engine = MeetingEngine::new();
    engine.begin(body_report(), &MeetingConfig::default());

    run_to(&mut engine, MeetingPhase::Results, &mut agents, &map, &provider, &mut rng);
    assert!(
        engine
            .transcript()
            .iter()
            .all(|l| l.speaker != Color::Orange && !l.text.is_empty())
    );
    assert_eq!(engine.votes().unwrap().len(), 4);
    assert_eq!(engine.history().len(), 1);
}

#[test]
fn unanswered_calls_never_stall_a_meeting() {
    let map = build_skeld().unwrap();
    let mut rng = SmallRng::seed_from_u64(24);
    let mut agents = make_agents(&mut rng);
    let provider = CannedProvider::new(Answer::Silent);
    let mut engine = MeetingEngine::new();
    engine.begin(body_report(), &MeetingConfig::default());

    let step = run_to(&mut engine, MeetingPhase::Inactive, &mut agents, &map, &provider, &mut rng);
    assert!(matches!(step, MeetingStep::Finished(_)));
    assert!(!engine.is_active());
    // Only the reporter's opening line was ever requested.
    assert_eq!(provider.calls().first(), Some(&DecisionKind::Dialogue));
    assert!(engine.transcript().is_empty());

    let record = engine.history().last().unwrap();
    assert_eq!(record.votes.len(), 4);
    assert!(record.transcript.is_empty());
}

#[test]
fn history_accumulates_across_meetings() {
    let map = build_skeld().unwrap();
    let mut rng = SmallRng::seed_from_u64(25);
    let mut agents = make_agents(&mut rng);
    let provider = OfflineProvider::new();
    let mut engine = MeetingEngine::new();

    engine.begin(body_report(), &MeetingConfig::default());
    run_to(&mut engine, MeetingPhase::Inactive, &mut agents, &map, &provider, &mut rng);

    let survivor = agents
        .iter()
        .find(|a| a.alive && a.role == Role::Crewmate)
        .map(|a| a.color)
        .unwrap();
    let emergency = MeetingBrief {
        kind: MeetingKind::Emergency,
        reporter: survivor,
        victim: None,
        body_room: None,
        stack_kill: false,
    };
    engine.begin(emergency, &MeetingConfig::default());
    assert!(engine.transcript().is_empty());
    run_to(&mut engine, MeetingPhase::Inactive, &mut agents, &map, &provider, &mut rng);

    let history = engine.history();
    assert_eq!(engine.number(), 2);
    assert_eq!(history.len(), 2);
    let numbers: Vec<u32> = history.records().iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(history.last().unwrap().kind, MeetingKind::Emergency);
    assert!(history.last_summary().is_some());

    engine.reset();
    assert!(engine.history().is_empty());
    assert_eq!(engine.number(), 0);
}
