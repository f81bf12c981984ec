//! Meeting deliberation engine.
//!
//! A meeting runs `splash → discussion → voting → results → ejection` on
//! its own clock while the rest of the game is frozen. Discussion is either
//! revealed from a rule-based script (provider offline) or produced one turn
//! at a time by the decision provider; voting asks the provider for each
//! ballot and back-fills anything missing with [`rule_based_vote`]. When the
//! last phase ends the engine writes a [`MeetingRecord`] into the
//! [`MeetingHistory`] it owns and hands a [`MeetingOutcome`] back to the
//! game.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;
use skeld_agents::{Agent, Countdown, Presence, Tuning, jittered, knowledge_summary};
use skeld_types::{Color, ExtraRole, MeetingId, MeetingPhase, MeetingSnapshot, Role, RoomId, Vote};
use skeld_world::ShipMap;
use tracing::{debug, info, warn};

use crate::chat::{
    ChatLine, ChatSignals, chat_signals, extract_accusations, extract_commands, first_mentioned,
    key_events,
};
use crate::config::MeetingConfig;
use crate::decision::{
    DecisionError, DecisionProvider, DecisionRequest, DialogueContext, PendingReply, ReplyPoll,
    SpeakerContext, VoteContext, clean_dialogue, interpret_speaker, interpret_vote,
};
use crate::dialogue::{MeetingBrief, ScriptedLine, generate_discussion, rule_based_vote};
use crate::history::{Ejection, MeetingHistory, MeetingRecord, vote_summary};

/// Line used when a speaker has nothing scripted.
const FALLBACK_LINE: &str = "Skip?";

/// Extra speaking chance on top of talkativeness when picking a speaker
/// without the provider.
const SPEAKER_FALLBACK_BONUS: f64 = 0.2;

/// Everything outside the engine that a meeting tick touches.
pub struct MeetingCtx<'a> {
    /// The full roster, living and dead.
    pub agents: &'a mut [Agent],
    /// The ship.
    pub map: &'a ShipMap,
    /// Advisory decision source.
    pub provider: &'a dyn DecisionProvider,
    /// Behavior knobs.
    pub tuning: &'a Tuning,
    /// Meeting timings.
    pub config: &'a MeetingConfig,
}

/// What one call to [`MeetingEngine::update`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingStep {
    /// No meeting is running.
    Idle,
    /// The meeting continues.
    Running,
    /// The meeting just ended.
    Finished(MeetingOutcome),
}

/// Result of a finished meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingOutcome {
    /// Who was ejected, if anyone.
    pub ejected: Option<Ejection>,
    /// Target chosen by the human tracker during the meeting.
    pub track_target: Option<Color>,
}

#[derive(Debug)]
enum DiscussionCall {
    Speaker(PendingReply),
    Line { speaker: Color, reply: PendingReply },
}

#[derive(Debug)]
struct MeetingState {
    id: MeetingId,
    brief: MeetingBrief,
    connected: bool,
    transcript: Vec<ChatLine>,
    script: VecDeque<ScriptedLine>,
    fallback: Option<Vec<ScriptedLine>>,
    clock: u64,
    next_speaker: Countdown,
    priority: Option<Color>,
    call: Option<DiscussionCall>,
    votes: BTreeMap<Color, Vote>,
    vote_calls: BTreeMap<Color, PendingReply>,
    signals: ChatSignals,
    investigated: Vec<Color>,
    track_target: Option<Color>,
    ejected: Option<Ejection>,
    ejection_text: Option<String>,
}

/// Tally ballots. Returns the ejected color, or `None` on a tie among the
/// leaders, when skips match or beat the leader, or when nobody was named.
pub fn tally_votes(votes: &BTreeMap<Color, Vote>) -> Option<Color> {
    let mut counts: BTreeMap<Color, u32> = BTreeMap::new();
    let mut skips: u32 = 0;
    for vote in votes.values() {
        match vote {
            Vote::Player(c) => {
                let n = counts.entry(*c).or_insert(0);
                *n = n.saturating_add(1);
            }
            Vote::Skip => skips = skips.saturating_add(1),
        }
    }
    let max = counts.values().copied().max().unwrap_or(0);
    if max == 0 || skips >= max {
        return None;
    }
    let mut leaders = counts.iter().filter(|(_, n)| **n == max).map(|(c, _)| *c);
    let first = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }
    Some(first)
}

/// Announcement shown during results.
pub fn ejection_text(ejected: Option<Ejection>) -> String {
    match ejected {
        Some(e) if e.was_impostor => format!("{} was an Impostor.", e.color.name()),
        Some(e) => format!("{} was not an Impostor.", e.color.name()),
        None => "No one was ejected. (Skipped)".to_owned(),
    }
}

fn is_bot(agents: &[Agent], color: Color) -> bool {
    agents
        .iter()
        .any(|a| a.color == color && a.alive && !a.is_player)
}

fn bot_colors(agents: &[Agent]) -> Vec<Color> {
    agents
        .iter()
        .filter(|a| a.alive && !a.is_player)
        .map(|a| a.color)
        .collect()
}

fn alive_colors(agents: &[Agent]) -> Vec<Color> {
    agents.iter().filter(|a| a.alive).map(|a| a.color).collect()
}

fn names_where(agents: &[Agent], keep: impl Fn(&Agent) -> bool) -> Vec<String> {
    agents
        .iter()
        .filter(|a| keep(*a))
        .map(|a| a.name().to_owned())
        .collect()
}

fn render(transcript: &[ChatLine]) -> Vec<String> {
    transcript.iter().map(ChatLine::render).collect()
}

fn speak(transcript: &mut Vec<ChatLine>, agents: &mut [Agent], speaker: Color, text: String, tuning: &Tuning) {
    debug!(speaker = %speaker, text = %text, "meeting line");
    if let Some(agent) = agents.iter_mut().find(|a| a.color == speaker) {
        agent.say(text.clone(), tuning);
    }
    transcript.push(ChatLine::new(speaker, text));
}

impl MeetingState {
    fn new(id: MeetingId, brief: MeetingBrief) -> Self {
        Self {
            id,
            brief,
            connected: false,
            transcript: Vec::new(),
            script: VecDeque::new(),
            fallback: None,
            clock: 0,
            next_speaker: Countdown::ZERO,
            priority: None,
            call: None,
            votes: BTreeMap::new(),
            vote_calls: BTreeMap::new(),
            signals: ChatSignals::default(),
            investigated: Vec::new(),
            track_target: None,
            ejected: None,
            ejection_text: None,
        }
    }

    // -------------------------------------------------------------------
    // Discussion
    // -------------------------------------------------------------------

    fn enter_discussion(&mut self, ctx: &mut MeetingCtx<'_>, history: &MeetingHistory, rng: &mut impl Rng) {
        self.connected = ctx.provider.is_connected();
        if !self.connected {
            self.script = generate_discussion(ctx.agents, &self.brief, ctx.map, rng).into();
            debug!(lines = self.script.len(), "scripted discussion ready");
            return;
        }
        self.next_speaker.set(ctx.config.first_speaker_ms);
        let reporter = self.brief.reporter;
        if is_bot(ctx.agents, reporter) {
            self.ask_line(reporter, ctx, history, rng);
        }
    }

    fn tick_discussion(
        &mut self,
        dt: u64,
        ctx: &mut MeetingCtx<'_>,
        history: &MeetingHistory,
        rng: &mut impl Rng,
    ) {
        self.clock = self.clock.saturating_add(dt);
        if !self.connected {
            let due = self
                .script
                .iter()
                .take_while(|l| l.delay_ms <= self.clock)
                .count();
            for line in self.script.drain(..due) {
                speak(&mut self.transcript, ctx.agents, line.speaker, line.text, ctx.tuning);
            }
            return;
        }

        self.poll_call(ctx, history, rng);
        if self.call.is_some() {
            return;
        }
        self.next_speaker.tick(dt);
        if !self.next_speaker.is_ready() {
            return;
        }
        self.next_speaker.set(jittered(
            rng,
            ctx.config.speaker_interval_min_ms,
            ctx.config.speaker_interval_jitter_ms,
        ));

        if let Some(priority) = self.priority.take()
            && is_bot(ctx.agents, priority)
        {
            debug!(speaker = %priority, "priority speaker");
            self.ask_line(priority, ctx, history, rng);
            return;
        }
        let request = self.speaker_request(ctx.agents);
        self.call = Some(DiscussionCall::Speaker(ctx.provider.request(request)));
    }

    fn close_discussion(&mut self, ctx: &mut MeetingCtx<'_>) {
        if self.call.take().is_some() {
            debug!("discussion call dropped at end of discussion");
        }
        for line in self.script.drain(..) {
            speak(&mut self.transcript, ctx.agents, line.speaker, line.text, ctx.tuning);
        }
    }

    fn poll_call(&mut self, ctx: &mut MeetingCtx<'_>, history: &MeetingHistory, rng: &mut impl Rng) {
        let poll = match self.call.as_mut() {
            None => return,
            Some(DiscussionCall::Speaker(reply) | DiscussionCall::Line { reply, .. }) => {
                reply.poll_reply()
            }
        };
        let outcome = match poll {
            ReplyPoll::Pending => return,
            ReplyPoll::Ready(result) => result,
            ReplyPoll::Closed => Err(DecisionError::Closed),
        };
        let Some(call) = self.call.take() else {
            return;
        };

        match call {
            DiscussionCall::Speaker(_) => {
                let candidates = bot_colors(ctx.agents);
                let chosen = match outcome {
                    Ok(text) => interpret_speaker(&text, &candidates),
                    Err(e) => {
                        warn!(error = %e, "next-speaker call failed, picking locally");
                        None
                    }
                };
                let speaker = chosen.or_else(|| fallback_speaker(ctx.agents, &candidates, rng));
                if let Some(speaker) = speaker {
                    self.ask_line(speaker, ctx, history, rng);
                }
            }
            DiscussionCall::Line { speaker, .. } => {
                if !is_bot(ctx.agents, speaker) {
                    return;
                }
                let line = match outcome {
                    Ok(text) => clean_dialogue(&text, speaker),
                    Err(e) => {
                        warn!(speaker = %speaker, error = %e, "dialogue call failed, using scripted line");
                        None
                    }
                };
                let text = match line {
                    Some(text) => text,
                    None => self.fallback_line(speaker, ctx, rng),
                };
                speak(&mut self.transcript, ctx.agents, speaker, text, ctx.tuning);
            }
        }
    }

    fn fallback_line(&mut self, speaker: Color, ctx: &MeetingCtx<'_>, rng: &mut impl Rng) -> String {
        let script = self
            .fallback
            .get_or_insert_with(|| generate_discussion(ctx.agents, &self.brief, ctx.map, rng));
        script
            .iter()
            .find(|l| l.speaker == speaker)
            .map_or_else(|| FALLBACK_LINE.to_owned(), |l| l.text.clone())
    }

    fn ask_line(
        &mut self,
        speaker: Color,
        ctx: &MeetingCtx<'_>,
        history: &MeetingHistory,
        rng: &mut impl Rng,
    ) {
        let Some(agent) = ctx.agents.iter().find(|a| a.color == speaker) else {
            return;
        };
        let request = self.dialogue_request(agent, ctx.agents, ctx.map, history, rng);
        self.call = Some(DiscussionCall::Line {
            speaker,
            reply: ctx.provider.request(request),
        });
    }

    fn accused_so_far(&self, agents: &[Agent]) -> Vec<Color> {
        let roster: Vec<Color> = agents.iter().map(|a| a.color).collect();
        let mut accused: Vec<Color> = Vec::new();
        for acc in extract_accusations(&self.transcript, &roster) {
            if !accused.contains(&acc.target) {
                accused.push(acc.target);
            }
        }
        accused
    }

    fn dialogue_request(
        &self,
        speaker: &Agent,
        agents: &[Agent],
        map: &ShipMap,
        history: &MeetingHistory,
        rng: &mut impl Rng,
    ) -> DecisionRequest {
        let roster: Vec<Presence> = agents.iter().map(|a| a.presence(map)).collect();
        let alibi = speaker.memory.alibi();
        let partners = if speaker.role == Role::Impostor {
            names_where(agents, |a| a.role == Role::Impostor && a.color != speaker.color)
        } else {
            Vec::new()
        };
        DecisionRequest::Dialogue(Box::new(DialogueContext {
            speaker: speaker.name().to_owned(),
            role: speaker.role,
            extra_role: speaker.extra_role,
            kind: self.brief.kind,
            reporter: self.brief.reporter.name().to_owned(),
            victim: self.brief.victim.map(|c| c.name().to_owned()),
            body_room: self.brief.body_room.map(|r| r.name().to_owned()),
            stack_kill: self.brief.stack_kill,
            knowledge: knowledge_summary(speaker, &roster, rng),
            alibi_room: alibi.room.map(|r| r.name().to_owned()),
            alibi_companions: alibi.companions.iter().map(|c| c.name().to_owned()).collect(),
            partners,
            accused: self.accused_so_far(agents).contains(&speaker.color),
            transcript: render(&self.transcript),
            alive: names_where(agents, |a| a.alive),
            dead: names_where(agents, |a| !a.alive),
            history: history.history_prompt(),
            trust: history.trust_prompt(),
            ejections: history.ejection_prompt(),
        }))
    }

    fn speaker_request(&self, agents: &[Agent]) -> DecisionRequest {
        DecisionRequest::NextSpeaker(SpeakerContext {
            reporter: self.brief.reporter.name().to_owned(),
            transcript: render(&self.transcript),
            candidates: names_where(agents, |a| a.alive && !a.is_player),
            accused: self
                .accused_so_far(agents)
                .into_iter()
                .map(|c| c.name().to_owned())
                .collect(),
        })
    }

    // -------------------------------------------------------------------
    // Voting
    // -------------------------------------------------------------------

    fn enter_voting(&mut self, ctx: &mut MeetingCtx<'_>, history: &MeetingHistory, rng: &mut impl Rng) {
        self.connected = ctx.provider.is_connected();
        let alive = alive_colors(ctx.agents);
        self.signals = chat_signals(&self.transcript, &alive);

        for voter in ctx.agents.iter().filter(|a| a.alive && !a.is_player) {
            if self.connected {
                let request = self.vote_request(voter, ctx.agents, ctx.map, history, rng);
                self.vote_calls.insert(voter.color, ctx.provider.request(request));
            } else {
                let vote = rule_based_vote(
                    voter,
                    ctx.agents,
                    &self.brief,
                    &self.signals,
                    history,
                    ctx.map,
                    rng,
                );
                debug!(voter = %voter.color, vote = %vote, "rule-based vote");
                self.votes.insert(voter.color, vote);
            }
        }
    }

    fn vote_request(
        &self,
        voter: &Agent,
        agents: &[Agent],
        map: &ShipMap,
        history: &MeetingHistory,
        rng: &mut impl Rng,
    ) -> DecisionRequest {
        let roster: Vec<Presence> = agents.iter().map(|a| a.presence(map)).collect();
        let witnessed_killer = voter
            .memory
            .witnessed_killer()
            .filter(|k| agents.iter().any(|a| a.color == *k && a.alive))
            .map(|k| k.name().to_owned());
        let partners = if voter.role == Role::Impostor {
            names_where(agents, |a| a.role == Role::Impostor && a.color != voter.color)
        } else {
            Vec::new()
        };
        DecisionRequest::Vote(Box::new(VoteContext {
            voter: voter.name().to_owned(),
            role: voter.role,
            knowledge: knowledge_summary(voter, &roster, rng),
            witnessed_killer,
            partners,
            candidates: names_where(agents, |a| a.alive && a.color != voter.color),
            transcript: render(&self.transcript),
            history: history.history_prompt(),
            trust: history.trust_prompt(),
            ejections: history.ejection_prompt(),
        }))
    }

    fn poll_votes(&mut self, ctx: &MeetingCtx<'_>, history: &MeetingHistory, rng: &mut impl Rng) {
        let mut settled: Vec<(Color, Option<String>)> = Vec::new();
        for (color, reply) in &mut self.vote_calls {
            match reply.poll_reply() {
                ReplyPoll::Pending => {}
                ReplyPoll::Ready(Ok(text)) => settled.push((*color, Some(text))),
                ReplyPoll::Ready(Err(e)) => {
                    warn!(voter = %color, error = %e, "vote call failed, voting locally");
                    settled.push((*color, None));
                }
                ReplyPoll::Closed => settled.push((*color, None)),
            }
        }

        let alive = alive_colors(ctx.agents);
        for (color, text) in settled {
            self.vote_calls.remove(&color);
            let Some(voter) = ctx.agents.iter().find(|a| a.color == color && a.alive) else {
                continue;
            };
            let vote = match text {
                Some(text) => interpret_vote(&text, &alive, color),
                None => rule_based_vote(
                    voter,
                    ctx.agents,
                    &self.brief,
                    &self.signals,
                    history,
                    ctx.map,
                    rng,
                ),
            };
            debug!(voter = %color, vote = %vote, "vote cast");
            self.votes.insert(color, vote);
        }
    }

    fn close_voting(
        &mut self,
        ctx: &mut MeetingCtx<'_>,
        history: &MeetingHistory,
        number: u32,
        rng: &mut impl Rng,
    ) -> MeetingRecord {
        if !self.vote_calls.is_empty() {
            debug!(outstanding = self.vote_calls.len(), "vote calls dropped at end of voting");
            self.vote_calls.clear();
        }

        for agent in ctx.agents.iter().filter(|a| a.alive) {
            if self.votes.contains_key(&agent.color) {
                continue;
            }
            let vote = if agent.is_player {
                Vote::Skip
            } else {
                rule_based_vote(
                    agent,
                    ctx.agents,
                    &self.brief,
                    &self.signals,
                    history,
                    ctx.map,
                    rng,
                )
            };
            self.votes.insert(agent.color, vote);
        }

        let ejected = tally_votes(&self.votes).and_then(|color| {
            let agent = ctx.agents.iter_mut().find(|a| a.color == color)?;
            agent.eject();
            Some(Ejection {
                color,
                was_impostor: agent.role == Role::Impostor,
            })
        });
        let summary = vote_summary(&self.votes);
        match ejected {
            Some(e) => {
                info!(meeting = number, ejected = %e.color, impostor = e.was_impostor, votes = %summary, "agent ejected");
            }
            None => info!(meeting = number, votes = %summary, "no one ejected"),
        }
        self.ejected = ejected;
        self.ejection_text = Some(ejection_text(ejected));

        let roster: Vec<Color> = ctx.agents.iter().map(|a| a.color).collect();
        MeetingRecord {
            id: self.id,
            number,
            kind: self.brief.kind,
            reporter: self.brief.reporter,
            victim: self.brief.victim,
            body_room: self.brief.body_room,
            transcript: self.transcript.clone(),
            accusations: extract_accusations(&self.transcript, &roster),
            votes: self.votes.clone(),
            vote_summary: summary,
            ejected,
            key_events: key_events(&self.transcript),
            held_at: Utc::now(),
        }
    }
}

fn fallback_speaker(agents: &[Agent], candidates: &[Color], rng: &mut impl Rng) -> Option<Color> {
    let color = *candidates.choose(rng)?;
    let agent = agents.iter().find(|a| a.color == color)?;
    (rng.random::<f64>() < agent.personality.talkativeness + SPEAKER_FALLBACK_BONUS).then_some(color)
}

/// Runs one meeting at a time and remembers all of them.
#[derive(Debug)]
pub struct MeetingEngine {
    phase: MeetingPhase,
    timer: Countdown,
    number: u32,
    state: Option<MeetingState>,
    history: MeetingHistory,
}

impl Default for MeetingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MeetingEngine {
    /// An engine with no meeting running and an empty history.
    pub fn new() -> Self {
        Self {
            phase: MeetingPhase::Inactive,
            timer: Countdown::ZERO,
            number: 0,
            state: None,
            history: MeetingHistory::new(),
        }
    }

    /// Current meeting phase.
    pub const fn phase(&self) -> MeetingPhase {
        self.phase
    }

    /// Whether a meeting is running.
    pub const fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Meetings started this game.
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Milliseconds left in the current phase.
    pub const fn remaining_ms(&self) -> u64 {
        self.timer.remaining()
    }

    /// Cross-meeting memory.
    pub const fn history(&self) -> &MeetingHistory {
        &self.history
    }

    /// Chat of the running meeting.
    pub fn transcript(&self) -> &[ChatLine] {
        self.state.as_ref().map_or(&[], |s| s.transcript.as_slice())
    }

    /// Ballots of the running meeting.
    pub fn votes(&self) -> Option<&BTreeMap<Color, Vote>> {
        self.state.as_ref().map(|s| &s.votes)
    }

    /// Facts of the running meeting.
    pub fn brief(&self) -> Option<&MeetingBrief> {
        self.state.as_ref().map(|s| &s.brief)
    }

    /// Drop any running meeting and forget all history.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Open a meeting. Per-meeting state starts fresh; history is kept.
    pub fn begin(&mut self, brief: MeetingBrief, config: &MeetingConfig) -> MeetingId {
        self.number = self.number.saturating_add(1);
        let id = MeetingId::new();
        self.state = Some(MeetingState::new(id, brief));
        self.phase = MeetingPhase::Splash;
        self.timer.set(config.splash_ms);
        info!(
            meeting = self.number,
            kind = ?brief.kind,
            reporter = %brief.reporter,
            victim = ?brief.victim,
            "meeting called"
        );
        id
    }

    /// Advance the meeting by `dt` milliseconds.
    pub fn update(&mut self, dt: u64, ctx: &mut MeetingCtx<'_>, rng: &mut impl Rng) -> MeetingStep {
        let Some(state) = self.state.as_mut() else {
            return MeetingStep::Idle;
        };
        self.timer.tick(dt);
        let expired = self.timer.is_ready();

        match self.phase {
            MeetingPhase::Inactive => return MeetingStep::Idle,
            MeetingPhase::Splash => {
                if expired {
                    self.phase = MeetingPhase::Discussion;
                    self.timer.set(ctx.config.discussion_ms);
                    info!(meeting = self.number, phase = %self.phase, "meeting phase");
                    state.enter_discussion(ctx, &self.history, rng);
                }
            }
            MeetingPhase::Discussion => {
                state.tick_discussion(dt, ctx, &self.history, rng);
                if expired {
                    state.close_discussion(ctx);
                    self.phase = MeetingPhase::Voting;
                    self.timer.set(ctx.config.voting_ms);
                    info!(meeting = self.number, phase = %self.phase, lines = state.transcript.len(), "meeting phase");
                    state.enter_voting(ctx, &self.history, rng);
                }
            }
            MeetingPhase::Voting => {
                state.poll_votes(ctx, &self.history, rng);
                if expired {
                    let record = state.close_voting(ctx, &self.history, self.number, rng);
                    self.history.record(record);
                    self.phase = MeetingPhase::Results;
                    self.timer.set(ctx.config.results_ms);
                    info!(meeting = self.number, phase = %self.phase, "meeting phase");
                }
            }
            MeetingPhase::Results => {
                if expired {
                    if state.ejected.is_none() {
                        return self.finish();
                    }
                    self.phase = MeetingPhase::Ejection;
                    self.timer.set(ctx.config.ejection_ms);
                    info!(meeting = self.number, phase = %self.phase, "meeting phase");
                }
            }
            MeetingPhase::Ejection => {
                if expired {
                    return self.finish();
                }
            }
        }
        MeetingStep::Running
    }

    fn finish(&mut self) -> MeetingStep {
        self.phase = MeetingPhase::Inactive;
        self.timer.clear();
        let Some(state) = self.state.take() else {
            return MeetingStep::Idle;
        };
        info!(meeting = self.number, "meeting over");
        MeetingStep::Finished(MeetingOutcome {
            ejected: state.ejected,
            track_target: state.track_target,
        })
    }

    // -------------------------------------------------------------------
    // Human input
    // -------------------------------------------------------------------

    /// Add a line typed by the human agent. Discussion only.
    ///
    /// The first bot named becomes the next speaker; follow and camp
    /// commands in the line are handed to the bots they address.
    pub fn submit_chat(
        &mut self,
        speaker: Color,
        text: &str,
        agents: &mut [Agent],
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) -> bool {
        let text = text.trim();
        if self.phase != MeetingPhase::Discussion || text.is_empty() {
            return false;
        }
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if !agents.iter().any(|a| a.color == speaker && a.alive) {
            return false;
        }
        speak(&mut state.transcript, agents, speaker, text.to_owned(), tuning);

        let bots: Vec<Color> = bot_colors(agents)
            .into_iter()
            .filter(|c| *c != speaker)
            .collect();
        match first_mentioned(text, &bots) {
            Some(named) => {
                state.priority = Some(named);
                state.next_speaker.set(jittered(rng, 500, 1000));
            }
            None => state.next_speaker.set(jittered(rng, 1000, 2000)),
        }

        for (color, command) in extract_commands(text, &bots) {
            if let Some(bot) = agents.iter_mut().find(|a| a.color == color) {
                info!(agent = %color, command = ?command, "social command");
                bot.command = Some(command);
            }
        }
        true
    }

    /// Record the human agent's ballot. Voting only; the last ballot wins.
    pub fn cast_vote(&mut self, voter: Color, vote: Vote, agents: &[Agent]) -> bool {
        if self.phase != MeetingPhase::Voting {
            return false;
        }
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if !agents.iter().any(|a| a.color == voter && a.alive) {
            return false;
        }
        if let Vote::Player(target) = vote
            && (target == voter || !agents.iter().any(|a| a.color == target && a.alive))
        {
            return false;
        }
        debug!(voter = %voter, vote = %vote, "human vote");
        state.votes.insert(voter, vote);
        true
    }

    /// Detective ability: learn the room in `target`'s alibi snapshot.
    ///
    /// Discussion or voting only, three distinct living targets per meeting.
    pub fn investigate(
        &mut self,
        detective: Color,
        target: Color,
        agents: &[Agent],
        limit: usize,
    ) -> Option<RoomId> {
        if !matches!(self.phase, MeetingPhase::Discussion | MeetingPhase::Voting) || detective == target {
            return None;
        }
        let state = self.state.as_mut()?;
        let holder = agents.iter().find(|a| a.color == detective)?;
        if !holder.alive || holder.extra_role != Some(ExtraRole::Detective) {
            return None;
        }
        if state.investigated.len() >= limit || state.investigated.contains(&target) {
            return None;
        }
        let suspect = agents.iter().find(|a| a.color == target && a.alive)?;
        state.investigated.push(target);
        let room = suspect.memory.alibi().room;
        info!(detective = %detective, target = %target, room = ?room, "investigation");
        room
    }

    /// Tracker ability: choose whom to track next round.
    pub fn choose_track_target(&mut self, tracker: Color, target: Color, agents: &[Agent]) -> bool {
        if !matches!(self.phase, MeetingPhase::Discussion | MeetingPhase::Voting) || tracker == target {
            return false;
        }
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        let is_tracker = agents
            .iter()
            .any(|a| a.color == tracker && a.alive && a.extra_role == Some(ExtraRole::Tracker));
        if !is_tracker || !agents.iter().any(|a| a.color == target && a.alive) {
            return false;
        }
        state.track_target = Some(target);
        true
    }

    /// Renderer view of the running meeting.
    pub fn snapshot(&self) -> Option<MeetingSnapshot> {
        let state = self.state.as_ref()?;
        Some(MeetingSnapshot {
            id: state.id,
            number: self.number,
            kind: state.brief.kind,
            phase: self.phase,
            phase_remaining_ms: self.timer.remaining(),
            reporter: state.brief.reporter,
            victim: state.brief.victim,
            body_room: state.brief.body_room,
            transcript: state.transcript.iter().map(ChatLine::snapshot).collect(),
            votes: state.votes.clone(),
            ejection_text: state.ejection_text.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use skeld_agents::Witness;
    use skeld_types::{MeetingKind, Point};

    use super::*;
    use crate::decision::OfflineProvider;

    fn votes(pairs: &[(Color, Vote)]) -> BTreeMap<Color, Vote> {
        pairs.iter().copied().collect()
    }

    fn make_agents(rng: &mut SmallRng) -> Vec<Agent> {
        let tuning = Tuning::default();
        [
            (Color::Red, Role::Impostor),
            (Color::Blue, Role::Crewmate),
            (Color::Green, Role::Crewmate),
            (Color::Pink, Role::Crewmate),
            (Color::Orange, Role::Crewmate),
        ]
        .into_iter()
        .map(|(c, r)| Agent::new(c, r, Point::new(100.0, 100.0), &tuning, rng))
        .collect()
    }

    fn brief() -> MeetingBrief {
        MeetingBrief {
            kind: MeetingKind::BodyReport,
            reporter: Color::Blue,
            victim: Some(Color::Orange),
            body_room: Some(RoomId::Admin),
            stack_kill: false,
        }
    }

    fn run_to(
        engine: &mut MeetingEngine,
        phase: MeetingPhase,
        agents: &mut [Agent],
        rng: &mut SmallRng,
    ) -> MeetingStep {
        let map = skeld_world::build_skeld().unwrap();
        let provider = OfflineProvider::new();
        let tuning = Tuning::default();
        let config = MeetingConfig::default();
        for _ in 0..20_000 {
            let mut ctx = MeetingCtx {
                agents: &mut *agents,
                map: &map,
                provider: &provider,
                tuning: &tuning,
                config: &config,
            };
            let step = engine.update(50, &mut ctx, rng);
            if engine.phase() == phase || matches!(step, MeetingStep::Finished(_)) {
                return step;
            }
        }
        MeetingStep::Running
    }

    #[test]
    fn plurality_ejects_the_leader() {
        let v = votes(&[
            (Color::Red, Vote::Player(Color::Blue)),
            (Color::Green, Vote::Player(Color::Blue)),
            (Color::Pink, Vote::Player(Color::Lime)),
            (Color::Lime, Vote::Skip),
        ]);
        assert_eq!(tally_votes(&v), Some(Color::Blue));
    }

    #[test]
    fn skip_matching_the_leader_ejects_nobody() {
        let v = votes(&[
            (Color::Red, Vote::Player(Color::Blue)),
            (Color::Green, Vote::Player(Color::Lime)),
            (Color::Pink, Vote::Skip),
            (Color::Lime, Vote::Skip),
        ]);
        assert_eq!(tally_votes(&v), None);

        let tie = votes(&[(Color::Red, Vote::Player(Color::Blue)), (Color::Green, Vote::Skip)]);
        assert_eq!(tally_votes(&tie), None);
    }

    #[test]
    fn tied_leaders_and_empty_ballots_eject_nobody() {
        let v = votes(&[
            (Color::Red, Vote::Player(Color::Blue)),
            (Color::Green, Vote::Player(Color::Lime)),
        ]);
        assert_eq!(tally_votes(&v), None);
        assert_eq!(tally_votes(&BTreeMap::new()), None);
        let all_skip = votes(&[(Color::Red, Vote::Skip), (Color::Green, Vote::Skip)]);
        assert_eq!(tally_votes(&all_skip), None);
    }

    #[test]
    fn ejection_text_names_the_outcome() {
        let imp = Some(Ejection {
            color: Color::Red,
            was_impostor: true,
        });
        let crew = Some(Ejection {
            color: Color::Blue,
            was_impostor: false,
        });
        assert_eq!(ejection_text(imp), "Red was an Impostor.");
        assert_eq!(ejection_text(crew), "Blue was not an Impostor.");
        assert_eq!(ejection_text(None), "No one was ejected. (Skipped)");
    }

    #[test]
    fn offline_meeting_runs_every_phase_and_records_history() {
        let mut rng = SmallRng::seed_from_u64(12);
        let mut agents = make_agents(&mut rng);
        agents.get_mut(4).unwrap().die(0);
        let mut engine = MeetingEngine::new();
        engine.begin(brief(), &MeetingConfig::default());
        assert_eq!(engine.phase(), MeetingPhase::Splash);

        run_to(&mut engine, MeetingPhase::Voting, &mut agents, &mut rng);
        assert_eq!(engine.phase(), MeetingPhase::Voting);
        assert!(!engine.transcript().is_empty());
        assert!(engine.transcript().iter().all(|l| l.speaker != Color::Orange));

        run_to(&mut engine, MeetingPhase::Results, &mut agents, &mut rng);
        let cast = engine.votes().unwrap();
        assert_eq!(cast.len(), 4);
        assert_eq!(engine.history().len(), 1);

        let step = run_to(&mut engine, MeetingPhase::Inactive, &mut agents, &mut rng);
        assert!(matches!(step, MeetingStep::Finished(_)));
        assert!(!engine.is_active());
        assert_eq!(engine.number(), 1);
    }

    #[test]
    fn witness_testimony_ejects_the_killer() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut agents = make_agents(&mut rng);
        agents.get_mut(4).unwrap().die(0);
        for c in [1, 2, 3] {
            agents.get_mut(c).unwrap().memory.record_witness(Witness::SawKill {
                killer: Color::Red,
                victim: Color::Orange,
                room: RoomId::Admin,
            });
        }
        let mut engine = MeetingEngine::new();
        engine.begin(brief(), &MeetingConfig::default());
        let step = run_to(&mut engine, MeetingPhase::Inactive, &mut agents, &mut rng);
        assert_eq!(
            step,
            MeetingStep::Finished(MeetingOutcome {
                ejected: Some(Ejection {
                    color: Color::Red,
                    was_impostor: true,
                }),
                track_target: None,
            })
        );
        assert!(!agents.first().unwrap().alive);
        assert!(agents.first().unwrap().body.is_none());
        assert_eq!(engine.history().ejections().len(), 1);
    }

    #[test]
    fn human_votes_only_count_while_voting() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut agents = make_agents(&mut rng);
        agents.get_mut(2).unwrap().is_player = true;
        let mut engine = MeetingEngine::new();
        assert!(!engine.cast_vote(Color::Green, Vote::Skip, &agents));

        engine.begin(brief(), &MeetingConfig::default());
        assert!(!engine.cast_vote(Color::Green, Vote::Skip, &agents));

        run_to(&mut engine, MeetingPhase::Voting, &mut agents, &mut rng);
        assert!(engine.cast_vote(Color::Green, Vote::Player(Color::Red), &agents));
        assert!(engine.cast_vote(Color::Green, Vote::Player(Color::Pink), &agents));
        assert!(!engine.cast_vote(Color::Green, Vote::Player(Color::Green), &agents));
        assert_eq!(
            engine.votes().unwrap().get(&Color::Green),
            Some(&Vote::Player(Color::Pink))
        );
    }

    #[test]
    fn human_chat_sets_commands_during_discussion() {
        let mut rng = SmallRng::seed_from_u64(6);
        let mut agents = make_agents(&mut rng);
        agents.get_mut(2).unwrap().is_player = true;
        let tuning = Tuning::default();
        let mut engine = MeetingEngine::new();
        engine.begin(brief(), &MeetingConfig::default());
        assert!(!engine.submit_chat(Color::Green, "hello", &mut agents, &tuning, &mut rng));

        run_to(&mut engine, MeetingPhase::Discussion, &mut agents, &mut rng);
        assert!(engine.submit_chat(Color::Green, "Blue follow me", &mut agents, &tuning, &mut rng));
        assert_eq!(
            agents.get(1).unwrap().command,
            Some(skeld_agents::SocialCommand::FollowPlayer)
        );
        assert!(engine.transcript().iter().any(|l| l.speaker == Color::Green));
    }

    #[test]
    fn detective_investigations_are_limited() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut agents = make_agents(&mut rng);
        let tuning = Tuning::default();
        for a in &mut agents {
            a.snapshot_alibi(0, &tuning);
        }
        let det = agents.get_mut(2).unwrap();
        det.is_player = true;
        det.extra_role = Some(ExtraRole::Detective);
        let mut engine = MeetingEngine::new();
        engine.begin(brief(), &MeetingConfig::default());
        assert_eq!(engine.investigate(Color::Green, Color::Red, &agents, 3), None);

        run_to(&mut engine, MeetingPhase::Discussion, &mut agents, &mut rng);
        assert!(engine.investigate(Color::Green, Color::Red, &agents, 3).is_some());
        assert_eq!(engine.investigate(Color::Green, Color::Red, &agents, 3), None);
        assert_eq!(engine.investigate(Color::Green, Color::Green, &agents, 3), None);
        assert!(engine.investigate(Color::Green, Color::Blue, &agents, 3).is_some());
        assert!(engine.investigate(Color::Green, Color::Pink, &agents, 3).is_some());
        assert_eq!(engine.investigate(Color::Green, Color::Orange, &agents, 3), None);
    }
}
