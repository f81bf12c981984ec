//! Decision provider capability and the plumbing around it.
//!
//! At five points the game may ask an outside policy for help: where an
//! agent walks next, whether a borderline kill goes ahead, what a speaker
//! says, how an agent votes, and who speaks next. The [`DecisionProvider`]
//! trait abstracts that policy -- it could be a language model, a scripted
//! test double, or nothing at all ([`OfflineProvider`]).
//!
//! Calls never block the tick. [`DecisionProvider::request`] returns a
//! [`PendingReply`] immediately; the caller polls it on later ticks and
//! applies the answer only if it is still relevant. Every answer is free
//! text; the `interpret_*` functions map it onto the game's vocabulary and
//! return `None` when it does not fit, at which point the caller falls back
//! to its rule-based decision.

use serde::Serialize;
use skeld_types::{Color, ExtraRole, GamePhase, MeetingKind, Role, RoomId, Vote};
use skeld_world::ShipMap;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::chat::{has_word, mentioned_colors};

/// Errors a decision call can end with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// No provider is configured.
    #[error("decision provider is offline")]
    Offline,

    /// The provider did not answer within the deadline.
    #[error("decision call timed out after {timeout_ms}ms")]
    Timeout {
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The backend failed.
    #[error("decision backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// The reply channel closed before an answer arrived.
    #[error("decision reply channel closed")]
    Closed,

    /// The answer could not be mapped onto a decision.
    #[error("unusable decision reply: {reply}")]
    Unusable {
        /// The raw reply.
        reply: String,
    },
}

/// Which decision point a call serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Next destination room.
    Room,
    /// Kill or wait on a borderline opportunity.
    Kill,
    /// One line of meeting discussion.
    Dialogue,
    /// One ballot.
    Vote,
    /// Who speaks next in a meeting.
    NextSpeaker,
}

impl DecisionKind {
    /// Lowercase name used in logs and template names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Kill => "kill",
            Self::Dialogue => "dialogue",
            Self::Vote => "vote",
            Self::NextSpeaker => "speaker",
        }
    }
}

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// What an idle agent knows when choosing a destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomContext {
    /// Agent name.
    pub agent: String,
    /// Team.
    pub role: Role,
    /// Secondary ability.
    pub extra_role: Option<ExtraRole>,
    /// Room the agent is in.
    pub current_room: String,
    /// Rooms the answer must come from.
    pub rooms: Vec<String>,
    /// Agents in view with their activity.
    pub nearby: Vec<String>,
    /// Knowledge summary lines.
    pub knowledge: Vec<String>,
    /// Current task step, if any.
    pub task: Option<String>,
    /// Top suspects with their scores.
    pub suspicions: Vec<String>,
    /// Recent provider-chosen moves.
    pub recent_decisions: Vec<String>,
    /// Living agents.
    pub alive: Vec<String>,
    /// Dead agents.
    pub dead: Vec<String>,
    /// Outcome of the most recent meeting.
    pub last_meeting: Option<String>,
    /// Agent the tracker ability follows.
    pub tracked: Option<String>,
}

/// A borderline kill opportunity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KillContext {
    /// Impostor name.
    pub agent: String,
    /// Prospective victim.
    pub target: String,
    /// Opportunity score in `[0, 1]`.
    pub score: f64,
    /// Room of the impostor.
    pub room: String,
    /// Other agents in view.
    pub witnesses: usize,
    /// Living crewmates.
    pub alive_crew: usize,
    /// Living impostors.
    pub alive_impostors: usize,
}

/// Everything a speaker may draw on for one line of discussion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueContext {
    /// Speaker name.
    pub speaker: String,
    /// Team.
    pub role: Role,
    /// Secondary ability.
    pub extra_role: Option<ExtraRole>,
    /// Body report or emergency.
    pub kind: MeetingKind,
    /// Who called the meeting.
    pub reporter: String,
    /// Reported victim.
    pub victim: Option<String>,
    /// Room of the body.
    pub body_room: Option<String>,
    /// Whether the kill happened in a crowd.
    pub stack_kill: bool,
    /// Knowledge summary lines.
    pub knowledge: Vec<String>,
    /// Room in the speaker's alibi snapshot.
    pub alibi_room: Option<String>,
    /// Companions in the speaker's alibi snapshot.
    pub alibi_companions: Vec<String>,
    /// Fellow impostors, for impostor speakers.
    pub partners: Vec<String>,
    /// Whether someone has accused the speaker this meeting.
    pub accused: bool,
    /// Chat so far as `Name: text`.
    pub transcript: Vec<String>,
    /// Living agents.
    pub alive: Vec<String>,
    /// Dead agents.
    pub dead: Vec<String>,
    /// Previous meetings.
    pub history: String,
    /// How reliable each accuser has been.
    pub trust: String,
    /// Past ejections.
    pub ejections: String,
}

/// Everything a voter may draw on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteContext {
    /// Voter name.
    pub voter: String,
    /// Team.
    pub role: Role,
    /// Knowledge summary lines.
    pub knowledge: Vec<String>,
    /// Agent the voter saw kill, if still alive.
    pub witnessed_killer: Option<String>,
    /// Fellow impostors, for impostor voters.
    pub partners: Vec<String>,
    /// Agents that may be voted for.
    pub candidates: Vec<String>,
    /// The finished discussion as `Name: text`.
    pub transcript: Vec<String>,
    /// Previous meetings.
    pub history: String,
    /// How reliable each accuser has been.
    pub trust: String,
    /// Past ejections.
    pub ejections: String,
}

/// Who could speak next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerContext {
    /// Who called the meeting.
    pub reporter: String,
    /// Chat so far as `Name: text`.
    pub transcript: Vec<String>,
    /// Agents that may speak.
    pub candidates: Vec<String>,
    /// Agents accused so far.
    pub accused: Vec<String>,
}

/// One call to a decision provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "context", rename_all = "snake_case")]
pub enum DecisionRequest {
    /// Choose a destination room.
    Room(Box<RoomContext>),
    /// Kill or wait.
    Kill(KillContext),
    /// Say one line.
    Dialogue(Box<DialogueContext>),
    /// Cast one ballot.
    Vote(Box<VoteContext>),
    /// Pick the next speaker.
    NextSpeaker(SpeakerContext),
}

impl DecisionRequest {
    /// Decision point this request serves.
    pub const fn kind(&self) -> DecisionKind {
        match self {
            Self::Room(_) => DecisionKind::Room,
            Self::Kill(_) => DecisionKind::Kill,
            Self::Dialogue(_) => DecisionKind::Dialogue,
            Self::Vote(_) => DecisionKind::Vote,
            Self::NextSpeaker(_) => DecisionKind::NextSpeaker,
        }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Sending half of a reply, held by the provider.
pub type ReplySender = oneshot::Sender<Result<String, DecisionError>>;

/// State of a [`PendingReply`] when polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPoll {
    /// No answer yet.
    Pending,
    /// The call finished.
    Ready(Result<String, DecisionError>),
    /// The provider dropped the call without answering.
    Closed,
}

/// The receiving end of one decision call.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Result<String, DecisionError>>,
}

impl PendingReply {
    /// A fresh reply channel.
    pub fn channel() -> (ReplySender, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A reply that is already settled.
    pub fn ready(result: Result<String, DecisionError>) -> Self {
        let (tx, reply) = Self::channel();
        // The receiver is alive, so the send cannot fail.
        let _ = tx.send(result);
        reply
    }

    /// Check for an answer without blocking.
    pub fn poll_reply(&mut self) -> ReplyPoll {
        match self.rx.try_recv() {
            Ok(result) => ReplyPoll::Ready(result),
            Err(TryRecvError::Empty) => ReplyPoll::Pending,
            Err(TryRecvError::Closed) => ReplyPoll::Closed,
        }
    }
}

/// A source of advisory decisions.
///
/// Implementations must return from [`request`](Self::request) without
/// waiting on the answer.
pub trait DecisionProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether calls may produce useful answers. When `false` the game skips
    /// the provider and uses rule-based decisions everywhere.
    fn is_connected(&self) -> bool;

    /// Start a call.
    fn request(&self, request: DecisionRequest) -> PendingReply;
}

/// A provider that is never connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

impl OfflineProvider {
    /// Create an offline provider.
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionProvider for OfflineProvider {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn request(&self, _request: DecisionRequest) -> PendingReply {
        PendingReply::ready(Err(DecisionError::Offline))
    }
}

/// An agent's outstanding call, tagged with the state it was issued under.
#[derive(Debug)]
pub struct InFlight {
    /// Decision point.
    pub kind: DecisionKind,
    /// Round epoch at issue time.
    pub epoch: u64,
    /// Meeting count at issue time.
    pub meeting: u32,
    /// Global phase at issue time.
    pub phase: GamePhase,
    /// Victim, for kill calls.
    pub target: Option<Color>,
    /// The answer, eventually.
    pub reply: PendingReply,
}

impl InFlight {
    /// Whether the call was issued under the given state.
    pub fn is_current(&self, epoch: u64, meeting: u32, phase: GamePhase) -> bool {
        self.epoch == epoch && self.meeting == meeting && self.phase == phase
    }
}

// ---------------------------------------------------------------------------
// Interpreters
// ---------------------------------------------------------------------------

/// Kill call outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillChoice {
    /// Go ahead.
    Kill,
    /// Hold off.
    Wait,
}

fn strip_decoration(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '.' | '*' | '`'))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Room named by a destination reply.
pub fn interpret_room(text: &str, map: &ShipMap) -> Option<RoomId> {
    map.parse_room(&strip_decoration(text))
}

/// Kill or wait, if the reply says either.
pub fn interpret_kill(text: &str) -> Option<KillChoice> {
    let lower = text.to_lowercase();
    if lower.contains("kill") {
        Some(KillChoice::Kill)
    } else if lower.contains("wait") {
        Some(KillChoice::Wait)
    } else {
        None
    }
}

/// Ballot named by a vote reply.
///
/// `candidates` are the living agents; the voter cannot vote for themselves.
/// Anything that names no candidate is a skip.
pub fn interpret_vote(text: &str, candidates: &[Color], voter: Color) -> Vote {
    let cleaned = strip_decoration(text).to_lowercase();
    if cleaned.is_empty() || cleaned == "skip" {
        return Vote::Skip;
    }
    let eligible: Vec<Color> = candidates.iter().copied().filter(|c| *c != voter).collect();
    if let Some(exact) = eligible.iter().find(|c| c.key() == cleaned) {
        return Vote::Player(*exact);
    }
    mentioned_colors(&cleaned, &eligible)
        .first()
        .map_or(Vote::Skip, |c| Vote::Player(*c))
}

/// Next speaker named by a reply; `None` for `skip` or no match.
pub fn interpret_speaker(text: &str, candidates: &[Color]) -> Option<Color> {
    let cleaned = strip_decoration(text);
    if has_word(&cleaned, "skip") {
        return None;
    }
    mentioned_colors(&cleaned, candidates).first().copied()
}

/// Tidy a dialogue reply: surrounding quotes and a leading `Name:` removed.
/// `None` when nothing is left.
pub fn clean_dialogue(text: &str, speaker: Color) -> Option<String> {
    let quotes: &[char] = &['"', '\'', '`'];
    let mut line = text.trim().trim_matches(quotes).trim();
    let prefix_len = speaker.name().len();
    if let Some(head) = line.get(..prefix_len)
        && head.eq_ignore_ascii_case(speaker.name())
        && let Some(rest) = line.get(prefix_len..).and_then(|r| r.trim_start().strip_prefix(':'))
    {
        line = rest.trim().trim_matches(quotes).trim();
    }
    if line.is_empty() {
        None
    } else {
        Some(line.to_owned())
    }
}
