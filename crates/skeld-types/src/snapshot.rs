//! Read-only snapshots handed to a renderer.
//!
//! Snapshots are plain data copied out of the simulation after a tick. Nothing
//! in them refers back into live state, so a renderer can hold them across
//! frames without borrowing the game.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    AgentState, Color, ExtraRole, GamePhase, MeetingKind, MeetingPhase, Role, RoomId,
    SabotageKind, Vote, Winner,
};
use crate::geometry::Point;
use crate::ids::{AgentId, MeetingId};

/// One agent as the renderer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// Stable identifier.
    pub id: AgentId,
    /// True color.
    pub color: Color,
    /// Color currently shown (differs while shapeshifted).
    pub display_color: Color,
    /// Team.
    pub role: Role,
    /// Secondary ability, if any.
    pub extra_role: Option<ExtraRole>,
    /// Current position.
    pub position: Point,
    /// Behavior state.
    pub state: AgentState,
    /// Whether the agent is alive.
    pub alive: bool,
    /// False while venting or phantom-invisible.
    pub visible: bool,
    /// Whether a human drives this agent.
    pub is_player: bool,
    /// Room the agent is standing in, `None` in corridors.
    pub room: Option<RoomId>,
    /// Speech bubble text, if one is showing.
    pub speech: Option<String>,
    /// Completed task steps.
    pub tasks_done: u32,
    /// Total assigned task steps.
    pub tasks_total: u32,
}

/// An unreported or reported body still lying on the floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BodySnapshot {
    /// Victim color.
    pub color: Color,
    /// Where the body lies.
    pub position: Point,
    /// Room of the body, `None` in corridors.
    pub room: Option<RoomId>,
}

/// One entry of the kill feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct KillFeedEntry {
    /// Killer color.
    pub killer: Color,
    /// Victim color.
    pub victim: Color,
    /// Elapsed game time of the kill in milliseconds.
    pub time_ms: u64,
    /// Room of the kill, `None` in corridors.
    pub room: Option<RoomId>,
}

/// One line of meeting chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChatLineSnapshot {
    /// Who spoke.
    pub speaker: Color,
    /// What was said.
    pub text: String,
}

/// State of the running meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MeetingSnapshot {
    /// Meeting identifier.
    pub id: MeetingId,
    /// One-based meeting number within the game.
    pub number: u32,
    /// Body report or emergency.
    pub kind: MeetingKind,
    /// Current meeting phase.
    pub phase: MeetingPhase,
    /// Milliseconds left in the current phase.
    pub phase_remaining_ms: u64,
    /// Who called the meeting.
    pub reporter: Color,
    /// Reported victim for body reports.
    pub victim: Option<Color>,
    /// Room where the body was found.
    pub body_room: Option<RoomId>,
    /// Chat so far.
    pub transcript: Vec<ChatLineSnapshot>,
    /// Ballots cast so far.
    pub votes: BTreeMap<Color, Vote>,
    /// Ejection announcement once results are in.
    pub ejection_text: Option<String>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameSnapshot {
    /// Global phase.
    pub phase: GamePhase,
    /// Elapsed game time in milliseconds.
    pub elapsed_ms: u64,
    /// Crew task completion in `[0, 1]`.
    pub task_bar: f64,
    /// Active sabotage, if any.
    pub sabotage: Option<SabotageKind>,
    /// Emergency meetings still available.
    pub emergency_meetings_left: u32,
    /// Winning team once the game is over.
    pub winner: Option<Winner>,
    /// Human-readable game-over reason.
    pub game_over_reason: Option<String>,
    /// Kills so far, oldest first.
    pub kill_feed: Vec<KillFeedEntry>,
    /// All agents, living and dead.
    pub agents: Vec<AgentSnapshot>,
    /// Bodies still on the floor.
    pub bodies: Vec<BodySnapshot>,
    /// Running meeting, if any.
    pub meeting: Option<MeetingSnapshot>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn meeting_snapshot_serializes_votes_by_color() {
        let mut votes = BTreeMap::new();
        votes.insert(Color::Red, Vote::Player(Color::Blue));
        votes.insert(Color::Blue, Vote::Skip);
        let snap = MeetingSnapshot {
            id: MeetingId::new(),
            number: 1,
            kind: MeetingKind::Emergency,
            phase: MeetingPhase::Voting,
            phase_remaining_ms: 1_000,
            reporter: Color::Red,
            victim: None,
            body_room: None,
            transcript: vec![ChatLineSnapshot {
                speaker: Color::Red,
                text: "where".to_owned(),
            }],
            votes,
            ejection_text: None,
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["votes"]["red"]["player"], "blue");
        assert_eq!(json["votes"]["blue"], "skip");
        assert_eq!(json["phase"], "voting");
    }
}
