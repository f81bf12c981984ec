//! Enumeration types for the Skeld simulation.
//!
//! Every enum here is closed: roles, rooms, phases and votes are fixed sets,
//! and behavior dispatches on them with exhaustive matches.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Crew color. Doubles as the agent's public name.
///
/// The first twelve colors form the standard roster; the remaining six are
/// only used when extended colors are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Color {
    /// Red.
    Red,
    /// Blue.
    Blue,
    /// Green.
    Green,
    /// Pink.
    Pink,
    /// Orange.
    Orange,
    /// Yellow.
    Yellow,
    /// Black.
    Black,
    /// White.
    White,
    /// Purple.
    Purple,
    /// Brown.
    Brown,
    /// Cyan.
    Cyan,
    /// Lime.
    Lime,
    /// Tan (extended).
    Tan,
    /// Maroon (extended).
    Maroon,
    /// Rose (extended).
    Rose,
    /// Banana (extended).
    Banana,
    /// Gray (extended).
    Gray,
    /// Coral (extended).
    Coral,
}

impl Color {
    /// Every color in roster order.
    pub const ALL: [Self; 18] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Pink,
        Self::Orange,
        Self::Yellow,
        Self::Black,
        Self::White,
        Self::Purple,
        Self::Brown,
        Self::Cyan,
        Self::Lime,
        Self::Tan,
        Self::Maroon,
        Self::Rose,
        Self::Banana,
        Self::Gray,
        Self::Coral,
    ];

    /// Number of colors in the standard (non-extended) roster.
    pub const STANDARD_COUNT: usize = 12;

    /// Lowercase key used in chat matching and configuration.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Pink => "pink",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Black => "black",
            Self::White => "white",
            Self::Purple => "purple",
            Self::Brown => "brown",
            Self::Cyan => "cyan",
            Self::Lime => "lime",
            Self::Tan => "tan",
            Self::Maroon => "maroon",
            Self::Rose => "rose",
            Self::Banana => "banana",
            Self::Gray => "gray",
            Self::Coral => "coral",
        }
    }

    /// Capitalized display name, used as the agent's name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Pink => "Pink",
            Self::Orange => "Orange",
            Self::Yellow => "Yellow",
            Self::Black => "Black",
            Self::White => "White",
            Self::Purple => "Purple",
            Self::Brown => "Brown",
            Self::Cyan => "Cyan",
            Self::Lime => "Lime",
            Self::Tan => "Tan",
            Self::Maroon => "Maroon",
            Self::Rose => "Rose",
            Self::Banana => "Banana",
            Self::Gray => "Gray",
            Self::Coral => "Coral",
        }
    }

    /// Parse a color from its key or name, ignoring case and surrounding
    /// whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        let needle = text.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.key() == needle)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// A named room of the ship. Corridors are not rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum RoomId {
    /// Central hub with the emergency button.
    Cafeteria,
    /// Weapons.
    Weapons,
    /// Navigation.
    Navigation,
    /// Oxygen.
    O2,
    /// Shields.
    Shields,
    /// Communications.
    Communications,
    /// Storage.
    Storage,
    /// Admin.
    Admin,
    /// Electrical.
    Electrical,
    /// Lower engine.
    LowerEngine,
    /// Upper engine.
    UpperEngine,
    /// Reactor.
    Reactor,
    /// Medical bay.
    MedBay,
    /// Security.
    Security,
}

impl RoomId {
    /// Every room in map order.
    pub const ALL: [Self; 14] = [
        Self::Cafeteria,
        Self::Weapons,
        Self::Navigation,
        Self::O2,
        Self::Shields,
        Self::Communications,
        Self::Storage,
        Self::Admin,
        Self::Electrical,
        Self::LowerEngine,
        Self::UpperEngine,
        Self::Reactor,
        Self::MedBay,
        Self::Security,
    ];

    /// Compact key (`lowerEngine`, `medbay`, ...).
    pub const fn key(self) -> &'static str {
        match self {
            Self::Cafeteria => "cafeteria",
            Self::Weapons => "weapons",
            Self::Navigation => "navigation",
            Self::O2 => "o2",
            Self::Shields => "shields",
            Self::Communications => "communications",
            Self::Storage => "storage",
            Self::Admin => "admin",
            Self::Electrical => "electrical",
            Self::LowerEngine => "lowerEngine",
            Self::UpperEngine => "upperEngine",
            Self::Reactor => "reactor",
            Self::MedBay => "medbay",
            Self::Security => "security",
        }
    }

    /// Display name as spoken by agents (`Comms`, `Lower Engine`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cafeteria => "Cafeteria",
            Self::Weapons => "Weapons",
            Self::Navigation => "Navigation",
            Self::O2 => "O2",
            Self::Shields => "Shields",
            Self::Communications => "Comms",
            Self::Storage => "Storage",
            Self::Admin => "Admin",
            Self::Electrical => "Electrical",
            Self::LowerEngine => "Lower Engine",
            Self::UpperEngine => "Upper Engine",
            Self::Reactor => "Reactor",
            Self::MedBay => "MedBay",
            Self::Security => "Security",
        }
    }

    /// Rooms where an impostor expects heavy foot traffic.
    pub const fn is_high_traffic(self) -> bool {
        matches!(self, Self::Cafeteria | Self::Admin | Self::Electrical)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Team allegiance. Fixed for the whole game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Completes tasks and hunts the impostors.
    Crewmate,
    /// Kills crewmates and blends in.
    Impostor,
}

impl Role {
    /// Lowercase label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crewmate => "crewmate",
            Self::Impostor => "impostor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional secondary ability layered on top of a [`Role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ExtraRole {
    /// Crew: periodically senses unreported deaths.
    Scientist,
    /// Crew: remembers recent rooms and can investigate during meetings.
    Detective,
    /// Crew: death alerts every crewmate to the body.
    Noisemaker,
    /// Crew: follows the movements of one chosen agent.
    Tracker,
    /// Impostor: victims' bodies dissolve after a delay.
    Viper,
    /// Impostor: teleports away and takes on a disguise color.
    Shapeshifter,
    /// Impostor: briefly turns invisible.
    Phantom,
}

impl ExtraRole {
    /// Extra roles available to crewmates.
    pub const CREW: [Self; 4] = [Self::Scientist, Self::Detective, Self::Noisemaker, Self::Tracker];

    /// Extra roles available to impostors.
    pub const IMPOSTOR: [Self; 3] = [Self::Viper, Self::Shapeshifter, Self::Phantom];

    /// The team this extra role belongs to.
    pub const fn team(self) -> Role {
        match self {
            Self::Scientist | Self::Detective | Self::Noisemaker | Self::Tracker => Role::Crewmate,
            Self::Viper | Self::Shapeshifter | Self::Phantom => Role::Impostor,
        }
    }

    /// Lowercase label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scientist => "scientist",
            Self::Detective => "detective",
            Self::Noisemaker => "noisemaker",
            Self::Tracker => "tracker",
            Self::Viper => "viper",
            Self::Shapeshifter => "shapeshifter",
            Self::Phantom => "phantom",
        }
    }
}

impl fmt::Display for ExtraRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Agent state
// ---------------------------------------------------------------------------

/// Outer state of an agent's behavior machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentState {
    /// Waiting for the idle timer to pick a destination.
    Idle,
    /// Walking along a path.
    Moving,
    /// Working on the current task step.
    DoingTask,
    /// Waiting between the steps of a multi-step task.
    Waiting,
    /// Killed or ejected. Inert until the game restarts.
    Dead,
}

/// What an observed agent appeared to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Activity {
    /// Working on a task (or faking one).
    Task,
    /// Standing around.
    Idle,
    /// Walking.
    Moving,
}

impl Activity {
    /// Derive the visible activity from an agent state.
    pub const fn from_state(state: AgentState) -> Self {
        match state {
            AgentState::DoingTask => Self::Task,
            AgentState::Idle => Self::Idle,
            AgentState::Moving | AgentState::Waiting | AgentState::Dead => Self::Moving,
        }
    }

    /// Short label used in summaries.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Idle => "idle",
            Self::Moving => "moving",
        }
    }
}

/// Task category, which governs how many of each an agent receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TaskCategory {
    /// Assigned to everyone.
    Common,
    /// Two or three per agent.
    Short,
    /// One per agent.
    Long,
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Global game phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GamePhase {
    /// Roster not yet built.
    Lobby,
    /// Countdown before play begins.
    Starting,
    /// Agents roam, work and kill.
    Playing,
    /// A meeting is in progress; agents are frozen.
    Meeting,
    /// A winner has been declared.
    GameOver,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lobby => "lobby",
            Self::Starting => "starting",
            Self::Playing => "playing",
            Self::Meeting => "meeting",
            Self::GameOver => "gameover",
        })
    }
}

/// Phase inside a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MeetingPhase {
    /// No meeting running.
    #[serde(rename = "none")]
    Inactive,
    /// Report splash screen.
    Splash,
    /// Free discussion.
    Discussion,
    /// Ballots are open.
    Voting,
    /// Tally on display.
    Results,
    /// Ejection animation.
    Ejection,
}

impl fmt::Display for MeetingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inactive => "none",
            Self::Splash => "splash",
            Self::Discussion => "discussion",
            Self::Voting => "voting",
            Self::Results => "results",
            Self::Ejection => "ejection",
        })
    }
}

/// Why a meeting was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MeetingKind {
    /// Someone found a body.
    BodyReport,
    /// Someone pressed the emergency button.
    Emergency,
}

/// A ballot: a player color or an explicit skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Vote {
    /// Vote to eject this agent.
    Player(Color),
    /// Vote to eject nobody.
    Skip,
}

impl Vote {
    /// The voted-for color, if any.
    pub const fn target(self) -> Option<Color> {
        match self {
            Self::Player(c) => Some(c),
            Self::Skip => None,
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(c) => write!(f, "{c}"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sabotage and outcome
// ---------------------------------------------------------------------------

/// Ship system an impostor can sabotage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SabotageKind {
    /// Lights out.
    Lights,
    /// Oxygen depletion.
    O2,
    /// Reactor meltdown.
    Reactor,
    /// Communications blackout.
    Comms,
}

impl SabotageKind {
    /// Every sabotage kind.
    pub const ALL: [Self; 4] = [Self::Lights, Self::O2, Self::Reactor, Self::Comms];

    /// The room crewmates rush to when this sabotage starts.
    pub const fn repair_room(self) -> RoomId {
        match self {
            Self::Lights => RoomId::Electrical,
            Self::O2 => RoomId::O2,
            Self::Reactor => RoomId::Reactor,
            Self::Comms => RoomId::Communications,
        }
    }
}

/// The winning team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Winner {
    /// Crewmates ejected every impostor or finished every task.
    Crewmates,
    /// Impostors reached parity with the crew.
    Impostors,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_accepts_names_and_keys() {
        assert_eq!(Color::parse("Red"), Some(Color::Red));
        assert_eq!(Color::parse("  banana "), Some(Color::Banana));
        assert_eq!(Color::parse("teal"), None);
    }

    #[test]
    fn standard_roster_is_prefix_of_all() {
        assert_eq!(Color::ALL.get(Color::STANDARD_COUNT - 1), Some(&Color::Lime));
    }

    #[test]
    fn extra_role_teams() {
        for r in ExtraRole::CREW {
            assert_eq!(r.team(), Role::Crewmate);
        }
        for r in ExtraRole::IMPOSTOR {
            assert_eq!(r.team(), Role::Impostor);
        }
    }

    #[test]
    fn activity_from_state() {
        assert_eq!(Activity::from_state(AgentState::DoingTask), Activity::Task);
        assert_eq!(Activity::from_state(AgentState::Idle), Activity::Idle);
        assert_eq!(Activity::from_state(AgentState::Waiting), Activity::Moving);
    }

    #[test]
    fn vote_serializes_snake_case() {
        let json = serde_json::to_string(&Vote::Player(Color::Cyan)).unwrap();
        assert_eq!(json, r#"{"player":"cyan"}"#);
        let json = serde_json::to_string(&Vote::Skip).unwrap();
        assert_eq!(json, r#""skip""#);
    }

    #[test]
    fn meeting_phase_inactive_serializes_as_none() {
        let json = serde_json::to_string(&MeetingPhase::Inactive).unwrap();
        assert_eq!(json, r#""none""#);
    }

    #[test]
    fn sabotage_repair_rooms() {
        assert_eq!(SabotageKind::Lights.repair_room(), RoomId::Electrical);
        assert_eq!(SabotageKind::Comms.repair_room(), RoomId::Communications);
    }
}
