//! Social memory: who an agent has been with, whom it has seen, whom it
//! suspects, and what it witnessed.
//!
//! - **Companions** track continuous co-presence. A companion is inserted on
//!   first sight and dropped once unseen for the expiry window.
//! - **Sightings** are upserted per observed color and purged once older than
//!   the sighting window.
//! - **Clear list** is rebuilt every observation pass from companions whose
//!   co-presence exceeds the clear threshold.
//! - **Witness record** is a single slot holding the most recent death event.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use skeld_types::{Activity, Color, RoomId};

use crate::tuning::AgentTuning;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Continuous co-presence with one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Companion {
    /// When the current stretch of co-presence began.
    pub first_seen: u64,
    /// Last tick the peer was within vision.
    pub last_seen: u64,
    /// Room the peer was last seen in.
    pub room: RoomId,
}

impl Companion {
    /// Length of the current co-presence stretch.
    pub const fn duration(&self) -> u64 {
        self.last_seen.saturating_sub(self.first_seen)
    }
}

/// One time-stamped observation of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sighting {
    /// Color the peer appeared as.
    pub color: Color,
    /// Room the peer was in.
    pub room: RoomId,
    /// What the peer was doing.
    pub activity: Activity,
    /// When the observation was made.
    pub time: u64,
}

/// What an agent witnessed of the latest death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Witness {
    /// Saw the killer strike.
    SawKill {
        /// Who killed.
        killer: Color,
        /// Who died.
        victim: Color,
        /// Room the witness was in.
        room: RoomId,
    },
    /// Saw someone die in a crowd without seeing who did it.
    SawStackKill {
        /// Who died.
        victim: Color,
        /// Room of the kill.
        room: RoomId,
    },
    /// Came across a body.
    SawBody {
        /// Whose body.
        victim: Color,
        /// Room of the body, if it lies in one.
        room: Option<RoomId>,
    },
}

impl Witness {
    /// The dead agent this record is about.
    pub const fn victim(&self) -> Color {
        match *self {
            Self::SawKill { victim, .. }
            | Self::SawStackKill { victim, .. }
            | Self::SawBody { victim, .. } => victim,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::SawKill { .. } => 3,
            Self::SawStackKill { .. } => 2,
            Self::SawBody { .. } => 1,
        }
    }
}

/// Room and long-standing companions captured when a meeting starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlibiSnapshot {
    /// Room the agent was last in.
    pub room: Option<RoomId>,
    /// Companions co-present long enough to vouch for.
    pub companions: Vec<Color>,
}

/// A peer within vision during one observation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Color the peer appears as.
    pub color: Color,
    /// Room the peer was last in.
    pub room: RoomId,
    /// What the peer is doing.
    pub activity: Activity,
}

// ---------------------------------------------------------------------------
// SocialMemory
// ---------------------------------------------------------------------------

/// Everything an agent remembers about its peers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SocialMemory {
    companions: BTreeMap<Color, Companion>,
    sightings: Vec<Sighting>,
    suspicions: BTreeMap<Color, f64>,
    clear_list: Vec<Color>,
    witness: Option<Witness>,
    alibi: AlibiSnapshot,
    location_history: VecDeque<RoomId>,
}

impl SocialMemory {
    /// Empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick of perception into memory.
    ///
    /// `seen` must already be filtered to peers inside the vision radius.
    pub fn observe(&mut self, now: u64, seen: &[Observation], tuning: &AgentTuning) {
        self.companions
            .retain(|_, c| now.saturating_sub(c.last_seen) <= tuning.companion_expiry_ms);

        for obs in seen {
            let entry = self.companions.entry(obs.color).or_insert(Companion {
                first_seen: now,
                last_seen: now,
                room: obs.room,
            });
            entry.last_seen = now;
            entry.room = obs.room;

            if let Some(s) = self.sightings.iter_mut().find(|s| s.color == obs.color) {
                s.room = obs.room;
                s.activity = obs.activity;
                s.time = now;
            } else {
                self.sightings.push(Sighting {
                    color: obs.color,
                    room: obs.room,
                    activity: obs.activity,
                    time: now,
                });
            }
        }

        self.sightings
            .retain(|s| now.saturating_sub(s.time) < tuning.sighting_window_ms);

        self.clear_list = self
            .companions
            .iter()
            .filter(|(_, c)| c.duration() > tuning.clear_threshold_ms)
            .map(|(color, _)| *color)
            .collect();
    }

    /// Current companions.
    pub const fn companions(&self) -> &BTreeMap<Color, Companion> {
        &self.companions
    }

    /// Sightings in first-seen order.
    pub fn sightings(&self) -> &[Sighting] {
        &self.sightings
    }

    /// Most recent sighting of `color`.
    pub fn sighting_of(&self, color: Color) -> Option<&Sighting> {
        self.sightings.iter().find(|s| s.color == color)
    }

    /// Peers with a long enough co-presence to vouch for.
    pub fn clear_list(&self) -> &[Color] {
        &self.clear_list
    }

    /// Whether `color` is on the clear list.
    pub fn is_cleared(&self, color: Color) -> bool {
        self.clear_list.contains(&color)
    }

    // -------------------------------------------------------------------
    // Suspicion
    // -------------------------------------------------------------------

    /// Add `amount` to the suspicion held against `color`.
    pub fn add_suspicion(&mut self, color: Color, amount: f64) {
        *self.suspicions.entry(color).or_insert(0.0) += amount;
    }

    /// Suspicion held against `color`.
    pub fn suspicion(&self, color: Color) -> f64 {
        self.suspicions.get(&color).copied().unwrap_or(0.0)
    }

    /// Up to `n` most suspected peers, highest first.
    pub fn top_suspects(&self, n: usize) -> Vec<(Color, f64)> {
        let mut all: Vec<(Color, f64)> = self.suspicions.iter().map(|(c, s)| (*c, *s)).collect();
        all.sort_by(|a, b| b.1.total_cmp(&a.1));
        all.truncate(n);
        all
    }

    // -------------------------------------------------------------------
    // Witness record
    // -------------------------------------------------------------------

    /// Store a witness record.
    ///
    /// A new death overwrites the slot. For the same victim, a weaker record
    /// (finding the body) never replaces a stronger one (seeing the kill).
    pub fn record_witness(&mut self, record: Witness) {
        if let Some(existing) = self.witness
            && existing.victim() == record.victim()
            && existing.rank() > record.rank()
        {
            return;
        }
        self.witness = Some(record);
    }

    /// The stored witness record.
    pub const fn witness(&self) -> Option<Witness> {
        self.witness
    }

    /// The killer this agent saw, if any.
    pub const fn witnessed_killer(&self) -> Option<Color> {
        match self.witness {
            Some(Witness::SawKill { killer, .. }) => Some(killer),
            _ => None,
        }
    }

    // -------------------------------------------------------------------
    // Alibi and location history
    // -------------------------------------------------------------------

    /// Capture the room and companions co-present for longer than the alibi
    /// threshold.
    pub fn snapshot_alibi(&mut self, now: u64, room: RoomId, tuning: &AgentTuning) {
        let companions = self
            .companions
            .iter()
            .filter(|(_, c)| now.saturating_sub(c.first_seen) > tuning.alibi_threshold_ms)
            .map(|(color, _)| *color)
            .collect();
        self.alibi = AlibiSnapshot {
            room: Some(room),
            companions,
        };
    }

    /// Alibi captured at the last meeting start.
    pub const fn alibi(&self) -> &AlibiSnapshot {
        &self.alibi
    }

    /// Push `room` onto the location history if it differs from the newest
    /// entry, keeping at most `cap` rooms.
    pub fn note_location(&mut self, room: RoomId, cap: usize) {
        if self.location_history.front() == Some(&room) {
            return;
        }
        self.location_history.push_front(room);
        self.location_history.truncate(cap);
    }

    /// Distinct rooms visited, newest first.
    pub const fn location_history(&self) -> &VecDeque<RoomId> {
        &self.location_history
    }

    /// Forget per-round state: the witness record.
    pub const fn reset_for_round(&mut self) {
        self.witness = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn seen(color: Color) -> Observation {
        Observation {
            color,
            room: RoomId::Admin,
            activity: Activity::Task,
        }
    }

    /// Two agents standing together observe each other every 100 ms.
    fn co_present(a: &mut SocialMemory, b: &mut SocialMemory, from: u64, to: u64) {
        let tuning = AgentTuning::default();
        let mut t = from;
        while t <= to {
            a.observe(t, &[seen(Color::Blue)], &tuning);
            b.observe(t, &[seen(Color::Red)], &tuning);
            t += 100;
        }
    }

    #[test]
    fn clear_list_requires_threshold() {
        let mut red = SocialMemory::new();
        let mut blue = SocialMemory::new();
        co_present(&mut red, &mut blue, 0, 8000);
        assert!(red.clear_list().is_empty());
        co_present(&mut red, &mut blue, 8100, 8200);
        assert_eq!(red.clear_list(), &[Color::Blue]);
        assert!(red.companions().get(&Color::Blue).unwrap().duration() > 8000);
    }

    #[test]
    fn alibi_is_symmetric() {
        let mut red = SocialMemory::new();
        let mut blue = SocialMemory::new();
        co_present(&mut red, &mut blue, 1000, 12_000);
        assert!(red.is_cleared(Color::Blue));
        assert!(blue.is_cleared(Color::Red));
        assert_eq!(
            red.companions().get(&Color::Blue).unwrap().duration(),
            blue.companions().get(&Color::Red).unwrap().duration()
        );
    }

    #[test]
    fn companions_expire_and_restart() {
        let tuning = AgentTuning::default();
        let mut m = SocialMemory::new();
        for t in (0..=9000).step_by(1000) {
            m.observe(t, &[seen(Color::Lime)], &tuning);
        }
        assert!(m.is_cleared(Color::Lime));

        m.observe(15_000, &[], &tuning);
        assert!(m.companions().is_empty());
        assert!(m.clear_list().is_empty());

        m.observe(15_100, &[seen(Color::Lime)], &tuning);
        assert_eq!(m.companions().get(&Color::Lime).unwrap().first_seen, 15_100);
    }

    #[test]
    fn sightings_are_upserted_and_purged() {
        let tuning = AgentTuning::default();
        let mut m = SocialMemory::new();
        m.observe(0, &[seen(Color::Pink)], &tuning);
        m.observe(
            10,
            &[Observation {
                color: Color::Pink,
                room: RoomId::Storage,
                activity: Activity::Moving,
            }],
            &tuning,
        );
        assert_eq!(m.sightings().len(), 1);
        assert_eq!(m.sighting_of(Color::Pink).unwrap().room, RoomId::Storage);

        m.observe(45_009, &[], &tuning);
        assert_eq!(m.sightings().len(), 1);
        m.observe(45_010, &[], &tuning);
        assert!(m.sightings().is_empty());
    }

    #[test]
    fn witness_priority_for_same_victim() {
        let mut m = SocialMemory::new();
        m.record_witness(Witness::SawKill {
            killer: Color::Red,
            victim: Color::Blue,
            room: RoomId::Electrical,
        });
        m.record_witness(Witness::SawBody {
            victim: Color::Blue,
            room: Some(RoomId::Electrical),
        });
        assert_eq!(m.witnessed_killer(), Some(Color::Red));

        m.record_witness(Witness::SawBody {
            victim: Color::Green,
            room: None,
        });
        assert_eq!(m.witness().unwrap().victim(), Color::Green);
        assert_eq!(m.witnessed_killer(), None);

        m.reset_for_round();
        assert!(m.witness().is_none());
    }

    #[test]
    fn suspicion_ranking() {
        let mut m = SocialMemory::new();
        m.add_suspicion(Color::Red, 0.5);
        m.add_suspicion(Color::Blue, 1.5);
        m.add_suspicion(Color::Red, 0.2);
        let top = m.top_suspects(1);
        assert_eq!(top, vec![(Color::Blue, 1.5)]);
        assert!((m.suspicion(Color::Red) - 0.7).abs() < 1e-9);
        assert!(m.suspicion(Color::Cyan).abs() < f64::EPSILON);
    }

    #[test]
    fn alibi_snapshot_and_location_history() {
        let tuning = AgentTuning::default();
        let mut m = SocialMemory::new();
        m.observe(0, &[seen(Color::Red)], &tuning);
        m.observe(2500, &[seen(Color::Red), seen(Color::Blue)], &tuning);
        m.observe(3500, &[seen(Color::Red), seen(Color::Blue)], &tuning);
        m.snapshot_alibi(3500, RoomId::Admin, &tuning);
        assert_eq!(m.alibi().companions, vec![Color::Red]);
        assert_eq!(m.alibi().room, Some(RoomId::Admin));

        for room in [
            RoomId::Admin,
            RoomId::Admin,
            RoomId::Storage,
            RoomId::Electrical,
            RoomId::LowerEngine,
            RoomId::Reactor,
            RoomId::Security,
        ] {
            m.note_location(room, 5);
        }
        assert_eq!(m.location_history().len(), 5);
        assert_eq!(m.location_history().front(), Some(&RoomId::Security));
        assert_eq!(m.location_history().back(), Some(&RoomId::Storage));
    }

    #[test]
    fn witness_serializes_with_kind_tag() {
        let w = Witness::SawKill {
            killer: Color::Red,
            victim: Color::Blue,
            room: RoomId::Admin,
        };
        let json = serde_json::to_value(w).unwrap();
        assert_eq!(json["kind"], "saw_kill");
        assert_eq!(json["killer"], "red");
        assert_eq!(json["victim"], "blue");
    }
}
