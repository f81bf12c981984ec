//! Cross-meeting memory.
//!
//! [`MeetingHistory`] keeps one [`MeetingRecord`] per finished meeting, the
//! accusations each agent has made, every ejection, and a trust ledger of
//! how often each accuser was right. It survives from meeting to meeting and
//! is cleared only when the game restarts. Votes and prompts read it through
//! the query methods and the text builders at the bottom of the impl.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use skeld_types::{Color, MeetingId, MeetingKind, RoomId, Vote};

use crate::chat::{Accusation, ChatLine};

/// Meetings rendered into the history prompt.
const PROMPT_MEETINGS: usize = 5;

/// Who was ejected and what they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ejection {
    /// Ejected agent.
    pub color: Color,
    /// Whether they were an impostor.
    pub was_impostor: bool,
}

/// Everything worth remembering about one meeting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingRecord {
    /// Meeting identifier.
    pub id: MeetingId,
    /// One-based meeting number.
    pub number: u32,
    /// Body report or emergency.
    pub kind: MeetingKind,
    /// Who called it.
    pub reporter: Color,
    /// Reported victim.
    pub victim: Option<Color>,
    /// Room of the body.
    pub body_room: Option<RoomId>,
    /// Full chat.
    pub transcript: Vec<ChatLine>,
    /// Accusations extracted from the chat.
    pub accusations: Vec<Accusation>,
    /// Final ballots.
    pub votes: BTreeMap<Color, Vote>,
    /// Ballot counts as text, most votes first.
    pub vote_summary: String,
    /// Outcome.
    pub ejected: Option<Ejection>,
    /// Defenses and alibi claims.
    pub key_events: Vec<String>,
    /// When the meeting ended.
    pub held_at: DateTime<Utc>,
}

/// One ejection in game order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EjectionRecord {
    /// Meeting number.
    pub meeting: u32,
    /// Ejected agent.
    pub color: Color,
    /// Whether they were an impostor.
    pub was_impostor: bool,
}

/// One accusation remembered against its accuser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PastAccusation {
    /// Meeting number.
    pub meeting: u32,
    /// Who was accused.
    pub target: Color,
    /// The line itself.
    pub quote: String,
}

/// How an accuser's calls turned out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrustRecord {
    /// Meetings where they accused someone later revealed as an impostor.
    pub correct_calls: u32,
    /// Meetings where they accused someone later revealed as innocent.
    pub wrong_calls: u32,
}

/// Count ballots and render them, most votes first.
pub fn vote_summary(votes: &BTreeMap<Color, Vote>) -> String {
    let mut counts: BTreeMap<Option<Color>, u32> = BTreeMap::new();
    for vote in votes.values() {
        let entry = counts.entry(vote.target()).or_insert(0);
        *entry = entry.saturating_add(1);
    }
    let mut ordered: Vec<(Option<Color>, u32)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    let parts: Vec<String> = ordered
        .into_iter()
        .map(|(target, n)| match target {
            Some(c) => format!("{}: {n}", c.name()),
            None => format!("Skip: {n}"),
        })
        .collect();
    if parts.is_empty() {
        "no votes".to_owned()
    } else {
        parts.join(", ")
    }
}

/// Memory shared by every meeting of one game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeetingHistory {
    records: Vec<MeetingRecord>,
    ejections: Vec<EjectionRecord>,
    accusation_memory: BTreeMap<Color, Vec<PastAccusation>>,
    trust: BTreeMap<Color, TrustRecord>,
}

impl MeetingHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished meeting and update the ledgers.
    ///
    /// Every accusation against the ejected agent counts as one correct or
    /// one wrong call for its accuser.
    pub fn record(&mut self, record: MeetingRecord) {
        for acc in &record.accusations {
            self.accusation_memory
                .entry(acc.accuser)
                .or_default()
                .push(PastAccusation {
                    meeting: record.number,
                    target: acc.target,
                    quote: acc.quote.clone(),
                });
        }

        if let Some(ejected) = record.ejected {
            for acc in record.accusations.iter().filter(|a| a.target == ejected.color) {
                let trust = self.trust.entry(acc.accuser).or_default();
                if ejected.was_impostor {
                    trust.correct_calls = trust.correct_calls.saturating_add(1);
                } else {
                    trust.wrong_calls = trust.wrong_calls.saturating_add(1);
                }
            }
            self.ejections.push(EjectionRecord {
                meeting: record.number,
                color: ejected.color,
                was_impostor: ejected.was_impostor,
            });
        }

        self.records.push(record);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.records.clear();
        self.ejections.clear();
        self.accusation_memory.clear();
        self.trust.clear();
    }

    /// Number of recorded meetings.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no meeting has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[MeetingRecord] {
        &self.records
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&MeetingRecord> {
        self.records.last()
    }

    /// All ejections, oldest first.
    pub fn ejections(&self) -> &[EjectionRecord] {
        &self.ejections
    }

    /// Trust record of `accuser`.
    pub fn trust_of(&self, accuser: Color) -> TrustRecord {
        self.trust.get(&accuser).copied().unwrap_or_default()
    }

    /// Accusations `accuser` has made, oldest first.
    pub fn accusations_by(&self, accuser: Color) -> &[PastAccusation] {
        self.accusation_memory
            .get(&accuser)
            .map_or(&[], Vec::as_slice)
    }

    /// Past accusations naming `target`, by anyone.
    pub fn accusations_against(&self, target: Color) -> usize {
        self.accusation_memory
            .values()
            .flatten()
            .filter(|a| a.target == target)
            .count()
    }

    /// Meetings where `color` accused someone who was then ejected and
    /// turned out innocent.
    pub fn innocent_pushes(&self, color: Color) -> usize {
        self.records
            .iter()
            .filter(|r| {
                r.ejected.is_some_and(|e| {
                    !e.was_impostor
                        && r
                            .accusations
                            .iter()
                            .any(|a| a.accuser == color && a.target == e.color)
                })
            })
            .count()
    }

    /// One-line summary of the latest meeting.
    pub fn last_summary(&self) -> Option<String> {
        self.last().map(|r| match r.ejected {
            Some(e) => format!(
                "Meeting {}: {} was ejected ({})",
                r.number,
                e.color.name(),
                if e.was_impostor { "impostor" } else { "innocent" }
            ),
            None => format!("Meeting {}: no one was ejected", r.number),
        })
    }

    // -------------------------------------------------------------------
    // Prompt text
    // -------------------------------------------------------------------

    /// Recent meetings as a text block; empty before the first meeting.
    pub fn history_prompt(&self) -> String {
        if self.records.is_empty() {
            return String::new();
        }
        let mut out = String::from("=== PREVIOUS MEETING HISTORY ===\n");
        let skip = self.records.len().saturating_sub(PROMPT_MEETINGS);
        for r in self.records.iter().skip(skip) {
            let opener = match (r.kind, r.victim) {
                (MeetingKind::BodyReport, Some(victim)) => format!(
                    "{} reported {}'s body in {}",
                    r.reporter.name(),
                    victim.name(),
                    r.body_room.map_or("a corridor", RoomId::name)
                ),
                _ => format!("{} called an emergency meeting", r.reporter.name()),
            };
            out.push_str(&format!("Meeting {}: {opener}\n", r.number));
            for a in &r.accusations {
                out.push_str(&format!(
                    "  {} accused {}: \"{}\"\n",
                    a.accuser.name(),
                    a.target.name(),
                    a.quote
                ));
            }
            for event in &r.key_events {
                out.push_str(&format!("  {event}\n"));
            }
            out.push_str(&format!("  Votes: {}\n", r.vote_summary));
            let result = match r.ejected {
                Some(e) if e.was_impostor => format!("{} was ejected and WAS an impostor", e.color.name()),
                Some(e) => format!("{} was ejected and was NOT an impostor", e.color.name()),
                None => "No one was ejected".to_owned(),
            };
            out.push_str(&format!("  Result: {result}\n"));
        }
        out
    }

    /// Accusers' track records as a text block; empty when nobody has one.
    pub fn trust_prompt(&self) -> String {
        let lines: Vec<String> = self
            .trust
            .iter()
            .filter(|(_, t)| t.correct_calls > 0 || t.wrong_calls > 0)
            .map(|(color, t)| {
                let mut parts = Vec::new();
                if t.correct_calls > 0 {
                    parts.push(format!("correctly identified {} impostor(s)", t.correct_calls));
                }
                if t.wrong_calls > 0 {
                    parts.push(format!("falsely accused {} innocent player(s)", t.wrong_calls));
                }
                format!("{}: {}", color.name(), parts.join(", "))
            })
            .collect();
        if lines.is_empty() {
            return String::new();
        }
        format!("=== ACCUSATION TRACK RECORD ===\n{}\n", lines.join("\n"))
    }

    /// Past ejections as a text block; empty before the first ejection.
    pub fn ejection_prompt(&self) -> String {
        if self.ejections.is_empty() {
            return String::new();
        }
        let mut out = String::from("=== EJECTION HISTORY ===\n");
        for e in &self.ejections {
            let verdict = if e.was_impostor {
                "was an impostor"
            } else {
                "was innocent"
            };
            out.push_str(&format!("Meeting {}: {} {verdict}\n", e.meeting, e.color.name()));
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_record(number: u32, accusations: &[(Color, Color)], ejected: Option<Ejection>) -> MeetingRecord {
        MeetingRecord {
            id: MeetingId::new(),
            number,
            kind: MeetingKind::BodyReport,
            reporter: Color::Green,
            victim: Some(Color::White),
            body_room: Some(RoomId::Admin),
            transcript: Vec::new(),
            accusations: accusations
                .iter()
                .map(|(accuser, target)| Accusation {
                    accuser: *accuser,
                    target: *target,
                    quote: format!("{} is sus", target.name()),
                })
                .collect(),
            votes: BTreeMap::new(),
            vote_summary: "no votes".to_owned(),
            ejected,
            key_events: Vec::new(),
            held_at: Utc::now(),
        }
    }

    #[test]
    fn wrong_calls_follow_an_innocent_ejection() {
        let mut history = MeetingHistory::new();
        history.record(make_record(
            1,
            &[(Color::Red, Color::Blue), (Color::Red, Color::Blue), (Color::Cyan, Color::Lime)],
            Some(Ejection {
                color: Color::Blue,
                was_impostor: false,
            }),
        ));
        assert_eq!(history.len(), 1);
        assert_eq!(history.trust_of(Color::Red).wrong_calls, 2);
        assert_eq!(history.trust_of(Color::Cyan), TrustRecord::default());
        assert_eq!(history.innocent_pushes(Color::Red), 1);
        assert_eq!(history.accusations_against(Color::Blue), 2);
        assert_eq!(history.accusations_by(Color::Red).len(), 2);
    }

    #[test]
    fn correct_calls_follow_an_impostor_ejection() {
        let mut history = MeetingHistory::new();
        history.record(make_record(1, &[], None));
        history.record(make_record(
            2,
            &[(Color::Cyan, Color::Black)],
            Some(Ejection {
                color: Color::Black,
                was_impostor: true,
            }),
        ));
        assert_eq!(history.len(), 2);
        assert_eq!(history.trust_of(Color::Cyan).correct_calls, 1);
        assert_eq!(history.innocent_pushes(Color::Cyan), 0);
        assert_eq!(history.ejections().len(), 1);
        assert!(history.last_summary().unwrap().contains("Black was ejected (impostor)"));
    }

    #[test]
    fn prompts_render_once_there_is_something_to_say() {
        let mut history = MeetingHistory::new();
        assert!(history.history_prompt().is_empty());
        assert!(history.trust_prompt().is_empty());
        assert!(history.ejection_prompt().is_empty());

        history.record(make_record(
            1,
            &[(Color::Red, Color::Blue)],
            Some(Ejection {
                color: Color::Blue,
                was_impostor: false,
            }),
        ));
        let text = history.history_prompt();
        assert!(text.starts_with("=== PREVIOUS MEETING HISTORY ==="));
        assert!(text.contains("Green reported White's body in Admin"));
        assert!(text.contains("Red accused Blue"));
        assert!(text.contains("was NOT an impostor"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "=== PREVIOUS MEETING HISTORY ===",
                "Meeting 1: Green reported White's body in Admin",
                "  Red accused Blue: \"Blue is sus\"",
                "  Votes: no votes",
                "  Result: Blue was ejected and was NOT an impostor",
            ]
        );
        assert!(history
            .trust_prompt()
            .contains("Red: falsely accused 1 innocent player(s)"));
        assert!(history.ejection_prompt().contains("Meeting 1: Blue was innocent"));

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.trust_of(Color::Red), TrustRecord::default());
    }

    #[test]
    fn vote_summary_orders_by_count() {
        let mut votes = BTreeMap::new();
        votes.insert(Color::Red, Vote::Player(Color::Blue));
        votes.insert(Color::Green, Vote::Player(Color::Blue));
        votes.insert(Color::Blue, Vote::Skip);
        assert_eq!(vote_summary(&votes), "Blue: 2, Skip: 1");
        assert_eq!(vote_summary(&BTreeMap::new()), "no votes");
    }
}
