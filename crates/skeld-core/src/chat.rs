//! Meeting chat lines and the keyword matcher that reads them.
//!
//! Everything here is heuristic. Keyword lists are matched as lowercase
//! substrings; agent names are matched as whole words so that `red` does not
//! fire inside `tired`. The results feed votes, the history ledger, and
//! social commands, and are treated as hints rather than facts.
//!
//! | List | Used for |
//! |---|---|
//! | [`ACCUSATION_KEYWORDS`] | accusation extraction |
//! | [`SUSPICION_KEYWORDS`] / [`CLEARING_KEYWORDS`] | chat suspicion in the vote model |
//! | [`SKIP_KEYWORDS`] | skip consensus |
//! | [`DEFENSE_KEYWORDS`] / [`ALIBI_KEYWORDS`] | key events in meeting records |
//! | [`FOLLOW_KEYWORDS`] / [`CAMP_KEYWORDS`] | social commands from the human agent |

use std::collections::BTreeMap;

use serde::Serialize;
use skeld_agents::SocialCommand;
use skeld_types::{ChatLineSnapshot, Color, RoomId};

/// Words that turn a line naming someone into an accusation.
pub const ACCUSATION_KEYWORDS: &[&str] = &[
    "sus",
    "suspicious",
    "suspect",
    "impostor",
    "imposter",
    "vote",
    "kill",
    "killed",
    "saw",
    "venting",
    "vent",
    "fake",
    "faking",
    "liar",
    "lying",
    "think",
    "accuse",
    "blame",
    "watched",
    "caught",
    "witnessed",
];

/// Words that raise suspicion of everyone a line names.
pub const SUSPICION_KEYWORDS: &[&str] =
    &["sus", "kill", "vote", "saw", "trust", "bad", "impostor", "imp"];

/// Words that lower suspicion of everyone a line names.
pub const CLEARING_KEYWORDS: &[&str] = &["safe", "clear", "with me"];

/// Words that count toward a skip consensus.
pub const SKIP_KEYWORDS: &[&str] = &["skip", "skp"];

/// Phrases of someone defending themselves.
pub const DEFENSE_KEYWORDS: &[&str] = &[
    "wasn't me",
    "not me",
    "i didn't",
    "i was in",
    "i swear",
    "innocent",
    "i promise",
    "trust me",
];

/// Phrases of someone claiming an alibi.
pub const ALIBI_KEYWORDS: &[&str] = &["i was in", "i was at", "doing tasks"];

/// Phrases asking an agent to follow someone.
pub const FOLLOW_KEYWORDS: &[&str] = &["follow", "track", "come with", "stick to", "tail"];

/// Phrases asking an agent to hold a room.
pub const CAMP_KEYWORDS: &[&str] = &["camp", "go to", "stay in", "wait in", "head to", "stand in"];

/// Chat suspicion added per accusing line.
const SUSPICION_WEIGHT: f64 = 2.0;

/// Chat suspicion removed per clearing line.
const CLEARING_WEIGHT: f64 = -1.5;

/// Key events kept per meeting.
pub const KEY_EVENT_CAP: usize = 10;

/// One line of meeting chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    /// Who spoke.
    pub speaker: Color,
    /// What was said.
    pub text: String,
}

impl ChatLine {
    /// A line spoken by `speaker`.
    pub fn new(speaker: Color, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// `Name: text`, the form used in prompts.
    pub fn render(&self) -> String {
        format!("{}: {}", self.speaker.name(), self.text)
    }

    /// Renderer view.
    pub fn snapshot(&self) -> ChatLineSnapshot {
        ChatLineSnapshot {
            speaker: self.speaker,
            text: self.text.clone(),
        }
    }
}

/// Someone named another agent alongside an accusation keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accusation {
    /// Who spoke.
    pub accuser: Color,
    /// Who was named.
    pub target: Color,
    /// The line itself.
    pub quote: String,
}

/// What the chat says about each candidate, for the vote model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSignals {
    /// Accumulated chat suspicion per named agent.
    pub suspicion: BTreeMap<Color, f64>,
    /// Whether the room is leaning toward skipping.
    pub skip_consensus: bool,
}

impl ChatSignals {
    /// Chat suspicion of `color`.
    pub fn of(&self, color: Color) -> f64 {
        self.suspicion.get(&color).copied().unwrap_or(0.0)
    }
}

/// Whether `lower` contains any of `keywords`. `lower` must be lowercase.
pub fn contains_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lower.contains(k))
}

/// Lowercase alphanumeric words of `text`.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Whether `text` contains `word` as a whole word, ignoring case.
pub fn has_word(text: &str, word: &str) -> bool {
    words(text).any(|w| w == word)
}

/// Colors from `candidates` named in `text`, in order of first mention.
pub fn mentioned_colors(text: &str, candidates: &[Color]) -> Vec<Color> {
    let mut found = Vec::new();
    for w in words(text) {
        if let Some(c) = candidates.iter().find(|c| c.key() == w)
            && !found.contains(c)
        {
            found.push(*c);
        }
    }
    found
}

/// First color from `candidates` named in `text`.
pub fn first_mentioned(text: &str, candidates: &[Color]) -> Option<Color> {
    mentioned_colors(text, candidates).first().copied()
}

/// Room named in `text`, by display name or key; earliest mention wins.
pub fn mentioned_room(text: &str) -> Option<RoomId> {
    let lower = text.to_lowercase();
    RoomId::ALL
        .into_iter()
        .filter_map(|room| {
            let by_name = lower.find(&room.name().to_lowercase());
            let by_key = lower.find(&room.key().to_lowercase());
            by_name.into_iter().chain(by_key).min().map(|at| (at, room))
        })
        .min_by_key(|(at, _)| *at)
        .map(|(_, room)| room)
}

/// Accusations in `lines`: the first named agent other than the speaker on
/// any line containing an accusation keyword.
pub fn extract_accusations(lines: &[ChatLine], roster: &[Color]) -> Vec<Accusation> {
    lines
        .iter()
        .filter_map(|line| {
            let lower = line.text.to_lowercase();
            if !contains_any(&lower, ACCUSATION_KEYWORDS) {
                return None;
            }
            let target = mentioned_colors(&line.text, roster)
                .into_iter()
                .find(|c| *c != line.speaker)?;
            Some(Accusation {
                accuser: line.speaker,
                target,
                quote: line.text.clone(),
            })
        })
        .collect()
}

/// Chat suspicion per agent and whether the room wants to skip.
pub fn chat_signals(lines: &[ChatLine], roster: &[Color]) -> ChatSignals {
    let mut suspicion: BTreeMap<Color, f64> = BTreeMap::new();
    let mut skip_lines: usize = 0;
    for line in lines {
        let lower = line.text.to_lowercase();
        if contains_any(&lower, SKIP_KEYWORDS) {
            skip_lines = skip_lines.saturating_add(1);
        }
        let accusing = contains_any(&lower, SUSPICION_KEYWORDS);
        let clearing = contains_any(&lower, CLEARING_KEYWORDS);
        for named in mentioned_colors(&line.text, roster) {
            if named == line.speaker {
                continue;
            }
            let entry = suspicion.entry(named).or_insert(0.0);
            if accusing {
                *entry += SUSPICION_WEIGHT;
            }
            if clearing {
                *entry += CLEARING_WEIGHT;
            }
        }
    }
    // More than 2 lines and more than 30% of them about skipping.
    let skip_consensus = lines.len() > 2 && skip_lines.saturating_mul(10) > lines.len().saturating_mul(3);
    ChatSignals {
        suspicion,
        skip_consensus,
    }
}

/// Whether `text` reads as someone defending themselves.
pub fn is_defense(text: &str) -> bool {
    contains_any(&text.to_lowercase(), DEFENSE_KEYWORDS)
}

/// Defenses and alibi claims worth remembering, oldest first.
pub fn key_events(lines: &[ChatLine]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| {
            let lower = line.text.to_lowercase();
            if contains_any(&lower, DEFENSE_KEYWORDS) {
                Some(format!("{} defended: \"{}\"", line.speaker.name(), line.text))
            } else if contains_any(&lower, ALIBI_KEYWORDS) {
                Some(format!("{} claimed: \"{}\"", line.speaker.name(), line.text))
            } else {
                None
            }
        })
        .take(KEY_EVENT_CAP)
        .collect()
}

/// Follow and camp commands in a line typed by the human agent.
///
/// `bots` are the agents that may take orders. A follow line containing
/// `me` sends every named bot after the human; otherwise the first named bot
/// follows the second. A camp line needs a room; `everyone` addresses every
/// bot, otherwise only the named ones.
pub fn extract_commands(text: &str, bots: &[Color]) -> Vec<(Color, SocialCommand)> {
    let lower = text.to_lowercase();
    let named = mentioned_colors(text, bots);

    if contains_any(&lower, FOLLOW_KEYWORDS) {
        if has_word(text, "me") {
            return named
                .into_iter()
                .map(|c| (c, SocialCommand::FollowPlayer))
                .collect();
        }
        if let [first, second, ..] = named.as_slice() {
            return vec![(*first, SocialCommand::FollowAgent(*second))];
        }
        return Vec::new();
    }

    if contains_any(&lower, CAMP_KEYWORDS)
        && let Some(room) = mentioned_room(text)
    {
        let targets = if has_word(text, "everyone") {
            bots.to_vec()
        } else {
            named
        };
        return targets
            .into_iter()
            .map(|c| (c, SocialCommand::Camp(room)))
            .collect();
    }
    Vec::new()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(speaker: Color, text: &str) -> ChatLine {
        ChatLine::new(speaker, text)
    }

    #[test]
    fn names_match_whole_words_only() {
        let roster = [Color::Red, Color::Blue, Color::Lime];
        assert!(mentioned_colors("I'm tired of this", &roster).is_empty());
        assert_eq!(
            mentioned_colors("Blue and red, then blue again", &roster),
            vec![Color::Blue, Color::Red]
        );
    }

    #[test]
    fn accusation_targets_first_named_non_speaker() {
        let roster = [Color::Red, Color::Blue, Color::Green];
        let lines = [
            line(Color::Red, "Red here, I think Blue is sus"),
            line(Color::Green, "I was in Admin doing tasks"),
            line(Color::Blue, "Green and Red were together"),
        ];
        let found = extract_accusations(&lines, &roster);
        assert_eq!(found.len(), 1);
        let acc = found.first().unwrap();
        assert_eq!(acc.accuser, Color::Red);
        assert_eq!(acc.target, Color::Blue);
    }

    #[test]
    fn chat_suspicion_weighs_accusing_and_clearing_lines() {
        let roster = [Color::Red, Color::Blue, Color::Green];
        let lines = [
            line(Color::Green, "Red is sus"),
            line(Color::Blue, "vote red"),
            line(Color::Green, "Blue was with me, blue is safe"),
            line(Color::Red, "Red is innocent"),
        ];
        let signals = chat_signals(&lines, &roster);
        assert!((signals.of(Color::Red) - 4.0).abs() < f64::EPSILON);
        assert!((signals.of(Color::Blue) + 1.5).abs() < f64::EPSILON);
        assert!(signals.of(Color::Green).abs() < f64::EPSILON);
        assert!(!signals.skip_consensus);
    }

    #[test]
    fn skip_consensus_needs_volume_and_share() {
        let roster = [Color::Red];
        let two = [line(Color::Red, "skip"), line(Color::Red, "skip")];
        assert!(!chat_signals(&two, &roster).skip_consensus);

        let mixed = [
            line(Color::Red, "skip"),
            line(Color::Red, "where?"),
            line(Color::Red, "no idea"),
        ];
        assert!(chat_signals(&mixed, &roster).skip_consensus);

        let mostly_talk: Vec<ChatLine> = (0..10)
            .map(|i| line(Color::Red, if i < 3 { "skp" } else { "hmm" }))
            .collect();
        assert!(!chat_signals(&mostly_talk, &roster).skip_consensus);
    }

    #[test]
    fn key_events_capture_defenses_and_alibis() {
        let lines = [
            line(Color::Red, "It wasn't me!"),
            line(Color::Blue, "I was at Weapons"),
            line(Color::Green, "Let's vote"),
        ];
        let events = key_events(&lines);
        assert_eq!(events.len(), 2);
        assert!(events.first().unwrap().starts_with("Red defended"));
        assert!(events.get(1).unwrap().starts_with("Blue claimed"));
    }

    #[test]
    fn follow_me_sends_named_bots_after_the_human() {
        let bots = [Color::Red, Color::Blue, Color::Green];
        let cmds = extract_commands("Red, Blue follow me", &bots);
        assert_eq!(
            cmds,
            vec![
                (Color::Red, SocialCommand::FollowPlayer),
                (Color::Blue, SocialCommand::FollowPlayer),
            ]
        );
    }

    #[test]
    fn follow_without_me_tails_the_second_name() {
        let bots = [Color::Red, Color::Blue];
        let cmds = extract_commands("red, tail blue", &bots);
        assert_eq!(cmds, vec![(Color::Red, SocialCommand::FollowAgent(Color::Blue))]);
    }

    #[test]
    fn camp_everyone_in_a_room() {
        let bots = [Color::Red, Color::Blue];
        let cmds = extract_commands("everyone camp in Lower Engine", &bots);
        assert_eq!(
            cmds,
            vec![
                (Color::Red, SocialCommand::Camp(RoomId::LowerEngine)),
                (Color::Blue, SocialCommand::Camp(RoomId::LowerEngine)),
            ]
        );
        assert!(extract_commands("everyone camp somewhere", &bots).is_empty());
    }

    #[test]
    fn mentioned_room_prefers_earliest() {
        assert_eq!(mentioned_room("go to medbay then admin"), Some(RoomId::MedBay));
        assert_eq!(mentioned_room("Comms is quiet"), Some(RoomId::Communications));
        assert_eq!(mentioned_room("nowhere"), None);
    }
}
