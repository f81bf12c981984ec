//! Knowledge summaries: the short factual lines an agent brings to a meeting.
//!
//! Crewmates report what they saw. Impostors report what they want others
//! to believe: the fabricated alibi room, a task in quotes, and a scapegoat
//! for the dialogue generator to point at.

use rand::Rng;
use rand::seq::IndexedRandom;
use skeld_types::{Color, Role};

use crate::agent::{Agent, Presence};

/// Sightings included in a crewmate's summary.
const SIGHTING_LINES: usize = 3;

/// Provider-chosen moves included in a crewmate's summary.
const DECISION_LINES: usize = 2;

/// Build `agent`'s meeting summary. `roster` supplies scapegoat candidates.
pub fn knowledge_summary(agent: &Agent, roster: &[Presence], rng: &mut impl Rng) -> Vec<String> {
    match agent.role {
        Role::Crewmate => crew_summary(agent),
        Role::Impostor => impostor_summary(agent, roster, rng),
    }
}

fn crew_summary(agent: &Agent) -> Vec<String> {
    let mut lines = vec![format!("I was in {}", agent.room.name())];
    if let Some(step) = agent.tasks.current() {
        lines.push(format!("doing {}", step.task.name));
    }
    if let Some(line) = alibi_line(agent.memory.clear_list()) {
        lines.push(line);
    }
    for s in agent.memory.sightings().iter().take(SIGHTING_LINES) {
        lines.push(format!(
            "saw {} in {} {}",
            s.color.name(),
            s.room.name(),
            s.activity.as_str()
        ));
    }
    let skip = agent.decisions.len().saturating_sub(DECISION_LINES);
    for d in agent.decisions.iter().skip(skip) {
        lines.push(format!("went from {} to {}", d.from.name(), d.to.name()));
    }
    lines
}

fn impostor_summary(agent: &Agent, roster: &[Presence], rng: &mut impl Rng) -> Vec<String> {
    let claimed = agent
        .impostor
        .as_ref()
        .and_then(|kit| kit.fake_alibi_room)
        .unwrap_or(agent.room);
    let mut lines = vec![format!("I claim I was in {}", claimed.name())];
    if let Some(step) = agent.tasks.current() {
        lines.push(format!("\"doing\" {}", step.task.name));
    }
    if let Some(line) = alibi_line(agent.memory.clear_list()) {
        lines.push(line);
    }

    let crew: Vec<Color> = roster
        .iter()
        .filter(|p| p.alive && p.role == Role::Crewmate && p.color != agent.color)
        .map(|p| p.color)
        .collect();
    if let Some(scapegoat) = crew.choose(rng) {
        lines.push(format!("scapegoat: {}", scapegoat.name()));
    }
    lines
}

fn alibi_line(cleared: &[Color]) -> Option<String> {
    if cleared.is_empty() {
        return None;
    }
    let names: Vec<&str> = cleared.iter().map(|c| c.name()).collect();
    Some(format!("alibi with {}", names.join(" and ")))
}
