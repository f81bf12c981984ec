//! Rule-based discussion and voting.
//!
//! This is the policy the meeting falls back on whenever the decision
//! provider is offline, slow, or unhelpful, so it must be able to carry an
//! entire meeting alone.
//!
//! A scripted discussion is built in four passes:
//!
//! 1. The reporter opens at 600 ms: a witnessed kill, a stack kill, a
//!    scientist's vitals, or a plain body report with an optional sighting
//!    at 2500 ms. Emergencies open with a call to order.
//! 2. Everyone else speaks in shuffled order from 4000 ms. Crewmates lead
//!    with the strongest thing they know and may add a second line;
//!    impostors state a fake alibi and then deflect.
//! 3. Each accused agent may defend themselves and alibi partners vouch.
//! 4. Up to three agents add a late thought.
//!
//! Votes follow [`rule_based_vote`].

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use skeld_agents::{Agent, Witness, jittered};
use skeld_types::{Activity, Color, ExtraRole, MeetingKind, Role, RoomId, Vote};
use skeld_world::ShipMap;

use crate::chat::ChatSignals;
use crate::history::MeetingHistory;

/// Delay of the reporter's opening line.
const REPORTER_DELAY_MS: u64 = 600;

/// Delay of the reporter's follow-up sighting.
const REPORTER_FOLLOWUP_MS: u64 = 2500;

/// Where the second pass starts.
const ROUND_START_MS: u64 = 4000;

/// The facts every speaker can see at the start of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingBrief {
    /// Body report or emergency.
    pub kind: MeetingKind,
    /// Who called the meeting.
    pub reporter: Color,
    /// Reported victim.
    pub victim: Option<Color>,
    /// Room of the body, `None` in a corridor or for emergencies.
    pub body_room: Option<RoomId>,
    /// Whether the kill happened in a crowd.
    pub stack_kill: bool,
}

/// A line the generator wants spoken `delay_ms` into the discussion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedLine {
    /// Speaker.
    pub speaker: Color,
    /// Text.
    pub text: String,
    /// Milliseconds after discussion starts.
    pub delay_ms: u64,
}

/// An accusation made inside the script, for later passes to react to.
#[derive(Debug, Clone, Copy)]
struct Claim {
    accused: Color,
}

/// One generated line and the accusation it carries, if any.
struct Said {
    text: String,
    accuses: Option<Color>,
}

impl Said {
    const fn plain(text: String) -> Self {
        Self {
            text,
            accuses: None,
        }
    }

    const fn accusing(text: String, accused: Color) -> Self {
        Self {
            text,
            accuses: Some(accused),
        }
    }
}

fn pick(rng: &mut impl Rng, options: Vec<String>) -> String {
    let len = options.len();
    if len == 0 {
        return String::new();
    }
    let i = rng.random_range(0..len);
    options.into_iter().nth(i).unwrap_or_default()
}

fn task_name(agent: &Agent) -> &'static str {
    agent.tasks.current().map_or("my tasks", |step| step.task.name)
}

const fn activity_phrase(activity: Activity) -> &'static str {
    match activity {
        Activity::Task => "doing a task",
        Activity::Idle => "standing around",
        Activity::Moving => "walking",
    }
}

fn room_label(room: Option<RoomId>) -> &'static str {
    room.map_or("the hallway", RoomId::name)
}

fn names(colors: &[Color]) -> String {
    colors.iter().map(|c| c.name()).collect::<Vec<_>>().join(" and ")
}

/// Build the full scripted discussion.
///
/// The human agent never gets lines. Delays are non-decreasing.
pub fn generate_discussion(
    agents: &[Agent],
    brief: &MeetingBrief,
    map: &ShipMap,
    rng: &mut impl Rng,
) -> Vec<ScriptedLine> {
    let alive: Vec<&Agent> = agents.iter().filter(|a| a.alive && !a.is_player).collect();
    let alive_colors: Vec<Color> = agents.iter().filter(|a| a.alive).map(|a| a.color).collect();
    let mut lines = Vec::new();
    let mut claims: Vec<Claim> = Vec::new();

    // Pass 1: the reporter.
    if let Some(reporter) = alive.iter().find(|a| a.color == brief.reporter) {
        for (said, delay_ms) in reporter_lines(reporter, brief, rng) {
            if let Some(accused) = said.accuses {
                claims.push(Claim { accused });
            }
            lines.push(ScriptedLine {
                speaker: reporter.color,
                text: said.text,
                delay_ms,
            });
        }
    }

    // Pass 2: everyone else.
    let mut others: Vec<&Agent> = alive
        .iter()
        .copied()
        .filter(|a| a.color != brief.reporter)
        .collect();
    others.shuffle(rng);
    let mut delay = ROUND_START_MS;
    for bot in others {
        let said = match bot.role {
            Role::Crewmate => crew_lines(bot, brief, &alive_colors, &claims, map, rng),
            Role::Impostor => impostor_lines(bot, brief, agents, &claims, rng),
        };
        for s in said {
            if let Some(accused) = s.accuses {
                claims.push(Claim { accused });
            }
            lines.push(ScriptedLine {
                speaker: bot.color,
                text: s.text,
                delay_ms: delay,
            });
            delay = delay.saturating_add(jittered(rng, 1800, 2500));
        }
    }

    // Pass 3: defenses and vouches.
    delay = delay.saturating_add(1000);
    for claim in claims.clone() {
        if let Some(accused) = alive.iter().find(|a| a.color == claim.accused)
            && rng.random::<f64>() < 0.8
        {
            lines.push(ScriptedLine {
                speaker: accused.color,
                text: self_defense(accused, rng),
                delay_ms: delay,
            });
            delay = delay.saturating_add(jittered(rng, 2000, 1500));
        }
        for bot in &alive {
            if bot.color == claim.accused || !bot.memory.is_cleared(claim.accused) {
                continue;
            }
            if rng.random::<f64>() >= 0.85 {
                continue;
            }
            let room = bot
                .memory
                .companions()
                .get(&claim.accused)
                .map(|c| c.room);
            lines.push(ScriptedLine {
                speaker: bot.color,
                text: vouch(claim.accused, room, rng),
                delay_ms: delay,
            });
            delay = delay.saturating_add(jittered(rng, 1500, 1200));
        }
    }

    // Pass 4: late thoughts.
    delay = delay.saturating_add(500);
    let mut late: Vec<&Agent> = alive.clone();
    late.shuffle(rng);
    for bot in late.into_iter().take(3) {
        if rng.random::<f64>() < bot.personality.talkativeness * 0.6 {
            lines.push(ScriptedLine {
                speaker: bot.color,
                text: late_thought(&claims, brief, map, rng),
                delay_ms: delay,
            });
            delay = delay.saturating_add(jittered(rng, 1500, 1500));
        }
    }

    lines
}

fn reporter_lines(reporter: &Agent, brief: &MeetingBrief, rng: &mut impl Rng) -> Vec<(Said, u64)> {
    let room = room_label(brief.body_room);
    let Some(victim) = brief.victim.filter(|_| brief.kind == MeetingKind::BodyReport) else {
        let text = pick(
            rng,
            vec![
                "EMERGENCY MEETING! something is off".to_owned(),
                "called this because i have info".to_owned(),
                "everyone listen, i need to tell you something".to_owned(),
            ],
        );
        return vec![(Said::plain(text), REPORTER_DELAY_MS)];
    };
    let v = victim.name();

    if let Some(Witness::SawKill { killer, victim: seen, .. }) = reporter.memory.witness()
        && seen == victim
    {
        let k = killer.name();
        let text = pick(
            rng,
            vec![
                format!("IT WAS {k}!! I WATCHED THEM KILL {v}!"),
                format!("{k} did it, i saw it happen in {room}"),
                format!("100% {k}, they killed {v} right in front of me"),
            ],
        );
        return vec![(Said::accusing(text, killer), REPORTER_DELAY_MS)];
    }

    if brief.stack_kill {
        let text = pick(
            rng,
            vec![
                format!("stack kill in {room}! way too many people, couldn't see who"),
                format!("{v} died in the crowd in {room}, no idea who did it"),
                format!("body in {room} but it was a stack, don't trust anyone who was there"),
            ],
        );
        return vec![(Said::plain(text), REPORTER_DELAY_MS)];
    }

    if reporter.extra_role == Some(ExtraRole::Scientist) {
        let text = pick(
            rng,
            vec![
                "vitals flatlined before i even found the body".to_owned(),
                format!("vitals confirmed it, {v} is gone"),
                "i was watching vitals and saw someone drop".to_owned(),
            ],
        );
        return vec![(Said::plain(text), REPORTER_DELAY_MS)];
    }

    let opener = pick(
        rng,
        vec![
            format!("found {v}'s body in {room}!!"),
            format!("{v} is dead in {room}!"),
            format!("body in {room}, it's {v}"),
            format!("just walked into {room} and {v} was dead"),
        ],
    );
    let mut out = vec![(Said::plain(opener), REPORTER_DELAY_MS)];

    let sightings: Vec<_> = reporter
        .memory
        .sightings()
        .iter()
        .filter(|s| s.color != reporter.color && s.color != victim)
        .collect();
    if let Some(s) = sightings.choose(rng)
        && rng.random::<f64>() < 0.7
    {
        let name = s.color.name();
        let seen_room = s.room.name();
        let text = pick(
            rng,
            vec![
                format!("i saw {name} {} near {seen_room} just before", activity_phrase(s.activity)),
                format!("last person i passed was {name} in {seen_room}"),
                format!("{name} was in {seen_room} when i walked by, might matter"),
            ],
        );
        out.push((Said::plain(text), REPORTER_FOLLOWUP_MS));
    }
    out
}

fn crew_lines(
    bot: &Agent,
    brief: &MeetingBrief,
    alive: &[Color],
    claims: &[Claim],
    map: &ShipMap,
    rng: &mut impl Rng,
) -> Vec<Said> {
    let mut out = vec![crew_opener(bot, rng)];
    if rng.random::<f64>() < bot.personality.talkativeness {
        out.push(crew_followup(bot, brief, alive, claims, map, rng));
    }
    out
}

fn crew_opener(bot: &Agent, rng: &mut impl Rng) -> Said {
    let room = bot.room.name();
    let task = task_name(bot);

    match bot.memory.witness() {
        Some(Witness::SawKill { killer, victim, room: kill_room }) => {
            let (k, v, r) = (killer.name(), victim.name(), kill_room.name());
            let text = pick(
                rng,
                vec![
                    format!("I SAW {k} KILL {v} IN {r}!"),
                    format!("vote {k}, i literally watched them kill {v}"),
                    format!("it's {k}, they killed {v} in {r} and i saw it"),
                ],
            );
            return Said::accusing(text, killer);
        }
        Some(Witness::SawStackKill { room: kill_room, .. }) => {
            let r = kill_room.name();
            let text = pick(
                rng,
                vec![
                    format!("i was there in {r} but it was a stack, couldn't see who"),
                    format!("that was a stack kill in {r} for sure"),
                    format!("too many people in {r} when it happened"),
                ],
            );
            return Said::plain(text);
        }
        _ => {}
    }

    if let Some(partner) = bot.memory.clear_list().choose(rng)
        && rng.random::<f64>() < 0.6
    {
        let p = partner.name();
        let text = pick(
            rng,
            vec![
                format!("i was in {room} with {p}, we're both clear"),
                format!("me and {p} were together in {room} doing tasks"),
                format!("{p} and i were in {room} the whole time"),
                format!("i was doing {task} in {room}, {p} was right there"),
            ],
        );
        return Said::plain(text);
    }

    Said::plain(pick(
        rng,
        vec![
            format!("i was in {room} doing {task}"),
            format!("was doing {task} in {room}"),
            format!("been in {room} the whole time"),
            format!("just came from {room}, doing {task}"),
        ],
    ))
}

fn crew_followup(
    bot: &Agent,
    brief: &MeetingBrief,
    alive: &[Color],
    claims: &[Claim],
    map: &ShipMap,
    rng: &mut impl Rng,
) -> Said {
    let roll: f64 = rng.random();
    let suspicious: Vec<_> = bot
        .memory
        .sightings()
        .iter()
        .filter(|s| s.color != bot.color && alive.contains(&s.color) && !bot.memory.is_cleared(s.color))
        .collect();

    if roll < 0.35 * bot.personality.confidence
        && let Some(s) = suspicious.choose(rng)
    {
        let (name, seen_room) = (s.color.name(), s.room.name());
        let near_body = brief
            .body_room
            .is_some_and(|body| s.room == body || map.are_adjacent(body, s.room));
        if near_body {
            let body = room_label(brief.body_room);
            let text = pick(
                rng,
                vec![
                    format!("{name} was in {seen_room} right by the body, that's sus"),
                    format!("i saw {name} near {seen_room}, pretty close to {body}"),
                    format!("{name} was {} in {seen_room} near the body.. vote {name}?", activity_phrase(s.activity)),
                ],
            );
            return Said::accusing(text, s.color);
        }
        let text = pick(
            rng,
            vec![
                format!("i saw {name} in {seen_room} {}", activity_phrase(s.activity)),
                format!("{name} was in {seen_room}, not sure what they were up to"),
                format!("last i saw {name} they were in {seen_room}"),
            ],
        );
        return Said::plain(text);
    }

    if roll < 0.6
        && let Some(claim) = claims.choose(rng)
        && rng.random::<f64>() < bot.personality.paranoia
    {
        let a = claim.accused.name();
        return Said::plain(pick(
            rng,
            vec![
                format!("yeah {a} is sus, i agree"),
                format!("i was thinking the same about {a}"),
                format!("vote {a}, they've been sketchy"),
                format!("{a} has been really quiet and sus"),
            ],
        ));
    }

    if roll < 0.75 {
        let room = bot.room.name();
        return Said::plain(pick(
            rng,
            vec![
                "where was everyone?".to_owned(),
                "anyone see anything sus?".to_owned(),
                "who was near the body?".to_owned(),
                format!("anyone else in {room}?"),
                "what was everyone doing?".to_owned(),
            ],
        ));
    }

    Said::plain(pick(
        rng,
        vec![
            "not enough info, skip?".to_owned(),
            "no idea who it is, maybe skip this one".to_owned(),
            "let's not random vote, skip".to_owned(),
        ],
    ))
}

fn impostor_lines(
    bot: &Agent,
    brief: &MeetingBrief,
    agents: &[Agent],
    claims: &[Claim],
    rng: &mut impl Rng,
) -> Vec<Said> {
    let alibi = bot
        .impostor
        .as_ref()
        .and_then(|kit| kit.fake_alibi_room)
        .unwrap_or(bot.room);
    let room = alibi.name();
    let task = task_name(bot);
    let crew: Vec<Color> = agents
        .iter()
        .filter(|a| a.alive && a.role == Role::Crewmate && a.color != bot.color)
        .map(|a| a.color)
        .collect();
    let partners: Vec<Color> = agents
        .iter()
        .filter(|a| a.role == Role::Impostor && a.color != bot.color)
        .map(|a| a.color)
        .collect();

    let opener = match bot.memory.clear_list().choose(rng) {
        Some(partner) => {
            let p = partner.name();
            pick(
                rng,
                vec![
                    format!("i was with {p} in {room} doing {task}"),
                    format!("me and {p} were in {room}, we're clear"),
                    format!("{p} can confirm i was in {room}"),
                ],
            )
        }
        None => pick(
            rng,
            vec![
                format!("i was in {room} doing {task}"),
                format!("was doing {task} in {room}, didn't see anything"),
                format!("just came from {room}, was doing my tasks"),
            ],
        ),
    };
    let mut out = vec![Said::plain(opener)];

    let accused_me = claims.iter().any(|c| c.accused == bot.color);
    if accused_me && rng.random::<f64>() < 0.8 {
        out.push(Said::plain(self_defense(bot, rng)));
        return out;
    }

    if rng.random::<f64>() < 0.4
        && let Some(scapegoat) = crew.choose(rng)
    {
        let s = scapegoat.name();
        let victim = brief.victim.map_or("someone", Color::name);
        let near = brief.body_room.map_or(room, RoomId::name);
        let text = pick(
            rng,
            vec![
                format!("ngl {s} was acting weird around {room}"),
                format!("has anyone noticed {s} being sus? they were lurking"),
                format!("i think i saw {s} following {victim} earlier"),
                format!("i'm voting {s}, they were near {near}"),
            ],
        );
        out.push(Said::accusing(text, *scapegoat));
        return out;
    }

    if rng.random::<f64>() < 0.65 && !claims.is_empty() {
        let usable: Vec<&Claim> = claims
            .iter()
            .filter(|c| !partners.contains(&c.accused) && c.accused != bot.color)
            .collect();
        if let Some(claim) = usable.choose(rng) {
            let a = claim.accused.name();
            out.push(Said::plain(pick(
                rng,
                vec![
                    format!("yeah {a} is sus, vote them"),
                    format!("agreed, {a} was being weird"),
                    format!("{a} is definitely the impostor"),
                    format!("let's vote {a}, i don't trust them"),
                ],
            )));
        }
        return out;
    }

    out.push(Said::plain(pick(
        rng,
        vec![
            "this is scary, we need to find them".to_owned(),
            "no clue who it is, be careful".to_owned(),
            "does anyone have actual proof?".to_owned(),
            "we shouldn't random vote".to_owned(),
        ],
    )));
    out
}

/// What an accused agent says back.
fn self_defense(bot: &Agent, rng: &mut impl Rng) -> String {
    let room = bot.room.name();
    let task = task_name(bot);
    let cleared = bot.memory.clear_list();

    if !cleared.is_empty() {
        let partners = names(cleared);
        return pick(
            rng,
            vec![
                format!("not me!! i was with {partners} in {room} the whole time"),
                format!("ask {partners}, we were together in {room}"),
                format!("{partners} can vouch for me, we were doing tasks in {room}"),
            ],
        );
    }

    if let Some(kit) = bot.impostor.as_ref() {
        let alibi = kit.fake_alibi_room.unwrap_or(bot.room).name();
        return pick(
            rng,
            vec![
                format!("it wasn't me, i was in {alibi} doing {task}"),
                format!("why me?? i was in {alibi}"),
                format!("i was nowhere near the body, i was in {alibi}"),
                "voting me is a waste, i'm clean".to_owned(),
            ],
        );
    }

    pick(
        rng,
        vec![
            format!("it's not me! i was doing {task} in {room}"),
            format!("why would i report if it was me? i was in {room}"),
            format!("i'm a crewmate doing {task}, vote me and you lose"),
            format!("i was in {room} the entire round, i swear"),
        ],
    )
}

fn vouch(accused: Color, room: Option<RoomId>, rng: &mut impl Rng) -> String {
    let a = accused.name();
    let r = room_label(room);
    pick(
        rng,
        vec![
            format!("can't be {a}, they were with me in {r} the whole time"),
            format!("{a} is clear, i was with them in {r}"),
            format!("i can vouch for {a}, we were together in {r}"),
            format!("we were both in {r}, no way it's {a}"),
        ],
    )
}

fn late_thought(claims: &[Claim], brief: &MeetingBrief, map: &ShipMap, rng: &mut impl Rng) -> String {
    if let Some(claim) = claims.choose(rng)
        && rng.random::<f64>() < 0.6
    {
        let a = claim.accused.name();
        return if rng.random::<f64>() < 0.5 {
            pick(
                rng,
                vec![
                    format!("actually yeah, i think {a} did it"),
                    format!("vote {a}, it adds up"),
                    format!("{a} still hasn't given a real alibi"),
                ],
            )
        } else {
            pick(
                rng,
                vec![
                    format!("wait, are we sure about {a}?"),
                    format!("not convinced about {a} tbh"),
                    format!("we might be wrong about {a}, careful"),
                ],
            )
        };
    }

    if brief.kind == MeetingKind::BodyReport
        && let Some(body) = brief.body_room
        && let Some(next) = map.adjacent_rooms(body).choose(rng)
    {
        let (b, n) = (body.name(), next.name());
        return pick(
            rng,
            vec![
                format!("the body was in {b}, killer probably came from {n}"),
                format!("whoever was near {b} is sus"),
                format!("was anyone in {n}? that's right next to {b}"),
            ],
        );
    }

    pick(
        rng,
        vec![
            "we need to figure this out before it's too late".to_owned(),
            "just vote whoever you think is sus".to_owned(),
            "the impostors are sneaky this game".to_owned(),
            "we're running out of time".to_owned(),
        ],
    )
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

/// Suspicion a crewmate needs before voting for anyone.
const VOTE_THRESHOLD: f64 = 1.2;

/// Raised threshold while the room leans toward skipping.
const SKIP_CONSENSUS_THRESHOLD: f64 = 3.5;

/// A score above this overrides a skip consensus.
const OVERRIDE_SKIP_SCORE: f64 = 6.0;

fn count_as_f64(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}

/// The ballot `voter` casts without help.
///
/// A witnessed killer who is still alive always gets the vote. Impostors
/// vote a random crewmate most of the time and never a partner. Crewmates
/// score every other living agent on evidence and chat, add noise scaled by
/// paranoia, and skip unless the leader clears a threshold.
pub fn rule_based_vote(
    voter: &Agent,
    agents: &[Agent],
    brief: &MeetingBrief,
    signals: &ChatSignals,
    history: &MeetingHistory,
    map: &ShipMap,
    rng: &mut impl Rng,
) -> Vote {
    let others: Vec<&Agent> = agents
        .iter()
        .filter(|a| a.alive && a.color != voter.color)
        .collect();
    if others.is_empty() {
        return Vote::Skip;
    }

    if let Some(Witness::SawKill { killer, .. }) = voter.memory.witness()
        && others.iter().any(|a| a.color == killer)
    {
        return Vote::Player(killer);
    }

    if voter.role == Role::Impostor {
        let crew: Vec<Color> = others
            .iter()
            .filter(|a| a.role == Role::Crewmate)
            .map(|a| a.color)
            .collect();
        if let Some(target) = crew.choose(rng)
            && rng.random::<f64>() < 0.75
        {
            return Vote::Player(*target);
        }
        if rng.random::<f64>() < 0.2 {
            return Vote::Skip;
        }
        return crew.choose(rng).map_or(Vote::Skip, |c| Vote::Player(*c));
    }

    let mut scores: BTreeMap<Color, f64> = others.iter().map(|a| (a.color, 0.0)).collect();

    for s in voter.memory.sightings() {
        let Some(score) = scores.get_mut(&s.color) else {
            continue;
        };
        if let Some(body) = brief.body_room {
            if s.room == body {
                *score += 3.0;
            } else if map.are_adjacent(body, s.room) {
                *score += 1.5;
            }
        }
        if s.activity == Activity::Idle {
            *score += 0.5;
        }
    }

    let loyalty = voter.personality.loyalty;
    for (color, score) in &mut scores {
        if voter.memory.is_cleared(*color) {
            *score -= 4.0 * loyalty;
        }
        *score += signals.of(*color);
        *score += 0.5 * count_as_f64(history.accusations_against(*color));
        *score += 1.5 * count_as_f64(history.innocent_pushes(*color));
    }

    if signals.skip_consensus
        && rng.random::<f64>() < 0.8
        && !scores.values().any(|s| *s > OVERRIDE_SKIP_SCORE)
    {
        return Vote::Skip;
    }

    let paranoia = voter.personality.paranoia;
    for score in scores.values_mut() {
        *score += (rng.random::<f64>() - 0.3) * paranoia * 2.5;
    }

    let mut best: Option<(Color, f64)> = None;
    for (color, score) in &scores {
        if best.is_none_or(|(_, b)| *score > b) {
            best = Some((*color, *score));
        }
    }

    let threshold = if signals.skip_consensus {
        SKIP_CONSENSUS_THRESHOLD
    } else {
        VOTE_THRESHOLD
    };
    match best {
        Some((color, score)) if score >= threshold && rng.random::<f64>() >= 0.1 => Vote::Player(color),
        _ => Vote::Skip,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use skeld_agents::{Observation, Tuning};
    use skeld_types::{Point, Rect};

    use super::*;
    use crate::chat::ChatLine;

    fn make_map() -> ShipMap {
        let mut map = ShipMap::new(2000.0, 1000.0);
        map.add_room(RoomId::Admin, Rect::new(0.0, 0.0, 300.0, 300.0), Point::new(150.0, 150.0))
            .unwrap();
        map.add_room(
            RoomId::Storage,
            Rect::new(400.0, 0.0, 300.0, 300.0),
            Point::new(550.0, 150.0),
        )
        .unwrap();
        map.add_room(
            RoomId::Reactor,
            Rect::new(1500.0, 0.0, 300.0, 300.0),
            Point::new(1650.0, 150.0),
        )
        .unwrap();
        map.set_adjacent(RoomId::Admin, &[RoomId::Storage]).unwrap();
        map
    }

    fn make_agents(rng: &mut SmallRng) -> Vec<Agent> {
        let tuning = Tuning::default();
        [
            (Color::Red, Role::Impostor),
            (Color::Blue, Role::Crewmate),
            (Color::Green, Role::Crewmate),
            (Color::Pink, Role::Crewmate),
            (Color::Black, Role::Impostor),
            (Color::White, Role::Crewmate),
        ]
        .into_iter()
        .map(|(c, r)| Agent::new(c, r, Point::new(150.0, 150.0), &tuning, rng))
        .collect()
    }

    fn body_brief() -> MeetingBrief {
        MeetingBrief {
            kind: MeetingKind::BodyReport,
            reporter: Color::Green,
            victim: Some(Color::White),
            body_room: Some(RoomId::Admin),
            stack_kill: false,
        }
    }

    fn find(agents: &mut [Agent], color: Color) -> &mut Agent {
        agents.iter_mut().find(|a| a.color == color).unwrap()
    }

    #[test]
    fn witness_reporter_opens_with_the_killer() {
        let mut rng = SmallRng::seed_from_u64(4);
        let map = make_map();
        let mut agents = make_agents(&mut rng);
        find(&mut agents, Color::White).die(0);
        find(&mut agents, Color::Green).memory.record_witness(Witness::SawKill {
            killer: Color::Red,
            victim: Color::White,
            room: RoomId::Admin,
        });

        let script = generate_discussion(&agents, &body_brief(), &map, &mut rng);
        let first = script.first().unwrap();
        assert_eq!(first.speaker, Color::Green);
        assert_eq!(first.delay_ms, REPORTER_DELAY_MS);
        assert!(first.text.contains("Red") || first.text.contains("RED"));
    }

    #[test]
    fn script_covers_every_living_bot_in_order() {
        let map = make_map();
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut agents = make_agents(&mut rng);
            find(&mut agents, Color::White).die(0);
            find(&mut agents, Color::Pink).is_player = true;

            let script = generate_discussion(&agents, &body_brief(), &map, &mut rng);
            for a in agents.iter().filter(|a| a.alive && !a.is_player) {
                assert!(script.iter().any(|l| l.speaker == a.color), "{} never spoke", a.color);
            }
            assert!(!script.iter().any(|l| l.speaker == Color::Pink));
            assert!(!script.iter().any(|l| l.speaker == Color::White));
            assert!(
                script
                    .windows(2)
                    .all(|w| matches!(w, [a, b] if a.delay_ms <= b.delay_ms))
            );
            assert!(script.iter().all(|l| !l.text.is_empty()));
        }
    }

    #[test]
    fn emergency_opens_without_a_body() {
        let mut rng = SmallRng::seed_from_u64(9);
        let map = make_map();
        let agents = make_agents(&mut rng);
        let brief = MeetingBrief {
            kind: MeetingKind::Emergency,
            reporter: Color::Blue,
            victim: None,
            body_room: None,
            stack_kill: false,
        };
        let script = generate_discussion(&agents, &brief, &map, &mut rng);
        assert_eq!(script.first().unwrap().speaker, Color::Blue);
        assert_eq!(script.iter().filter(|l| l.delay_ms == REPORTER_DELAY_MS).count(), 1);
    }

    #[test]
    fn witness_votes_the_killer() {
        let mut rng = SmallRng::seed_from_u64(1);
        let map = make_map();
        let mut agents = make_agents(&mut rng);
        find(&mut agents, Color::Blue).memory.record_witness(Witness::SawKill {
            killer: Color::Black,
            victim: Color::White,
            room: RoomId::Admin,
        });
        let history = MeetingHistory::new();
        let voter = agents.iter().find(|a| a.color == Color::Blue).unwrap();
        let vote = rule_based_vote(
            voter,
            &agents,
            &body_brief(),
            &ChatSignals::default(),
            &history,
            &map,
            &mut rng,
        );
        assert_eq!(vote, Vote::Player(Color::Black));
    }

    #[test]
    fn impostors_never_vote_a_partner() {
        let map = make_map();
        let history = MeetingHistory::new();
        for seed in 0..100 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let agents = make_agents(&mut rng);
            let red = agents.first().unwrap();
            let vote = rule_based_vote(
                red,
                &agents,
                &body_brief(),
                &ChatSignals::default(),
                &history,
                &map,
                &mut rng,
            );
            assert_ne!(vote, Vote::Player(Color::Black));
            assert_ne!(vote, Vote::Player(Color::Red));
        }
    }

    #[test]
    fn crewmate_without_evidence_skips() {
        let map = make_map();
        let history = MeetingHistory::new();
        for seed in 0..50 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let agents = make_agents(&mut rng);
            let blue = agents.get(1).unwrap();
            let vote = rule_based_vote(
                blue,
                &agents,
                &body_brief(),
                &ChatSignals::default(),
                &history,
                &map,
                &mut rng,
            );
            assert_eq!(vote, Vote::Skip);
        }
    }

    #[test]
    fn crewmate_votes_the_agent_seen_at_the_body() {
        let map = make_map();
        let history = MeetingHistory::new();
        let tuning = Tuning::default();
        let mut hits = 0;
        for seed in 0..50 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut agents = make_agents(&mut rng);
            find(&mut agents, Color::Blue).memory.observe(
                1000,
                &[Observation {
                    color: Color::Pink,
                    room: RoomId::Admin,
                    activity: Activity::Moving,
                }],
                &tuning.agent,
            );
            let blue = agents.get(1).unwrap();
            match rule_based_vote(
                blue,
                &agents,
                &body_brief(),
                &ChatSignals::default(),
                &history,
                &map,
                &mut rng,
            ) {
                Vote::Player(c) => {
                    assert_eq!(c, Color::Pink);
                    hits += 1;
                }
                Vote::Skip => {}
            }
        }
        assert!(hits >= 35, "only {hits} votes for the agent at the body");
    }

    #[test]
    fn skip_consensus_wins_without_strong_evidence() {
        let map = make_map();
        let history = MeetingHistory::new();
        let lines: Vec<ChatLine> = (0..4).map(|_| ChatLine::new(Color::Green, "skip")).collect();
        let signals = crate::chat::chat_signals(&lines, &[Color::Green]);
        assert!(signals.skip_consensus);
        for seed in 0..50 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let agents = make_agents(&mut rng);
            let blue = agents.get(1).unwrap();
            let vote = rule_based_vote(blue, &agents, &body_brief(), &signals, &history, &map, &mut rng);
            assert_eq!(vote, Vote::Skip);
        }
    }
}
