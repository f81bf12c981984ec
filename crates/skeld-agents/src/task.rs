//! Task catalogue, balanced assignment, and per-agent progress cursors.
//!
//! Tasks are immutable templates in [`CATALOGUE`]. Agents hold references into
//! it plus a cursor (task index, step index). Impostors are assigned tasks as
//! well so they have somewhere plausible to stand; only crewmate steps count
//! toward the task bar.

use std::collections::BTreeMap;

use rand::Rng;
use skeld_types::{RoomId, TaskCategory};

use RoomId::{
    Admin, Cafeteria, Electrical, LowerEngine, MedBay, Navigation, O2, Reactor, Shields, Storage,
    UpperEngine, Weapons,
};
use TaskCategory::{Common, Long, Short};

/// Immutable task template.
#[derive(Debug, PartialEq, Eq)]
pub struct TaskDef {
    /// Stable identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Category.
    pub category: TaskCategory,
    /// Rooms visited in order, one per step.
    pub steps: &'static [RoomId],
    /// Time spent on each step.
    pub duration_ms: u64,
    /// Pause between consecutive steps, zero for none.
    pub wait_between_steps_ms: u64,
}

const fn task(
    id: &'static str,
    name: &'static str,
    category: TaskCategory,
    steps: &'static [RoomId],
    duration_ms: u64,
) -> TaskDef {
    TaskDef {
        id,
        name,
        category,
        steps,
        duration_ms,
        wait_between_steps_ms: 0,
    }
}

/// Every task on the Skeld.
pub static CATALOGUE: [TaskDef; 21] = [
    task("fix_wiring", "Fix Wiring", Common, &[Electrical, Cafeteria, Admin], 3000),
    task("swipe_card", "Swipe Card", Common, &[Admin], 4000),
    task("upload_data_caf", "Upload Data", Short, &[Cafeteria, Admin], 3500),
    task("upload_data_elec", "Upload Data", Short, &[Electrical, Admin], 3500),
    task("upload_data_weap", "Upload Data", Short, &[Weapons, Admin], 3500),
    task("upload_data_nav", "Upload Data", Short, &[Navigation, Admin], 3500),
    task("empty_garbage_caf", "Empty Garbage", Short, &[Cafeteria, Storage], 3000),
    task("empty_garbage_o2", "Empty Garbage", Short, &[O2, Storage], 3000),
    task("shoot_asteroids", "Clear Asteroids", Short, &[Weapons], 5000),
    task("divert_power_weap", "Divert Power", Short, &[Electrical, Weapons], 2000),
    task("divert_power_nav", "Divert Power", Short, &[Electrical, Navigation], 2000),
    task("calibrate_distributor", "Calibrate Distributor", Short, &[Electrical], 4000),
    task("stabilize_steering", "Stabilize Steering", Short, &[Navigation], 3000),
    task("chart_course", "Chart Course", Short, &[Navigation], 3000),
    task("clean_o2_filter", "Clean O2 Filter", Short, &[O2], 3500),
    task("prime_shields", "Prime Shields", Short, &[Shields], 3000),
    task("unlock_manifolds", "Unlock Manifolds", Short, &[Reactor], 3500),
    TaskDef {
        id: "inspect_sample",
        name: "Inspect Sample",
        category: Long,
        steps: &[MedBay, MedBay],
        duration_ms: 6000,
        wait_between_steps_ms: 10_000,
    },
    task("start_reactor", "Start Reactor", Long, &[Reactor], 7000),
    task("fuel_engines", "Fuel Engines", Long, &[Storage, UpperEngine, Storage, LowerEngine], 3000),
    task("submit_scan", "Submit Scan", Short, &[MedBay], 8000),
];

/// Look up a task by identifier.
pub fn find_task(id: &str) -> Option<&'static TaskDef> {
    CATALOGUE.iter().find(|t| t.id == id)
}

/// Pick a task list for one agent.
///
/// Every common task is included. Two or three short tasks and one long task
/// follow, preferring tasks that few other agents already hold; a jitter in
/// `(-1, 1)` on each count keeps popular tasks from being excluded outright.
pub fn assign_tasks(
    held_by_others: &BTreeMap<&'static str, usize>,
    rng: &mut impl Rng,
) -> Vec<&'static TaskDef> {
    let mut assigned: Vec<&'static TaskDef> =
        CATALOGUE.iter().filter(|t| t.category == Common).collect();

    let short_count = rng.random_range(2..=3);
    assigned.extend(least_held(Short, held_by_others, rng).into_iter().take(short_count));
    assigned.extend(least_held(Long, held_by_others, rng).into_iter().take(1));
    assigned
}

/// Tasks of `category` sorted by jittered holder count, least held first.
fn least_held(
    category: TaskCategory,
    held_by_others: &BTreeMap<&'static str, usize>,
    rng: &mut impl Rng,
) -> Vec<&'static TaskDef> {
    let mut keyed: Vec<(f64, &'static TaskDef)> = CATALOGUE
        .iter()
        .filter(|t| t.category == category)
        .map(|t| {
            #[allow(clippy::cast_precision_loss)]
            let held = held_by_others.get(t.id).copied().unwrap_or(0) as f64;
            (held + rng.random_range(-1.0..1.0), t)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, t)| t).collect()
}

/// The step an agent should work on next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStep {
    /// Task the step belongs to.
    pub task: &'static TaskDef,
    /// Zero-based step index within the task.
    pub index: usize,
    /// Room where the step is performed.
    pub room: RoomId,
}

/// What happened when a step was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Move on immediately.
    Continue,
    /// Pause this long before the next step of the same task.
    Wait(u64),
}

/// An agent's assigned tasks and progress cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<&'static TaskDef>,
    task_index: usize,
    step_index: usize,
    completed_steps: u32,
}

impl TaskList {
    /// Wrap a fresh assignment.
    pub const fn new(tasks: Vec<&'static TaskDef>) -> Self {
        Self {
            tasks,
            task_index: 0,
            step_index: 0,
            completed_steps: 0,
        }
    }

    /// Assigned tasks in order.
    pub fn tasks(&self) -> &[&'static TaskDef] {
        &self.tasks
    }

    /// Sum of steps across all assigned tasks.
    pub fn total_steps(&self) -> u32 {
        let total: usize = self.tasks.iter().map(|t| t.steps.len()).sum();
        u32::try_from(total).unwrap_or(u32::MAX)
    }

    /// Steps finished so far.
    pub const fn completed_steps(&self) -> u32 {
        self.completed_steps
    }

    /// The next step to perform, `None` once everything is done.
    pub fn current(&self) -> Option<TaskStep> {
        let task = *self.tasks.get(self.task_index)?;
        let room = *task.steps.get(self.step_index)?;
        Some(TaskStep {
            task,
            index: self.step_index,
            room,
        })
    }

    /// Advance past the current step.
    ///
    /// Returns `None` if there was no current step.
    pub fn complete_step(&mut self) -> Option<StepOutcome> {
        let task = *self.tasks.get(self.task_index)?;
        self.completed_steps = self.completed_steps.saturating_add(1);
        self.step_index = self.step_index.saturating_add(1);
        if self.step_index >= task.steps.len() {
            self.task_index = self.task_index.saturating_add(1);
            self.step_index = 0;
            return Some(StepOutcome::Continue);
        }
        if task.wait_between_steps_ms > 0 {
            return Some(StepOutcome::Wait(task.wait_between_steps_ms));
        }
        Some(StepOutcome::Continue)
    }

    /// Whether every step is finished.
    pub fn is_done(&self) -> bool {
        self.task_index >= self.tasks.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn catalogue_ids_are_unique() {
        let mut ids: Vec<_> = CATALOGUE.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), CATALOGUE.len());
    }

    #[test]
    fn assignment_shape() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let tasks = assign_tasks(&BTreeMap::new(), &mut rng);
            let count = |c| tasks.iter().filter(|t| t.category == c).count();
            assert_eq!(count(Common), 2);
            assert!((2..=3).contains(&count(Short)));
            assert_eq!(count(Long), 1);
        }
    }

    #[test]
    fn assignment_avoids_heavily_held_tasks() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut held = BTreeMap::new();
        held.insert("start_reactor", 10);
        held.insert("fuel_engines", 10);
        for _ in 0..20 {
            let tasks = assign_tasks(&held, &mut rng);
            let long = tasks.iter().find(|t| t.category == Long).unwrap();
            assert_eq!(long.id, "inspect_sample");
        }
    }

    #[test]
    fn multi_step_task_with_wait() {
        let mut list = TaskList::new(vec![find_task("inspect_sample").unwrap()]);
        assert_eq!(list.total_steps(), 2);
        assert_eq!(list.current().unwrap().room, MedBay);
        assert_eq!(list.complete_step(), Some(StepOutcome::Wait(10_000)));
        assert_eq!(list.current().unwrap().index, 1);
        assert_eq!(list.complete_step(), Some(StepOutcome::Continue));
        assert!(list.is_done());
        assert_eq!(list.current(), None);
        assert_eq!(list.complete_step(), None);
        assert_eq!(list.completed_steps(), 2);
    }

    #[test]
    fn cursor_walks_across_tasks() {
        let mut list = TaskList::new(vec![
            find_task("swipe_card").unwrap(),
            find_task("divert_power_nav").unwrap(),
        ]);
        assert_eq!(list.current().unwrap().room, Admin);
        list.complete_step();
        assert_eq!(list.current().unwrap().room, Electrical);
        list.complete_step();
        assert_eq!(list.current().unwrap().room, Navigation);
    }
}
