//! Dependency-driven list scheduler.

use chrono::NaiveDateTime;

use crate::graph::DependencyGraph;
use crate::interner::TaskIdx;
use crate::log_changes;
use crate::log_debug;
use crate::models::{ScheduledTask, Task, TaskSchedule};

use super::calendar::{end_time, WorkingHours};

/// Places tasks on a timeline in topological order.
///
/// Each task starts as soon as the project has started and all of its
/// dependencies have finished. Workers are not levelled here; overlapping
/// work for one worker is left for conflict detection to report.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    pub working_hours: Option<WorkingHours>,
    pub verbosity: u8,
}

impl Scheduler {
    pub fn new(working_hours: Option<WorkingHours>, verbosity: u8) -> Self {
        Self {
            working_hours,
            verbosity,
        }
    }

    /// Build a schedule.
    ///
    /// # Arguments
    /// * `project_id` - Project the schedule belongs to
    /// * `tasks` - The tasks `graph` was built from, in the same order
    /// * `graph` - Dependency graph over `tasks`
    /// * `order` - A topological order from `graph`
    /// * `project_start` - No task starts before this instant
    /// * `deadline` - Requested project end, carried on the schedule
    pub fn schedule(
        &self,
        project_id: &str,
        tasks: &[Task],
        graph: &DependencyGraph,
        order: &[TaskIdx],
        project_start: NaiveDateTime,
        deadline: Option<NaiveDateTime>,
    ) -> TaskSchedule {
        let mut ends: Vec<Option<NaiveDateTime>> = vec![None; graph.len()];
        let mut scheduled = Vec::with_capacity(order.len());

        for &idx in order {
            let task = &tasks[idx];
            let ready = graph
                .predecessors(idx)
                .iter()
                .filter_map(|&dep| ends[dep])
                .max()
                .map_or(project_start, |dep_end| dep_end.max(project_start));

            let duration = graph.duration(idx);
            let end = end_time(ready, duration, self.working_hours.as_ref());
            ends[idx] = Some(end);

            log_debug!(
                self.verbosity,
                task_id = %task.id,
                start = %ready,
                end = %end,
                "Scheduled task"
            );

            scheduled.push(ScheduledTask {
                task_id: task.id.clone(),
                start: ready,
                end,
                duration_hours: duration,
                resources: task.assignee.iter().cloned().collect(),
                dependencies: graph
                    .predecessors(idx)
                    .iter()
                    .map(|&dep| graph.task_id(dep).to_string())
                    .collect(),
            });
        }

        let mut schedule = TaskSchedule {
            project_id: project_id.to_string(),
            tasks: scheduled,
            start_date: project_start,
            end_date: project_start,
            deadline,
            version: 0,
        };
        schedule.refresh_end_date();

        log_changes!(
            self.verbosity,
            project_id = %project_id,
            tasks = schedule.tasks.len(),
            end = %schedule.end_date,
            "Generated schedule"
        );

        schedule
    }
}

/// Shift `task_id` to start no earlier than `not_before`, then push every
/// dependent that would now start before one of its dependencies ends.
///
/// Task durations are preserved as wall-clock spans. Returns the number of
/// tasks moved.
pub fn shift_with_dependents(
    schedule: &mut TaskSchedule,
    task_id: &str,
    not_before: NaiveDateTime,
) -> usize {
    let Some(pos) = schedule.tasks.iter().position(|t| t.task_id == task_id) else {
        return 0;
    };
    if schedule.tasks[pos].start >= not_before {
        return 0;
    }
    move_to(&mut schedule.tasks[pos], not_before);
    let mut moved = 1;

    // Worklist of tasks whose end moved; each dependent is re-checked.
    let mut pending = vec![task_id.to_string()];
    let mut guard = 0usize;
    let limit = schedule.tasks.len() * schedule.tasks.len() + 1;
    while let Some(changed) = pending.pop() {
        guard += 1;
        if guard > limit {
            break;
        }
        let Some(changed_end) = schedule.get(&changed).map(|t| t.end) else {
            continue;
        };
        for task in schedule.tasks.iter_mut() {
            if task.dependencies.iter().any(|d| *d == changed) && task.start < changed_end {
                move_to(task, changed_end);
                moved += 1;
                pending.push(task.task_id.clone());
            }
        }
    }

    schedule.refresh_end_date();
    moved
}

/// Move a scheduled task to a new start, keeping its span.
pub fn move_to(task: &mut ScheduledTask, start: NaiveDateTime) {
    let span = task.end - task.start;
    task.start = start;
    task.end = start + span;
}
