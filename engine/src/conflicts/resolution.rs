//! Conflict resolution over a working copy of a schedule.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::log_changes;
use crate::log_checks;
use crate::models::TaskSchedule;
use crate::scheduler::calendar::hours_between;
use crate::scheduler::{move_to, shift_with_dependents, ResourceSchedule};

use super::detection::overlaps;
use super::{ConflictType, ScheduleConflict, Severity};

/// How far resolution may go without further caller input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Fix low and medium conflicts; report high ones untouched.
    #[default]
    Automatic,
    /// Fix every conflict with the default action for its type.
    AllowHighSeverity,
    /// Fix every conflict, moving resource clashes to a free worker from
    /// `pool` before falling back to staggering.
    Reassign { pool: Vec<String> },
}

impl ResolutionStrategy {
    fn permits(&self, severity: Severity) -> bool {
        match self {
            ResolutionStrategy::Automatic => severity.is_auto_resolvable(),
            ResolutionStrategy::AllowHighSeverity | ResolutionStrategy::Reassign { .. } => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Delay a task to its workers' next free slot.
    Stagger {
        task_id: String,
        new_start: NaiveDateTime,
    },
    /// Hand a task's clashing workers over to another worker.
    Reassign {
        task_id: String,
        from: Vec<String>,
        to: String,
    },
    /// Move a task back inside the project window.
    ClipToWindow {
        task_id: String,
        new_start: NaiveDateTime,
    },
    /// Delay a task until all of its dependencies are done.
    Resequence {
        task_id: String,
        new_start: NaiveDateTime,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub conflict: ScheduleConflict,
    /// `None` when the conflict had already disappeared.
    pub action: Option<ResolutionAction>,
    pub steps: Vec<String>,
    pub success: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub schedule: TaskSchedule,
    pub resolutions: Vec<ConflictResolution>,
    /// Conflicts skipped for severity or whose resolution failed.
    pub unresolved: Vec<ScheduleConflict>,
}

/// Resolve conflicts against a copy of `schedule`.
///
/// Conflicts are handled in severity order (high first, stable within a
/// level). Moving a task also pushes back any dependent that would start
/// before it finishes. The returned schedule carries a bumped version when
/// anything moved.
pub fn resolve_conflicts(
    schedule: &TaskSchedule,
    conflicts: &[ScheduleConflict],
    strategy: &ResolutionStrategy,
    verbosity: u8,
) -> ResolutionOutcome {
    let mut working = schedule.clone();
    let mut ordered: Vec<&ScheduleConflict> = conflicts.iter().collect();
    ordered.sort_by(|a, b| b.severity.cmp(&a.severity));

    let mut resolutions = Vec::new();
    let mut unresolved = Vec::new();
    let mut changed = false;

    for conflict in ordered {
        if !strategy.permits(conflict.severity) {
            log_checks!(
                verbosity,
                tasks = ?conflict.task_ids,
                "Leaving high-severity conflict for caller"
            );
            unresolved.push(conflict.clone());
            continue;
        }

        let resolution = match conflict.conflict_type {
            ConflictType::Resource => resolve_resource(&mut working, conflict, strategy),
            ConflictType::Time => resolve_time(&mut working, conflict),
            ConflictType::Dependency => resolve_dependency(&mut working, conflict),
        };

        if resolution.action.is_some() && resolution.success {
            changed = true;
            log_changes!(verbosity, action = ?resolution.action, "Resolved conflict");
        }
        if !resolution.success {
            unresolved.push(conflict.clone());
        }
        resolutions.push(resolution);
    }

    if changed {
        working.refresh_end_date();
        working.version += 1;
    }

    ResolutionOutcome {
        schedule: working,
        resolutions,
        unresolved,
    }
}

fn already_resolved(conflict: &ScheduleConflict) -> ConflictResolution {
    ConflictResolution {
        conflict: conflict.clone(),
        action: None,
        steps: vec!["No longer conflicting after earlier changes".to_string()],
        success: true,
    }
}

fn failed(conflict: &ScheduleConflict, reason: String) -> ConflictResolution {
    ConflictResolution {
        conflict: conflict.clone(),
        action: None,
        steps: vec![reason],
        success: false,
    }
}

/// Busy time of `worker` across the schedule, ignoring task `skip`.
fn busy_calendar(schedule: &TaskSchedule, worker: &str, skip: &str) -> ResourceSchedule {
    let mut rs = ResourceSchedule::new(worker);
    for task in &schedule.tasks {
        if task.task_id != skip && task.resources.iter().any(|r| r == worker) {
            rs.add_busy_period(task.start, task.end);
        }
    }
    rs
}

fn resolve_resource(
    schedule: &mut TaskSchedule,
    conflict: &ScheduleConflict,
    strategy: &ResolutionStrategy,
) -> ConflictResolution {
    let [first_id, second_id] = conflict.task_ids.as_slice() else {
        return failed(conflict, "Resource conflict must name two tasks".to_string());
    };
    let (Some(first), Some(second)) = (schedule.get(first_id), schedule.get(second_id)) else {
        return failed(conflict, "Conflicting task missing from schedule".to_string());
    };

    let shared: Vec<String> = conflict
        .resources
        .iter()
        .filter(|r| first.resources.contains(*r) && second.resources.contains(*r))
        .cloned()
        .collect();
    if shared.is_empty() || !overlaps(first, second) {
        return already_resolved(conflict);
    }

    // The task starting later yields; ties go to the second-listed task.
    let later_id = if first.start > second.start {
        first_id.clone()
    } else {
        second_id.clone()
    };
    let Some(later) = schedule.get(&later_id).cloned() else {
        return failed(conflict, "Conflicting task missing from schedule".to_string());
    };

    if let ResolutionStrategy::Reassign { pool } = strategy {
        let free = pool.iter().find(|worker| {
            !later.resources.contains(*worker)
                && busy_calendar(schedule, worker, &later_id).is_available(later.start, later.end)
        });
        if let Some(worker) = free {
            let worker = worker.clone();
            if let Some(task) = schedule.tasks.iter_mut().find(|t| t.task_id == later_id) {
                task.resources.retain(|r| !shared.contains(r));
                task.resources.push(worker.clone());
            }
            return ConflictResolution {
                conflict: conflict.clone(),
                steps: vec![format!(
                    "Moved {} from {} to {}",
                    later_id,
                    shared.join(", "),
                    worker
                )],
                action: Some(ResolutionAction::Reassign {
                    task_id: later_id,
                    from: shared,
                    to: worker,
                }),
                success: true,
            };
        }
    }

    // Stagger: the earliest start at which every shared worker is free.
    let calendars: Vec<ResourceSchedule> = shared
        .iter()
        .map(|w| busy_calendar(schedule, w, &later_id))
        .collect();
    let hours = hours_between(later.start, later.end);
    let mut new_start = later.start;
    loop {
        let next = calendars
            .iter()
            .map(|rs| rs.next_available_slot(new_start, hours))
            .max()
            .unwrap_or(new_start);
        if next == new_start {
            break;
        }
        new_start = next;
    }

    let moved = shift_with_dependents(schedule, &later_id, new_start);
    ConflictResolution {
        conflict: conflict.clone(),
        steps: vec![
            format!("Delayed {} from {} to {}", later_id, later.start, new_start),
            format!("{} task(s) moved including dependents", moved),
        ],
        action: Some(ResolutionAction::Stagger {
            task_id: later_id,
            new_start,
        }),
        success: true,
    }
}

fn resolve_time(schedule: &mut TaskSchedule, conflict: &ScheduleConflict) -> ConflictResolution {
    let Some(task_id) = conflict.task_ids.first() else {
        return failed(conflict, "Time conflict must name a task".to_string());
    };
    let Some(task) = schedule.get(task_id).cloned() else {
        return failed(conflict, "Conflicting task missing from schedule".to_string());
    };
    let window_start = schedule.start_date;
    let window_end = schedule.window_end();

    if task.start < window_start {
        let moved = shift_with_dependents(schedule, task_id, window_start);
        return ConflictResolution {
            conflict: conflict.clone(),
            steps: vec![
                format!("Moved {} to the project start {}", task_id, window_start),
                format!("{} task(s) moved including dependents", moved),
            ],
            action: Some(ResolutionAction::ClipToWindow {
                task_id: task_id.clone(),
                new_start: window_start,
            }),
            success: true,
        };
    }

    if task.end <= window_end {
        return already_resolved(conflict);
    }

    // Pull the task back so it ends at the window end, without breaking its
    // own dependencies or leaving the window.
    let new_start = window_end - (task.end - task.start);
    let deps_done = task
        .dependencies
        .iter()
        .filter_map(|d| schedule.get(d))
        .map(|d| d.end)
        .max()
        .unwrap_or(window_start);
    if new_start < window_start || new_start < deps_done {
        return failed(
            conflict,
            format!("{} cannot finish by {} after its dependencies", task_id, window_end),
        );
    }

    if let Some(slot) = schedule.tasks.iter_mut().find(|t| t.task_id == *task_id) {
        move_to(slot, new_start);
    }
    ConflictResolution {
        conflict: conflict.clone(),
        steps: vec![format!("Pulled {} forward to {}", task_id, new_start)],
        action: Some(ResolutionAction::ClipToWindow {
            task_id: task_id.clone(),
            new_start,
        }),
        success: true,
    }
}

fn resolve_dependency(
    schedule: &mut TaskSchedule,
    conflict: &ScheduleConflict,
) -> ConflictResolution {
    let Some(task_id) = conflict.task_ids.last() else {
        return failed(conflict, "Dependency conflict must name tasks".to_string());
    };
    let Some(task) = schedule.get(task_id).cloned() else {
        return failed(conflict, "Conflicting task missing from schedule".to_string());
    };

    let Some(deps_done) = task
        .dependencies
        .iter()
        .filter_map(|d| schedule.get(d))
        .map(|d| d.end)
        .max()
    else {
        return already_resolved(conflict);
    };
    if task.start >= deps_done {
        return already_resolved(conflict);
    }

    let moved = shift_with_dependents(schedule, task_id, deps_done);
    ConflictResolution {
        conflict: conflict.clone(),
        steps: vec![
            format!("Re-sequenced {} after its dependencies at {}", task_id, deps_done),
            format!("{} task(s) moved including dependents", moved),
        ],
        action: Some(ResolutionAction::Resequence {
            task_id: task_id.clone(),
            new_start: deps_done,
        }),
        success: true,
    }
}
