//! Conflict detection passes.

use rustc_hash::FxHashMap;

use crate::models::{ScheduledTask, TaskSchedule};

use super::{ConflictType, ScheduleConflict, Severity};

/// Half-open interval overlap: touching intervals do not overlap.
#[inline]
pub fn overlaps(a: &ScheduledTask, b: &ScheduledTask) -> bool {
    a.start < b.end && b.start < a.end
}

/// Run every detection pass: resource, then time, then dependency.
pub fn detect_conflicts(schedule: &TaskSchedule) -> Vec<ScheduleConflict> {
    let mut conflicts = detect_resource_conflicts(schedule);
    conflicts.extend(detect_time_conflicts(schedule));
    conflicts.extend(detect_dependency_conflicts(schedule));
    conflicts
}

/// Pairs of tasks holding the same worker over overlapping intervals.
///
/// Each overlapping pair is reported once, in schedule order, listing every
/// worker the two tasks share.
pub fn detect_resource_conflicts(schedule: &TaskSchedule) -> Vec<ScheduleConflict> {
    // Worker -> positions in the schedule, workers in first-seen order.
    let mut workers: Vec<(&str, Vec<usize>)> = Vec::new();
    let mut worker_pos: FxHashMap<&str, usize> = FxHashMap::default();
    for (pos, task) in schedule.tasks.iter().enumerate() {
        for resource in &task.resources {
            let slot = *worker_pos.entry(resource.as_str()).or_insert_with(|| {
                workers.push((resource.as_str(), Vec::new()));
                workers.len() - 1
            });
            let positions = &mut workers[slot].1;
            if positions.last() != Some(&pos) {
                positions.push(pos);
            }
        }
    }

    let mut pair_index: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    let mut conflicts: Vec<ScheduleConflict> = Vec::new();

    for (worker, positions) in &workers {
        for (i, &a) in positions.iter().enumerate() {
            for &b in &positions[i + 1..] {
                let (first, second) = (&schedule.tasks[a], &schedule.tasks[b]);
                if !overlaps(first, second) {
                    continue;
                }
                match pair_index.get(&(a, b)) {
                    Some(&existing) => conflicts[existing].resources.push(worker.to_string()),
                    None => {
                        pair_index.insert((a, b), conflicts.len());
                        conflicts.push(ScheduleConflict {
                            conflict_type: ConflictType::Resource,
                            severity: Severity::High,
                            description: format!(
                                "{} and {} overlap on a shared worker",
                                first.task_id, second.task_id
                            ),
                            task_ids: vec![first.task_id.clone(), second.task_id.clone()],
                            resources: vec![worker.to_string()],
                        });
                    }
                }
            }
        }
    }

    conflicts
}

/// Tasks falling outside the project window `[start_date, window_end]`.
pub fn detect_time_conflicts(schedule: &TaskSchedule) -> Vec<ScheduleConflict> {
    let window_end = schedule.window_end();
    schedule
        .tasks
        .iter()
        .filter(|t| t.start < schedule.start_date || t.end > window_end)
        .map(|t| ScheduleConflict {
            conflict_type: ConflictType::Time,
            severity: Severity::Medium,
            description: format!(
                "{} runs {} - {}, outside the project window {} - {}",
                t.task_id, t.start, t.end, schedule.start_date, window_end
            ),
            task_ids: vec![t.task_id.clone()],
            resources: Vec::new(),
        })
        .collect()
}

/// Tasks starting before one of their dependencies has finished.
pub fn detect_dependency_conflicts(schedule: &TaskSchedule) -> Vec<ScheduleConflict> {
    let mut conflicts = Vec::new();
    for task in &schedule.tasks {
        for dep_id in &task.dependencies {
            let Some(dep) = schedule.get(dep_id) else {
                continue;
            };
            if task.start < dep.end {
                conflicts.push(ScheduleConflict {
                    conflict_type: ConflictType::Dependency,
                    severity: Severity::High,
                    description: format!(
                        "{} starts at {} before its dependency {} ends at {}",
                        task.task_id, task.start, dep.task_id, dep.end
                    ),
                    task_ids: vec![dep.task_id.clone(), task.task_id.clone()],
                    resources: Vec::new(),
                });
            }
        }
    }
    conflicts
}
