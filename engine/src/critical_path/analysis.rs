//! Risk assessment and optimization hints for the critical path.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

use crate::models::{Complexity, Task, TaskSchedule};
use crate::scheduler::calendar::add_hours;

use super::types::{
    CriticalPath, CriticalPathResult, CriticalPathRisk, PathSuggestion, RiskKind,
};

const HIGH_COMPLEXITY_PROBABILITY: f64 = 0.7;
const UNASSIGNED_PROBABILITY: f64 = 0.5;
const DUE_DATE_MISS_PROBABILITY: f64 = 0.9;

/// Flag critical tasks likely to slip.
///
/// Each critical task can carry several risks: very-high complexity, no
/// assignee, or a due date earlier than its earliest possible finish.
/// Finishes come from `schedule` when the task is placed there, else from
/// `base` plus its effort timing.
pub fn analyze_risks(
    path: &CriticalPath,
    result: &CriticalPathResult,
    tasks: &[Task],
    base: NaiveDateTime,
    schedule: Option<&TaskSchedule>,
) -> Vec<CriticalPathRisk> {
    let by_id: FxHashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut risks = Vec::new();

    for critical in &path.tasks {
        let Some(task) = by_id.get(critical.task_id.as_str()) else {
            continue;
        };

        if task.complexity == Complexity::VeryHigh {
            risks.push(CriticalPathRisk {
                task_id: task.id.clone(),
                kind: RiskKind::HighComplexity,
                probability: HIGH_COMPLEXITY_PROBABILITY,
                description: format!("'{}' is very complex and has no slack", task.title),
            });
        }

        if task.assignee.is_none() {
            risks.push(CriticalPathRisk {
                task_id: task.id.clone(),
                kind: RiskKind::Unassigned,
                probability: UNASSIGNED_PROBABILITY,
                description: format!("'{}' is on the critical path without an assignee", task.title),
            });
        }

        if let (Some(due), Some(timing)) = (task.due_date, result.task_timings.get(&task.id)) {
            let earliest_finish = schedule
                .and_then(|s| s.get(&task.id))
                .map_or_else(|| add_hours(base, timing.earliest_finish), |placed| placed.end);
            if due < earliest_finish {
                risks.push(CriticalPathRisk {
                    task_id: task.id.clone(),
                    kind: RiskKind::DueDateMiss,
                    probability: DUE_DATE_MISS_PROBABILITY,
                    description: format!(
                        "'{}' is due {} but cannot finish before {}",
                        task.title, due, earliest_finish
                    ),
                });
            }
        }
    }

    risks
}

/// Suggest ways to shorten the critical path.
pub fn suggest_optimizations(
    path: &CriticalPath,
    result: &CriticalPathResult,
    tasks: &[Task],
    split_threshold_hours: f64,
) -> Vec<PathSuggestion> {
    let by_id: FxHashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut suggestions = Vec::new();

    for critical in &path.tasks {
        let Some(timing) = result.task_timings.get(&critical.task_id) else {
            continue;
        };
        if timing.duration() > split_threshold_hours {
            suggestions.push(PathSuggestion::SplitTask {
                task_id: critical.task_id.clone(),
                hours: timing.duration(),
            });
        }
    }

    // Workers in first-seen order along the path.
    let mut workers: Vec<(&str, Vec<String>)> = Vec::new();
    for critical in &path.tasks {
        let Some(worker) = by_id
            .get(critical.task_id.as_str())
            .and_then(|t| t.assignee.as_deref())
        else {
            continue;
        };
        match workers.iter_mut().find(|(w, _)| *w == worker) {
            Some((_, ids)) => ids.push(critical.task_id.clone()),
            None => workers.push((worker, vec![critical.task_id.clone()])),
        }
    }
    for (worker, task_ids) in workers {
        if task_ids.len() > 1 {
            suggestions.push(PathSuggestion::AddResources {
                worker: worker.to_string(),
                task_ids,
            });
        }
    }

    if path.tasks.len() > 1 {
        suggestions.push(PathSuggestion::FastTrack {
            task_ids: path.tasks.iter().map(|t| t.task_id.clone()).collect(),
        });
    }

    suggestions
}
