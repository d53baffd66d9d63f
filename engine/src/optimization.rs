//! Schedule optimization: utilization analysis, compression and levelling.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::config::SchedulingConfig;
use crate::conflicts::{overlaps, Severity};
use crate::error::EngineError;
use crate::log_changes;
use crate::models::TaskSchedule;
use crate::scheduler::calendar::hours_between;
use crate::scheduler::{move_to, ResourceSchedule};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    /// Pull work as early as dependencies and workers allow.
    Time,
    /// Remove double-booking by delaying clashing work.
    Resource,
    /// Advisory only; the schedule is not changed.
    Cost,
}

impl FromStr for OptimizationStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time" => Ok(Self::Time),
            "resource" => Ok(Self::Resource),
            "cost" => Ok(Self::Cost),
            other => {
                tracing::warn!(strategy = other, "Rejecting unknown optimization strategy");
                Err(EngineError::InvalidStrategy(other.to_string()))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    OverAllocation,
    UnderUtilization,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleIssue {
    pub kind: IssueKind,
    pub resource: String,
    pub utilization: f64,
    pub severity: Severity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationKind {
    Parallelize,
    Rebalance,
    CostReduction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub kind: OptimizationKind,
    pub description: String,
    pub resource: Option<String>,
    /// False for advisories that did not change the schedule.
    pub applied: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Improvements {
    pub time_saving_hours: f64,
    pub time_saving_percent: f64,
    /// Change in mean worker utilization, in percentage points.
    pub resource_efficiency: f64,
    pub cost_saving: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub schedule: TaskSchedule,
    pub issues: Vec<ScheduleIssue>,
    pub optimizations: Vec<Optimization>,
    pub improvements: Improvements,
}

/// Committed hours per worker divided by the schedule span.
///
/// Workers appear in first-seen order. An empty span yields no entries.
pub fn resource_utilization(schedule: &TaskSchedule) -> Vec<(String, f64)> {
    let span = hours_between(schedule.start_date, schedule.end_date);
    if span <= 0.0 {
        return Vec::new();
    }

    let mut work: Vec<(String, f64)> = Vec::new();
    for task in &schedule.tasks {
        for resource in &task.resources {
            let hours = task.duration_hours;
            match work.iter_mut().find(|(r, _)| r == resource) {
                Some((_, total)) => *total += hours,
                None => work.push((resource.clone(), hours)),
            }
        }
    }

    work.into_iter().map(|(r, hours)| (r, hours / span)).collect()
}

/// Over-allocated and under-utilized workers.
pub fn analyze_issues(schedule: &TaskSchedule, config: &SchedulingConfig) -> Vec<ScheduleIssue> {
    resource_utilization(schedule)
        .into_iter()
        .filter_map(|(resource, utilization)| {
            let (kind, severity) = if utilization > config.over_allocation_threshold {
                (IssueKind::OverAllocation, Severity::High)
            } else if utilization < config.under_utilization_threshold {
                (IssueKind::UnderUtilization, Severity::Low)
            } else {
                return None;
            };
            Some(ScheduleIssue {
                kind,
                resource,
                utilization,
                severity,
            })
        })
        .collect()
}

/// Workers holding two overlapping tasks.
fn double_booked_workers(schedule: &TaskSchedule) -> Vec<String> {
    let mut workers: Vec<String> = Vec::new();
    for (i, a) in schedule.tasks.iter().enumerate() {
        for b in &schedule.tasks[i + 1..] {
            if !overlaps(a, b) {
                continue;
            }
            for r in a.resources.iter().filter(|r| b.resources.contains(*r)) {
                if !workers.contains(r) {
                    workers.push(r.clone());
                }
            }
        }
    }
    workers
}

/// Produce a superseding schedule under `strategy`.
///
/// The input is never modified; the result carries `version + 1`.
pub fn optimize_schedule(
    schedule: &TaskSchedule,
    strategy: OptimizationStrategy,
    config: &SchedulingConfig,
    verbosity: u8,
) -> OptimizationOutcome {
    let issues = analyze_issues(schedule, config);
    let mut optimized = schedule.clone();
    let mut optimizations = Vec::new();

    match strategy {
        OptimizationStrategy::Time => {
            let workers: FxHashSet<String> = schedule
                .tasks
                .iter()
                .flat_map(|t| t.resources.iter().cloned())
                .collect();
            relayout(&mut optimized, &workers, true);
            optimizations.push(Optimization {
                kind: OptimizationKind::Parallelize,
                description: "Started every task as early as its dependencies and workers allow"
                    .to_string(),
                resource: None,
                applied: true,
            });
        }
        OptimizationStrategy::Resource => {
            let mut targets = double_booked_workers(schedule);
            for issue in issues.iter().filter(|i| i.kind == IssueKind::OverAllocation) {
                if !targets.contains(&issue.resource) {
                    targets.push(issue.resource.clone());
                }
            }
            let levelled: FxHashSet<String> = targets.iter().cloned().collect();
            if !levelled.is_empty() {
                relayout(&mut optimized, &levelled, false);
            }
            for worker in targets {
                optimizations.push(Optimization {
                    kind: OptimizationKind::Rebalance,
                    description: format!("Serialized overlapping work for {}", worker),
                    resource: Some(worker),
                    applied: true,
                });
            }
            for issue in issues.iter().filter(|i| i.kind == IssueKind::UnderUtilization) {
                optimizations.push(Optimization {
                    kind: OptimizationKind::Rebalance,
                    description: format!(
                        "{} is {:.0}% utilized and can take more work",
                        issue.resource,
                        issue.utilization * 100.0
                    ),
                    resource: Some(issue.resource.clone()),
                    applied: false,
                });
            }
        }
        OptimizationStrategy::Cost => {
            optimizations.push(Optimization {
                kind: OptimizationKind::CostReduction,
                description: "Review under-utilized workers and long tasks for cost savings"
                    .to_string(),
                resource: None,
                applied: false,
            });
        }
    }

    optimized.refresh_end_date();
    optimized.version = schedule.version + 1;
    let improvements = improvements(schedule, &optimized);

    log_changes!(
        verbosity,
        strategy = ?strategy,
        saved_hours = improvements.time_saving_hours,
        "Optimized schedule"
    );

    OptimizationOutcome {
        schedule: optimized,
        issues,
        optimizations,
        improvements,
    }
}

/// Re-place every task in dependency order.
///
/// A task starts once its dependencies are done and each constrained worker
/// it holds has a free slot. With `pull_earlier` tasks may move back to the
/// project start; otherwise they only ever move later.
fn relayout(schedule: &mut TaskSchedule, constrained: &FxHashSet<String>, pull_earlier: bool) {
    let n = schedule.tasks.len();
    let pos_of: FxHashMap<&str, usize> = schedule
        .tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.task_id.as_str(), i))
        .collect();

    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, task) in schedule.tasks.iter().enumerate() {
        for dep in &task.dependencies {
            if let Some(&d) = pos_of.get(dep.as_str()) {
                if d != i && !preds[i].contains(&d) {
                    preds[i].push(d);
                    succs[d].push(i);
                }
            }
        }
    }

    // Kahn's algorithm, ready tasks taken by current start then position.
    let mut in_degree: Vec<usize> = preds.iter().map(Vec::len).collect();
    let mut ready: BinaryHeap<Reverse<(NaiveDateTime, usize)>> = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .map(|i| Reverse((schedule.tasks[i].start, i)))
        .collect();
    let mut order = Vec::with_capacity(n);
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(i);
        for &s in &succs[i] {
            in_degree[s] -= 1;
            if in_degree[s] == 0 {
                ready.push(Reverse((schedule.tasks[s].start, s)));
            }
        }
    }
    // Dependency loops from manual edits keep their start order.
    let mut leftovers: Vec<usize> = (0..n).filter(|&i| in_degree[i] > 0).collect();
    leftovers.sort_by_key(|&i| (schedule.tasks[i].start, i));
    order.extend(leftovers);

    let mut calendars: FxHashMap<String, ResourceSchedule> = FxHashMap::default();

    for i in order {
        let task = &schedule.tasks[i];
        let floor = if pull_earlier {
            schedule.start_date
        } else {
            task.start
        };
        let deps_done = preds[i]
            .iter()
            .map(|&d| schedule.tasks[d].end)
            .max()
            .map_or(floor, |end| end.max(floor));
        let hours = hours_between(task.start, task.end);
        let workers: Vec<String> = task
            .resources
            .iter()
            .filter(|r| constrained.contains(*r))
            .cloned()
            .collect();

        let mut start = deps_done;
        loop {
            let next = workers
                .iter()
                .filter_map(|w| calendars.get(w))
                .map(|rs| rs.next_available_slot(start, hours))
                .max()
                .unwrap_or(start);
            if next == start {
                break;
            }
            start = next;
        }

        let task = &mut schedule.tasks[i];
        move_to(task, start);
        for worker in workers {
            calendars
                .entry(worker.clone())
                .or_insert_with(|| ResourceSchedule::new(worker))
                .add_busy_period(task.start, task.end);
        }
    }
}

fn improvements(original: &TaskSchedule, optimized: &TaskSchedule) -> Improvements {
    let original_span = hours_between(original.start_date, original.end_date);
    let optimized_span = hours_between(optimized.start_date, optimized.end_date);
    let time_saving_hours = original_span - optimized_span;
    let time_saving_percent = if original_span > 0.0 {
        time_saving_hours / original_span * 100.0
    } else {
        0.0
    };

    let before: FxHashMap<String, f64> = resource_utilization(original).into_iter().collect();
    let after: FxHashMap<String, f64> = resource_utilization(optimized).into_iter().collect();
    let common: Vec<(&f64, &f64)> = before
        .iter()
        .filter_map(|(r, b)| after.get(r).map(|a| (b, a)))
        .collect();
    let resource_efficiency = if common.is_empty() {
        0.0
    } else {
        let count = common.len() as f64;
        let before_avg: f64 = common.iter().map(|(b, _)| **b).sum::<f64>() / count;
        let after_avg: f64 = common.iter().map(|(_, a)| **a).sum::<f64>() / count;
        (after_avg - before_avg) * 100.0
    };

    Improvements {
        time_saving_hours,
        time_saving_percent,
        resource_efficiency,
        cost_saving: 0.0,
    }
}
