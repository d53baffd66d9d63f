//! Critical path calculation using forward and backward passes.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

use crate::graph::DependencyGraph;
use crate::interner::TaskIdx;
use crate::models::TaskSchedule;
use crate::scheduler::calendar::{add_hours, hours_between};

use super::types::{CriticalPath, CriticalPathResult, CriticalPathTask, TaskTiming};

/// Run the two CPM passes.
///
/// # Arguments
/// * `graph` - Dependency graph
/// * `order` - Topological order of `graph`
/// * `durations` - Task durations in hours, indexed like `graph`
///
/// The backward pass starts from the makespan: sinks get
/// `latest_finish = makespan` and every other task takes the minimum latest
/// start over its successors.
pub fn calculate_critical_path(
    graph: &DependencyGraph,
    order: &[TaskIdx],
    durations: &[f64],
) -> CriticalPathResult {
    let n = graph.len();
    let mut timings = vec![TaskTiming::default(); n];
    let mut total_work = 0.0;

    // Forward pass
    for &idx in order {
        let duration = durations[idx];
        total_work += duration;

        let earliest_start = graph
            .predecessors(idx)
            .iter()
            .map(|&dep| timings[dep].earliest_finish)
            .fold(0.0, f64::max);

        timings[idx].earliest_start = earliest_start;
        timings[idx].earliest_finish = earliest_start + duration;
    }

    let critical_path_length = timings
        .iter()
        .map(|t| t.earliest_finish)
        .fold(0.0, f64::max);

    // Backward pass
    for &idx in order.iter().rev() {
        let latest_finish = graph
            .successors(idx)
            .iter()
            .map(|&succ| timings[succ].latest_start)
            .fold(f64::INFINITY, f64::min);
        let latest_finish = if latest_finish.is_finite() {
            latest_finish
        } else {
            critical_path_length
        };

        let timing = &mut timings[idx];
        timing.latest_finish = latest_finish;
        timing.latest_start = latest_finish - durations[idx];
        timing.slack = timing.latest_start - timing.earliest_start;
    }

    let critical_order = order
        .iter()
        .filter(|&&idx| timings[idx].is_critical())
        .map(|&idx| graph.task_id(idx).to_string())
        .collect();

    let task_timings: FxHashMap<String, TaskTiming> = (0..n)
        .map(|idx| (graph.task_id(idx).to_string(), timings[idx]))
        .collect();

    CriticalPathResult {
        task_timings,
        critical_order,
        critical_path_length,
        total_work,
    }
}

impl CriticalPathResult {
    /// Anchor the critical tasks to calendar time.
    pub fn to_path(&self, base: NaiveDateTime, deadline: Option<NaiveDateTime>) -> CriticalPath {
        let mut tasks = Vec::with_capacity(self.critical_order.len());
        let mut total_duration_hours = 0.0;
        let mut first_start = f64::INFINITY;
        let mut last_finish = 0.0f64;

        for task_id in &self.critical_order {
            let Some(timing) = self.task_timings.get(task_id) else {
                continue;
            };
            total_duration_hours += timing.duration();
            first_start = first_start.min(timing.earliest_start);
            last_finish = last_finish.max(timing.earliest_finish);
            tasks.push(CriticalPathTask {
                task_id: task_id.clone(),
                earliest_start: add_hours(base, timing.earliest_start),
                latest_start: add_hours(base, timing.latest_start),
                float_hours: timing.slack,
            });
        }

        let start_date = if first_start.is_finite() {
            add_hours(base, first_start)
        } else {
            base
        };
        let end_date = add_hours(base, last_finish);

        CriticalPath {
            tasks,
            total_duration_hours,
            start_date,
            end_date,
            deadline_slack_hours: deadline.map(|d| hours_between(end_date, d)),
        }
    }

    /// Like [`to_path`](Self::to_path), but dates come from `schedule`.
    ///
    /// Timings stay in hours of effort; only the calendar instants are taken
    /// from where the schedule placed each critical task, so a working-hours
    /// calendar never counts off-hours as work.
    pub fn to_scheduled_path(
        &self,
        schedule: &TaskSchedule,
        deadline: Option<NaiveDateTime>,
    ) -> CriticalPath {
        let mut path = self.to_path(schedule.start_date, deadline);
        let mut span: Option<(NaiveDateTime, NaiveDateTime)> = None;

        for task in &mut path.tasks {
            let Some(placed) = schedule.get(&task.task_id) else {
                continue;
            };
            task.earliest_start = placed.start;
            task.latest_start = placed.start;
            span = Some(match span {
                Some((start, end)) => (start.min(placed.start), end.max(placed.end)),
                None => (placed.start, placed.end),
            });
        }

        if let Some((start, end)) = span {
            path.start_date = start;
            path.end_date = end;
            path.deadline_slack_hours = deadline.map(|d| hours_between(end, d));
        }
        path
    }
}
