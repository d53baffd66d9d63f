//! Schedule generation, optimization, conflict handling and forecasting.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::conflicts::{self, ResolutionOutcome, ResolutionStrategy, ScheduleConflict};
use crate::critical_path::{
    analyze_risks, calculate_critical_path, suggest_optimizations,
    CriticalPath, CriticalPathAnalysis,
};
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::log_changes;
use crate::models::{Task, TaskSchedule, TaskStatus};
use crate::optimization::{self, OptimizationOutcome, OptimizationStrategy};
use crate::prediction::{
    analyze_history, finished_prediction, predict_project, predict_tasks, CompletionForecast,
};
use crate::scheduler::{Scheduler, WorkingHours};

use super::PlanningService;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSchedule {
    pub schedule: TaskSchedule,
    pub critical_path: CriticalPath,
    pub conflicts: Vec<ScheduleConflict>,
}

/// What [`PlanningService::predict_completion`] forecasts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PredictionTarget {
    Task(String),
    Project(String),
}

/// Cancelled tasks take no time and never block anything.
fn schedulable(tasks: Vec<Task>) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|t| t.status != TaskStatus::Cancelled)
        .collect()
}

/// Planned effort per task in graph order, independent of any calendar.
fn effort_durations(graph: &DependencyGraph) -> Vec<f64> {
    (0..graph.len()).map(|idx| graph.duration(idx)).collect()
}

impl PlanningService {
    /// Working-hours calendar with the configured day length.
    pub fn working_calendar(&self) -> WorkingHours {
        WorkingHours::new(self.config.scheduling.hours_per_day)
    }

    /// Build, analyze and persist the schedule for a project.
    ///
    /// `end` overrides the project's deadline as the window end. Passing
    /// `working_hours` spreads work over working days; without it tasks run
    /// back to back in wall-clock hours. The saved schedule supersedes any
    /// earlier one and fails with a version conflict if another call saved in
    /// between.
    pub fn generate_schedule(
        &self,
        project_id: &str,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
        working_hours: Option<WorkingHours>,
    ) -> Result<GeneratedSchedule> {
        let project = self.project(project_id)?;
        let tasks = schedulable(self.project_tasks(project_id)?);
        let deadline = end.or(project.deadline);

        let graph = DependencyGraph::build(&tasks, self.verbosity())?;
        let order = graph.topological_sequence()?;
        let scheduler = Scheduler::new(working_hours, self.verbosity());
        let schedule = scheduler.schedule(project_id, &tasks, &graph, &order, start, deadline);

        let critical_path = calculate_critical_path(&graph, &order, &effort_durations(&graph))
            .to_scheduled_path(&schedule, deadline);
        let conflicts = conflicts::detect_conflicts(&schedule);

        let expected = self
            .schedules
            .find_by_project(project_id)?
            .map_or(0, |current| current.version);
        self.check_cancelled()?;
        let schedule = self.schedules.save(schedule, expected)?;

        log_changes!(
            self.verbosity(),
            project_id = %project_id,
            version = schedule.version,
            conflicts = conflicts.len(),
            "Saved schedule"
        );

        Ok(GeneratedSchedule {
            schedule,
            critical_path,
            conflicts,
        })
    }

    /// Optimize `schedule` under the named strategy and persist the result.
    pub fn optimize_schedule(
        &self,
        schedule: &TaskSchedule,
        strategy: &str,
    ) -> Result<OptimizationOutcome> {
        let strategy: OptimizationStrategy = strategy.parse()?;
        let mut outcome = optimization::optimize_schedule(
            schedule,
            strategy,
            &self.config.scheduling,
            self.verbosity(),
        );
        self.check_cancelled()?;
        outcome.schedule = self.schedules.save(outcome.schedule, schedule.version)?;
        Ok(outcome)
    }

    pub fn detect_conflicts(&self, schedule: &TaskSchedule) -> Vec<ScheduleConflict> {
        conflicts::detect_conflicts(schedule)
    }

    /// Resolve `conflicts` on `schedule`, persisting the result when anything
    /// moved.
    pub fn resolve_conflicts(
        &self,
        schedule: &TaskSchedule,
        conflicts: &[ScheduleConflict],
        strategy: &ResolutionStrategy,
    ) -> Result<ResolutionOutcome> {
        let mut outcome =
            conflicts::resolve_conflicts(schedule, conflicts, strategy, self.verbosity());
        if outcome.schedule.version != schedule.version {
            self.check_cancelled()?;
            outcome.schedule = self.schedules.save(outcome.schedule, schedule.version)?;
        }
        Ok(outcome)
    }

    /// Forecast completion of one task or a whole project as of `as_of`.
    ///
    /// Estimate accuracy is learned from the completed tasks of the same
    /// project.
    pub fn predict_completion(
        &self,
        target: &PredictionTarget,
        as_of: NaiveDateTime,
    ) -> Result<CompletionForecast> {
        match target {
            PredictionTarget::Task(task_id) => {
                let task = self.task(task_id)?;
                let related = match &task.project_id {
                    Some(project_id) => self.project_tasks(project_id)?,
                    None => vec![task.clone()],
                };
                let history = analyze_history(&related, &self.config.prediction);

                let prediction = if matches!(
                    task.status,
                    TaskStatus::Completed | TaskStatus::Cancelled
                ) {
                    Some(finished_prediction(&task, as_of))
                } else {
                    predict_tasks(&related, &history, as_of, self.verbosity())?
                        .into_iter()
                        .find(|p| p.task_id == task.id)
                };

                Ok(CompletionForecast {
                    tasks: prediction.into_iter().collect(),
                    project: None,
                    history,
                })
            }
            PredictionTarget::Project(project_id) => {
                self.project(project_id)?;
                let tasks = self.project_tasks(project_id)?;
                let history = analyze_history(&tasks, &self.config.prediction);
                let predictions = predict_tasks(&tasks, &history, as_of, self.verbosity())?;
                let project = predict_project(project_id, &predictions, &self.config.prediction);
                Ok(CompletionForecast {
                    tasks: predictions,
                    project,
                    history,
                })
            }
        }
    }

    /// Critical path of a project with its risks and suggested fixes.
    ///
    /// Timings are in hours of effort. Dates come from the stored schedule
    /// when one exists, else from the project start.
    pub fn analyze_critical_path(&self, project_id: &str) -> Result<CriticalPathAnalysis> {
        let project = self.project(project_id)?;
        let tasks = schedulable(self.project_tasks(project_id)?);
        let stored = self.schedules.find_by_project(project_id)?;
        self.check_cancelled()?;

        let graph = DependencyGraph::build(&tasks, self.verbosity())?;
        let order = graph.topological_sequence()?;
        let result = calculate_critical_path(&graph, &order, &effort_durations(&graph));
        let (critical_path, base) = match &stored {
            Some(schedule) => (
                result.to_scheduled_path(schedule, schedule.deadline.or(project.deadline)),
                schedule.start_date,
            ),
            None => (
                result.to_path(project.start_date, project.deadline),
                project.start_date,
            ),
        };
        let risks = analyze_risks(&critical_path, &result, &tasks, base, stored.as_ref());
        let suggestions = suggest_optimizations(
            &critical_path,
            &result,
            &tasks,
            self.config.scheduling.split_task_threshold_hours,
        );

        Ok(CriticalPathAnalysis {
            critical_path,
            risks,
            suggestions,
        })
    }
}
