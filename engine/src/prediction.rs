//! Completion forecasting from remaining work and past estimate accuracy.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::PredictionConfig;
use crate::critical_path::calculate_critical_path;
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::log_checks;
use crate::models::{Task, TaskStatus};
use crate::scheduler::calendar::add_hours;

/// How well past estimates matched actual effort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAnalysis {
    /// 1 minus the mean absolute relative estimate error, in [0, 1].
    pub accuracy: f64,
    /// Mean overrun as a percentage of the estimate, never negative.
    pub variance_percent: f64,
    pub sample_size: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletionPrediction {
    pub task_id: String,
    pub predicted_completion: NaiveDateTime,
    pub confidence: f64,
    pub variance_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectCompletionPrediction {
    pub project_id: String,
    pub predicted_completion: NaiveDateTime,
    pub confidence: f64,
    /// Latest-finishing tasks, latest first.
    pub critical_tasks: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionForecast {
    pub tasks: Vec<TaskCompletionPrediction>,
    pub project: Option<ProjectCompletionPrediction>,
    pub history: HistoricalAnalysis,
}

/// Compare estimates with actual hours on completed tasks.
///
/// Falls back to the configured defaults when no completed task records
/// actual hours.
pub fn analyze_history(tasks: &[Task], config: &PredictionConfig) -> HistoricalAnalysis {
    let errors: Vec<f64> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(|t| {
            let actual = t.actual_hours.filter(|a| *a > 0.0)?;
            let planned = t.duration_hours();
            Some((actual - planned) / planned)
        })
        .collect();

    if errors.is_empty() {
        return HistoricalAnalysis {
            accuracy: config.default_accuracy,
            variance_percent: config.default_variance_percent,
            sample_size: 0,
        };
    }

    let count = errors.len() as f64;
    let mean_error = errors.iter().sum::<f64>() / count;
    let mean_abs_error = errors.iter().map(|e| e.abs()).sum::<f64>() / count;

    HistoricalAnalysis {
        accuracy: (1.0 - mean_abs_error).clamp(0.0, 1.0),
        variance_percent: (mean_error * 100.0).max(0.0),
        sample_size: errors.len(),
    }
}

fn is_open(task: &Task) -> bool {
    !matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled)
}

/// Predict completion of every open task in `tasks`.
///
/// Remaining work is laid out from `as_of` by dependency order (earliest
/// finish from the forward pass) and stretched by the historical overrun.
/// Completed and cancelled tasks are skipped and do not delay dependents.
pub fn predict_tasks(
    tasks: &[Task],
    history: &HistoricalAnalysis,
    as_of: NaiveDateTime,
    verbosity: u8,
) -> Result<Vec<TaskCompletionPrediction>> {
    let open: Vec<Task> = tasks.iter().filter(|t| is_open(t)).cloned().collect();
    let graph = DependencyGraph::build(&open, verbosity)?;
    let order = graph.topological_sequence()?;
    let durations: Vec<f64> = (0..graph.len()).map(|i| graph.duration(i)).collect();
    let cpm = calculate_critical_path(&graph, &order, &durations);

    let stretch = 1.0 + history.variance_percent / 100.0;
    let predictions = open
        .iter()
        .map(|task| {
            let finish = cpm
                .task_timings
                .get(&task.id)
                .map_or(task.duration_hours(), |t| t.earliest_finish);
            let predicted_completion = add_hours(as_of, finish * stretch);
            log_checks!(
                verbosity,
                task_id = %task.id,
                predicted = %predicted_completion,
                "Predicted completion"
            );
            TaskCompletionPrediction {
                task_id: task.id.clone(),
                predicted_completion,
                confidence: history.accuracy,
                variance_percent: history.variance_percent,
            }
        })
        .collect();

    Ok(predictions)
}

/// Prediction for a task that is already done.
pub fn finished_prediction(task: &Task, as_of: NaiveDateTime) -> TaskCompletionPrediction {
    TaskCompletionPrediction {
        task_id: task.id.clone(),
        predicted_completion: as_of,
        confidence: 1.0,
        variance_percent: 0.0,
    }
}

/// Aggregate task predictions into a project forecast.
///
/// Returns `None` when there is nothing left to predict.
pub fn predict_project(
    project_id: &str,
    predictions: &[TaskCompletionPrediction],
    config: &PredictionConfig,
) -> Option<ProjectCompletionPrediction> {
    let predicted_completion = predictions.iter().map(|p| p.predicted_completion).max()?;
    let confidence =
        predictions.iter().map(|p| p.confidence).sum::<f64>() / predictions.len() as f64;

    let mut latest: Vec<&TaskCompletionPrediction> = predictions.iter().collect();
    latest.sort_by(|a, b| b.predicted_completion.cmp(&a.predicted_completion));

    Some(ProjectCompletionPrediction {
        project_id: project_id.to_string(),
        predicted_completion,
        confidence,
        critical_tasks: latest
            .into_iter()
            .take(config.critical_task_count)
            .map(|p| p.task_id.clone())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use chrono::NaiveDate;

    fn dt(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn done(id: &str, estimate: f64, actual: f64) -> Task {
        Task::new(id, id)
            .with_estimate(estimate)
            .with_actual_hours(actual)
            .with_status(TaskStatus::Completed)
    }

    #[test]
    fn test_history_defaults_without_samples() {
        let tasks = vec![Task::new("a", "A"), done("b", 4.0, 0.0)];
        let history = analyze_history(&tasks, &PredictionConfig::default());
        assert_eq!(history.sample_size, 0);
        assert!((history.accuracy - 0.85).abs() < 1e-9);
        assert!((history.variance_percent - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_from_actuals() {
        // +50% and -10%: mean overrun 20%, mean absolute error 30%.
        let tasks = vec![done("a", 4.0, 6.0), done("b", 10.0, 9.0)];
        let history = analyze_history(&tasks, &PredictionConfig::default());
        assert_eq!(history.sample_size, 2);
        assert!((history.variance_percent - 20.0).abs() < 1e-9);
        assert!((history.accuracy - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_underruns_do_not_shrink_forecast() {
        let tasks = vec![done("a", 10.0, 5.0)];
        let history = analyze_history(&tasks, &PredictionConfig::default());
        assert_eq!(history.variance_percent, 0.0);
        assert!((history.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_predictions_follow_dependencies() {
        let tasks = vec![
            done("setup", 2.0, 2.0),
            Task::new("a", "A").with_estimate(4.0).with_dependencies(&["setup"]),
            Task::new("b", "B").with_estimate(6.0).with_dependencies(&["a"]),
            Task::new("c", "C").with_estimate(2.0),
        ];
        let history = HistoricalAnalysis {
            accuracy: 0.8,
            variance_percent: 50.0,
            sample_size: 1,
        };
        let predictions = predict_tasks(&tasks, &history, dt(6, 0), 0).unwrap();
        let ids: Vec<&str> = predictions.iter().map(|p| p.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        // a: 4h * 1.5, b: 10h * 1.5, c: 2h * 1.5
        assert_eq!(predictions[0].predicted_completion, dt(6, 6));
        assert_eq!(predictions[1].predicted_completion, dt(6, 15));
        assert_eq!(predictions[2].predicted_completion, dt(6, 3));

        let project = predict_project("p1", &predictions, &PredictionConfig::default()).unwrap();
        assert_eq!(project.predicted_completion, dt(6, 15));
        assert!((project.confidence - 0.8).abs() < 1e-9);
        assert_eq!(project.critical_tasks, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cycle_in_open_work_is_an_error() {
        let tasks = vec![
            Task::new("a", "A").with_dependencies(&["b"]),
            Task::new("b", "B").with_dependencies(&["a"]),
        ];
        let history = analyze_history(&tasks, &PredictionConfig::default());
        let err = predict_tasks(&tasks, &history, dt(6, 0), 0).unwrap_err();
        assert!(matches!(err, EngineError::CyclicDependency { .. }));
    }

    #[test]
    fn test_empty_project_has_no_forecast() {
        assert!(predict_project("p1", &[], &PredictionConfig::default()).is_none());
    }
}
