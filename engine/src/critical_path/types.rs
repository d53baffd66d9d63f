//! Types for critical path analysis.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Per-task timing from the forward and backward passes.
///
/// All values are hours offset from the project base time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskTiming {
    /// Earliest possible start time (from forward pass).
    pub earliest_start: f64,
    /// Earliest possible finish time (from forward pass).
    pub earliest_finish: f64,
    /// Latest allowable start time (from backward pass).
    pub latest_start: f64,
    /// Latest allowable finish time (from backward pass).
    pub latest_finish: f64,
    /// Slack = latest_start - earliest_start.
    pub slack: f64,
}

impl TaskTiming {
    pub fn is_critical(&self) -> bool {
        // Allow small epsilon for floating point comparison
        self.slack.abs() < 1e-9
    }

    pub fn duration(&self) -> f64 {
        self.earliest_finish - self.earliest_start
    }
}

/// Raw result of the two CPM passes.
#[derive(Clone, Debug, Default)]
pub struct CriticalPathResult {
    /// Timing for every task in the graph.
    pub task_timings: FxHashMap<String, TaskTiming>,
    /// Zero-slack tasks in topological order.
    pub critical_order: Vec<String>,
    /// Makespan: the latest earliest-finish.
    pub critical_path_length: f64,
    /// Sum of all task durations.
    pub total_work: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathTask {
    pub task_id: String,
    pub earliest_start: NaiveDateTime,
    pub latest_start: NaiveDateTime,
    pub float_hours: f64,
}

/// The zero-slack chain of a project, anchored to calendar time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    pub tasks: Vec<CriticalPathTask>,
    /// Sum of critical task durations.
    pub total_duration_hours: f64,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    /// Hours between the computed end and the deadline; negative when late.
    pub deadline_slack_hours: Option<f64>,
}

impl CriticalPath {
    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|t| t.task_id == task_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    HighComplexity,
    Unassigned,
    DueDateMiss,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathRisk {
    pub task_id: String,
    pub kind: RiskKind,
    pub probability: f64,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathSuggestion {
    /// Break a long critical task into parallel pieces.
    SplitTask { task_id: String, hours: f64 },
    /// One worker carries several critical tasks in sequence.
    AddResources {
        worker: String,
        task_ids: Vec<String>,
    },
    /// Overlap consecutive critical tasks where the work allows it.
    FastTrack { task_ids: Vec<String> },
}

/// Critical path with its risks and suggested optimizations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathAnalysis {
    pub critical_path: CriticalPath,
    pub risks: Vec<CriticalPathRisk>,
    pub suggestions: Vec<PathSuggestion>,
}
