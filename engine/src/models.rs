//! Core data types for planning.
//!
//! Instants are `NaiveDateTime` and durations are carried as `f64` hours;
//! conversion to `chrono::Duration` happens at the edges in
//! [`crate::scheduler::calendar`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Task priority level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
    Urgent,
}

impl Priority {
    /// Weight used by allocation scoring.
    pub fn weight(self) -> f64 {
        match self {
            Priority::Urgent => 1.0,
            Priority::Critical => 0.9,
            Priority::High => 0.8,
            Priority::Medium => 0.6,
            Priority::Low => 0.4,
        }
    }
}

/// Complexity tier, used to derive a duration when no estimate is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    VeryLow,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl Complexity {
    pub fn hours(self) -> f64 {
        match self {
            Complexity::VeryLow => 2.0,
            Complexity::Low => 4.0,
            Complexity::Medium => 8.0,
            Complexity::High => 16.0,
            Complexity::VeryHigh => 32.0,
        }
    }

    /// Weight used by allocation scoring.
    pub fn weight(self) -> f64 {
        match self {
            Complexity::VeryLow => 0.2,
            Complexity::Low => 0.4,
            Complexity::Medium => 0.6,
            Complexity::High => 0.8,
            Complexity::VeryHigh => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    Development,
    Bug,
    Feature,
    Testing,
    Documentation,
    Review,
    Research,
    Meeting,
    Design,
    Maintenance,
}

impl TaskType {
    pub fn weight(self) -> f64 {
        match self {
            TaskType::Development => 0.9,
            TaskType::Testing => 0.8,
            TaskType::Design => 0.7,
            TaskType::Research | TaskType::Review => 0.6,
            TaskType::Documentation => 0.5,
            TaskType::Meeting => 0.3,
            TaskType::Bug | TaskType::Feature | TaskType::Maintenance => 0.5,
        }
    }

    /// Fixed bonus added by skill-based allocation.
    pub fn skill_bonus(self) -> f64 {
        match self {
            TaskType::Development => 0.8,
            TaskType::Testing => 0.7,
            TaskType::Design => 0.6,
            TaskType::Documentation => 0.5,
            _ => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    OnHold,
    Overdue,
}

impl TaskStatus {
    /// Pending and in-progress tasks count toward a member's workload.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

/// A unit of work within a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub organization_id: String,
    pub project_id: Option<String>,
    /// Ids of tasks that must finish before this one starts.
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub estimated_hours: Option<f64>,
    /// Recorded effort once the task is completed.
    pub actual_hours: Option<f64>,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            organization_id: String::new(),
            project_id: None,
            dependencies: Vec::new(),
            estimated_hours: None,
            actual_hours: None,
            complexity: Complexity::default(),
            priority: Priority::default(),
            task_type: TaskType::default(),
            status: TaskStatus::default(),
            assignee: None,
            due_date: None,
        }
    }

    pub fn in_project(mut self, organization_id: &str, project_id: &str) -> Self {
        self.organization_id = organization_id.to_string();
        self.project_id = Some(project_id.to_string());
        self
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_estimate(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }

    pub fn with_due_date(mut self, due: NaiveDateTime) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_actual_hours(mut self, hours: f64) -> Self {
        self.actual_hours = Some(hours);
        self
    }

    /// Planned duration: the estimate if present, else the complexity tier.
    pub fn duration_hours(&self) -> f64 {
        match self.estimated_hours {
            Some(hours) if hours > 0.0 => hours,
            _ => self.complexity.hours(),
        }
    }
}

/// A task placed on the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: f64,
    /// Worker ids occupying this slot.
    pub resources: Vec<String>,
    /// Dependency ids at scheduling time, so edited schedules can be checked alone.
    pub dependencies: Vec<String>,
}

/// The live schedule for a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskSchedule {
    pub project_id: String,
    pub tasks: Vec<ScheduledTask>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    /// Requested project end, if the caller supplied one.
    pub deadline: Option<NaiveDateTime>,
    /// Bumped every time the schedule is superseded.
    pub version: u64,
}

impl TaskSchedule {
    /// End of the allowed window: the deadline when set, else the computed end.
    pub fn window_end(&self) -> NaiveDateTime {
        self.deadline.unwrap_or(self.end_date)
    }

    pub fn get(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Recompute `end_date` from the tasks.
    pub fn refresh_end_date(&mut self) {
        self.end_date = self
            .tasks
            .iter()
            .map(|t| t.end)
            .max()
            .unwrap_or(self.start_date);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    /// Fraction of working time open for new tasks (0-1).
    pub availability: f64,
    pub is_active: bool,
    /// Overrides the configured default weekly capacity.
    pub weekly_capacity_hours: Option<f64>,
}

impl TeamMember {
    pub fn new(user_id: impl Into<String>, availability: f64) -> Self {
        Self {
            user_id: user_id.into(),
            availability: availability.clamp(0.0, 1.0),
            is_active: true,
            weekly_capacity_hours: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_capacity(mut self, hours: f64) -> Self {
        self.weekly_capacity_hours = Some(hours);
        self
    }

    /// Candidate for new work.
    pub fn is_available(&self) -> bool {
        self.is_active && self.availability > 0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub organization_id: String,
    pub members: Vec<TeamMember>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub start_date: NaiveDateTime,
    pub deadline: Option<NaiveDateTime>,
}
