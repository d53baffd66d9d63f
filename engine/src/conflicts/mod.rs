//! Schedule conflict detection and resolution.
//!
//! Detection is a pure pass over a [`TaskSchedule`](crate::models::TaskSchedule);
//! resolution works on a copy and reports what it could not fix instead of
//! failing.

mod detection;
mod resolution;

use serde::{Deserialize, Serialize};

pub use detection::{
    detect_conflicts, detect_dependency_conflicts, detect_resource_conflicts,
    detect_time_conflicts, overlaps,
};
pub use resolution::{
    resolve_conflicts, ConflictResolution, ResolutionAction, ResolutionOutcome,
    ResolutionStrategy,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Resource,
    Time,
    Dependency,
}

/// Ordered so that `High > Medium > Low`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Low and medium conflicts may be fixed without caller input.
    pub fn is_auto_resolvable(self) -> bool {
        self != Severity::High
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    pub description: String,
    /// For resource and dependency conflicts: the earlier-listed task first.
    pub task_ids: Vec<String>,
    /// Workers involved in a resource conflict.
    pub resources: Vec<String>,
}
