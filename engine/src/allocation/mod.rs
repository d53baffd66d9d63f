//! Task-to-worker allocation.
//!
//! Four greedy strategies assign unassigned tasks in a single pass. The same
//! scoring also ranks assignee recommendations and drives reallocation of
//! in-progress work. Workload analysis feeds the workload-based strategy and
//! team rebalancing advice.

mod reallocation;
mod scoring;
mod strategies;
mod workload;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub use reallocation::{reallocate_tasks, TaskReallocation};
pub use scoring::{AssigneeRecommendation, RecommendationFactors, Scorer};
pub use strategies::{allocate_tasks, recommend_assignees};
pub use workload::{
    member_workload, optimize_workload, team_metrics, MemberWorkload, TeamWorkloadMetrics,
    TeamWorkloadReport, WorkloadOptimization, WorkloadOptimizationKind, WorkloadStrategy,
};

/// Strategy used by [`allocate_tasks`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Fewest tasks assigned in this pass wins.
    Balanced,
    /// Base score plus a fixed bonus for the task type.
    SkillBased,
    /// Highest-priority tasks are placed first.
    PriorityBased,
    /// Base score minus a penalty on projected load.
    WorkloadBased,
}

impl AllocationStrategy {
    pub fn name(self) -> &'static str {
        match self {
            AllocationStrategy::Balanced => "balanced",
            AllocationStrategy::SkillBased => "skill_based",
            AllocationStrategy::PriorityBased => "priority_based",
            AllocationStrategy::WorkloadBased => "workload_based",
        }
    }
}

impl FromStr for AllocationStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balanced" => Ok(Self::Balanced),
            "skill_based" => Ok(Self::SkillBased),
            "priority_based" => Ok(Self::PriorityBased),
            "workload_based" => Ok(Self::WorkloadBased),
            other => {
                tracing::warn!(strategy = other, "Rejecting unknown allocation strategy");
                Err(EngineError::InvalidStrategy(other.to_string()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskAllocationAssignment {
    pub task_id: String,
    pub assignee_id: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub total_tasks: usize,
    pub assigned_tasks: usize,
    pub unassigned_tasks: usize,
    pub total_members: usize,
    pub average_score: f64,
    /// Assignment count per member, in member order; members given nothing are listed with 0.
    pub member_assignments: Vec<(String, usize)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub strategy: AllocationStrategy,
    pub assignments: Vec<TaskAllocationAssignment>,
    pub summary: AllocationSummary,
}
