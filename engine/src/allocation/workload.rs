//! Member and team workload analysis.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AllocationConfig;
use crate::error::EngineError;
use crate::models::{Task, TeamMember};

/// Load of one member from their active tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberWorkload {
    pub user_id: String,
    pub active_tasks: usize,
    pub total_hours: f64,
    pub weekly_capacity_hours: f64,
    /// `total_hours / weekly_capacity_hours`, capped at 1.
    pub current_load: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamWorkloadMetrics {
    pub average_load: f64,
    pub max_load: f64,
    pub min_load: f64,
    /// Population variance of member loads.
    pub load_variance: f64,
    pub total_tasks: usize,
    pub balance_score: f64,
    pub is_unbalanced: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamWorkloadReport {
    pub team_id: String,
    pub members: Vec<MemberWorkload>,
    pub metrics: TeamWorkloadMetrics,
}

/// Workload of `member` given tasks assigned to them.
///
/// Only pending and in-progress tasks count.
pub fn member_workload(
    member: &TeamMember,
    tasks: &[Task],
    config: &AllocationConfig,
) -> MemberWorkload {
    let active: Vec<&Task> = tasks.iter().filter(|t| t.status.is_active()).collect();
    let total_hours: f64 = active.iter().map(|t| t.duration_hours()).sum();
    let capacity = member
        .weekly_capacity_hours
        .unwrap_or(config.weekly_capacity_hours);
    let current_load = if capacity > 0.0 {
        (total_hours / capacity).min(1.0)
    } else {
        1.0
    };

    MemberWorkload {
        user_id: member.user_id.clone(),
        active_tasks: active.len(),
        total_hours,
        weekly_capacity_hours: capacity,
        current_load,
    }
}

/// Aggregate member loads. An empty team has zero load and is fully balanced.
pub fn team_metrics(members: &[MemberWorkload]) -> TeamWorkloadMetrics {
    if members.is_empty() {
        return TeamWorkloadMetrics {
            balance_score: 1.0,
            ..TeamWorkloadMetrics::default()
        };
    }

    let count = members.len() as f64;
    let loads = members.iter().map(|m| m.current_load);
    let average_load = loads.clone().sum::<f64>() / count;
    let max_load = loads.clone().fold(f64::MIN, f64::max);
    let min_load = loads.clone().fold(f64::MAX, f64::min);
    let load_variance = loads.map(|l| (l - average_load).powi(2)).sum::<f64>() / count;

    TeamWorkloadMetrics {
        average_load,
        max_load,
        min_load,
        load_variance,
        total_tasks: members.iter().map(|m| m.active_tasks).sum(),
        balance_score: 1.0 - load_variance,
        is_unbalanced: load_variance > average_load,
    }
}

/// What [`optimize_workload`] looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStrategy {
    /// Narrow the gap between the most and least loaded members.
    Balance,
    /// Relieve overloaded members.
    Efficiency,
    /// Flag spare team capacity.
    Capacity,
}

impl FromStr for WorkloadStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balance" => Ok(Self::Balance),
            "efficiency" => Ok(Self::Efficiency),
            "capacity" => Ok(Self::Capacity),
            other => {
                tracing::warn!(strategy = other, "Rejecting unknown workload strategy");
                Err(EngineError::InvalidStrategy(other.to_string()))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadOptimizationKind {
    /// Move work from the first listed member to the second.
    Rebalance,
    /// Reduce the listed member's load.
    Reduce,
    /// Take on more work.
    Increase,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkloadOptimization {
    pub kind: WorkloadOptimizationKind,
    pub members: Vec<String>,
    pub description: String,
}

/// Recommendations for a team's workload under `strategy`.
pub fn optimize_workload(
    report: &TeamWorkloadReport,
    strategy: WorkloadStrategy,
    config: &AllocationConfig,
) -> Vec<WorkloadOptimization> {
    match strategy {
        WorkloadStrategy::Balance => {
            let busiest = report
                .members
                .iter()
                .reduce(|a, b| if b.current_load > a.current_load { b } else { a });
            let idlest = report
                .members
                .iter()
                .reduce(|a, b| if b.current_load < a.current_load { b } else { a });
            match (busiest, idlest) {
                (Some(max), Some(min))
                    if max.current_load - min.current_load > config.imbalance_threshold =>
                {
                    vec![WorkloadOptimization {
                        kind: WorkloadOptimizationKind::Rebalance,
                        members: vec![max.user_id.clone(), min.user_id.clone()],
                        description: format!(
                            "Move work from {} ({:.0}% loaded) to {} ({:.0}% loaded)",
                            max.user_id,
                            max.current_load * 100.0,
                            min.user_id,
                            min.current_load * 100.0
                        ),
                    }]
                }
                _ => Vec::new(),
            }
        }
        WorkloadStrategy::Efficiency => report
            .members
            .iter()
            .filter(|m| m.current_load > config.overload_threshold)
            .map(|m| WorkloadOptimization {
                kind: WorkloadOptimizationKind::Reduce,
                members: vec![m.user_id.clone()],
                description: format!(
                    "{} is at {:.0}% of capacity",
                    m.user_id,
                    m.current_load * 100.0
                ),
            })
            .collect(),
        WorkloadStrategy::Capacity => {
            if report.members.is_empty()
                || report.metrics.average_load >= config.underload_threshold
            {
                return Vec::new();
            }
            vec![WorkloadOptimization {
                kind: WorkloadOptimizationKind::Increase,
                members: report.members.iter().map(|m| m.user_id.clone()).collect(),
                description: format!(
                    "Team average load is {:.0}%; capacity is available for more work",
                    report.metrics.average_load * 100.0
                ),
            }]
        }
    }
}
