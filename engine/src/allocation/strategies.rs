//! Greedy single-pass allocation and assignee ranking.

use rustc_hash::FxHashMap;

use crate::config::AllocationConfig;
use crate::error::{EngineError, Result};
use crate::models::{Task, TeamMember};
use crate::{log_changes, log_checks};

use super::scoring::{AssigneeRecommendation, Scorer};
use super::{AllocationResult, AllocationStrategy, AllocationSummary, TaskAllocationAssignment};

/// Index and score of the highest-scoring candidate; ties keep the earlier one.
fn best_candidate(
    candidates: &[&TeamMember],
    mut score: impl FnMut(usize, &TeamMember) -> f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (slot, member) in candidates.iter().enumerate() {
        let value = score(slot, *member);
        if best.map_or(true, |(_, top)| value > top) {
            best = Some((slot, value));
        }
    }
    best
}

/// Candidate with the fewest tasks so far; ties keep the earlier one.
fn least_assigned(counts: &[usize]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (slot, &count) in counts.iter().enumerate() {
        if best.map_or(true, |b| count < counts[b]) {
            best = Some(slot);
        }
    }
    best
}

fn capacity_of(member: &TeamMember, config: &AllocationConfig) -> f64 {
    member
        .weekly_capacity_hours
        .unwrap_or(config.weekly_capacity_hours)
}

/// Assign every task in `tasks` to one of the available `members`.
///
/// `loads` holds each member's current load (0-1) and only matters to the
/// workload-based strategy, which projects it forward as tasks are placed.
/// The result depends only on the inputs: same tasks, members and strategy
/// give the same assignments.
pub fn allocate_tasks(
    tasks: &[Task],
    members: &[TeamMember],
    strategy: AllocationStrategy,
    loads: &FxHashMap<String, f64>,
    config: &AllocationConfig,
    verbosity: u8,
) -> Result<AllocationResult> {
    let candidates: Vec<&TeamMember> = members.iter().filter(|m| m.is_available()).collect();
    let exhausted = || {
        EngineError::CapacityExhausted(format!(
            "no available team members for {} tasks",
            tasks.len()
        ))
    };
    if candidates.is_empty() && !tasks.is_empty() {
        return Err(exhausted());
    }

    let scorer = Scorer::new(config);
    let mut order: Vec<&Task> = tasks.iter().collect();
    if strategy == AllocationStrategy::PriorityBased {
        order.sort_by(|a, b| b.priority.weight().total_cmp(&a.priority.weight()));
    }

    let mut counts = vec![0usize; candidates.len()];
    let mut projected: Vec<f64> = candidates
        .iter()
        .map(|m| loads.get(&m.user_id).copied().unwrap_or(0.0))
        .collect();
    let mut assignments = Vec::with_capacity(order.len());

    for task in order {
        let picked = match strategy {
            AllocationStrategy::Balanced => least_assigned(&counts)
                .map(|slot| (slot, scorer.base_score(task, candidates[slot]))),
            AllocationStrategy::SkillBased => {
                best_candidate(&candidates, |_, m| scorer.skill_score(task, m))
            }
            AllocationStrategy::PriorityBased => {
                best_candidate(&candidates, |_, m| scorer.priority_score(task, m))
            }
            AllocationStrategy::WorkloadBased => best_candidate(&candidates, |slot, m| {
                scorer.workload_score(task, m, projected[slot])
            }),
        };
        let Some((slot, score)) = picked else {
            return Err(exhausted());
        };
        let member = candidates[slot];

        counts[slot] += 1;
        if strategy == AllocationStrategy::WorkloadBased {
            let capacity = capacity_of(member, config);
            let added = if capacity > 0.0 {
                task.duration_hours() / capacity
            } else {
                1.0
            };
            projected[slot] = (projected[slot] + added).min(1.0);
            log_checks!(
                verbosity,
                member = %member.user_id,
                load = projected[slot],
                "Projected member load"
            );
        }

        log_changes!(
            verbosity,
            task_id = %task.id,
            assignee = %member.user_id,
            score,
            strategy = strategy.name(),
            "Allocated task"
        );
        assignments.push(TaskAllocationAssignment {
            task_id: task.id.clone(),
            assignee_id: member.user_id.clone(),
            score,
            reason: reason(strategy).to_string(),
        });
    }

    let average_score = if assignments.is_empty() {
        0.0
    } else {
        assignments.iter().map(|a| a.score).sum::<f64>() / assignments.len() as f64
    };
    let summary = AllocationSummary {
        total_tasks: tasks.len(),
        assigned_tasks: assignments.len(),
        unassigned_tasks: tasks.len() - assignments.len(),
        total_members: candidates.len(),
        average_score,
        member_assignments: candidates
            .iter()
            .zip(&counts)
            .map(|(m, &count)| (m.user_id.clone(), count))
            .collect(),
    };

    Ok(AllocationResult {
        strategy,
        assignments,
        summary,
    })
}

fn reason(strategy: AllocationStrategy) -> &'static str {
    match strategy {
        AllocationStrategy::Balanced => "fewest tasks assigned in this pass",
        AllocationStrategy::SkillBased => "best skill match for the task type",
        AllocationStrategy::PriorityBased => "highest score for a priority-ordered task",
        AllocationStrategy::WorkloadBased => "lowest projected workload",
    }
}

/// Rank available members for `task`, best first.
///
/// Members with equal scores keep their input order.
pub fn recommend_assignees(
    task: &Task,
    members: &[TeamMember],
    loads: &FxHashMap<String, f64>,
    config: &AllocationConfig,
) -> Vec<AssigneeRecommendation> {
    let scorer = Scorer::new(config);
    let mut recommendations: Vec<AssigneeRecommendation> = members
        .iter()
        .filter(|m| m.is_available())
        .map(|m| {
            let load = loads.get(&m.user_id).copied().unwrap_or(0.0);
            scorer.recommend(task, m, load)
        })
        .collect();
    recommendations.sort_by(|a, b| b.score.total_cmp(&a.score));
    recommendations
}
