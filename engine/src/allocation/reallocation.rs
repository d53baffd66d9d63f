//! Reassignment of in-progress work with hysteresis.

use serde::{Deserialize, Serialize};

use crate::config::AllocationConfig;
use crate::log_changes;
use crate::models::{Task, TaskStatus, TeamMember};

use super::scoring::Scorer;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskReallocation {
    pub task_id: String,
    pub from_assignee: String,
    pub to_assignee: String,
    pub current_score: f64,
    pub new_score: f64,
    pub reason: String,
}

/// Suggest moving in-progress tasks to clearly better-scoring members.
///
/// The best available member other than the current assignee takes over only
/// when it beats the current score by more than the hysteresis margin, so
/// near-ties never cause churn. An assignee who is inactive or has no
/// availability scores 0. Tasks assigned outside `members` are left alone.
pub fn reallocate_tasks(
    tasks: &[Task],
    members: &[TeamMember],
    config: &AllocationConfig,
    verbosity: u8,
) -> Vec<TaskReallocation> {
    let scorer = Scorer::new(config);
    let candidates: Vec<&TeamMember> = members.iter().filter(|m| m.is_available()).collect();
    let margin = config.hysteresis_margin;

    let mut reallocations = Vec::new();
    for task in tasks.iter().filter(|t| t.status == TaskStatus::InProgress) {
        let Some(assignee) = task.assignee.as_deref() else {
            continue;
        };
        let Some(current) = members.iter().find(|m| m.user_id == assignee) else {
            continue;
        };

        let current_score = if current.is_available() {
            scorer.base_score(task, current)
        } else {
            0.0
        };
        let mut best: Option<(&TeamMember, f64)> = None;
        for member in candidates.iter().filter(|m| m.user_id != assignee) {
            let score = scorer.base_score(task, member);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((*member, score));
            }
        }
        let Some((member, best_score)) = best else {
            continue;
        };
        if best_score <= current_score + margin {
            continue;
        }

        log_changes!(
            verbosity,
            task_id = %task.id,
            from = assignee,
            to = %member.user_id,
            "Reallocating task"
        );
        reallocations.push(TaskReallocation {
            task_id: task.id.clone(),
            from_assignee: assignee.to_string(),
            to_assignee: member.user_id.clone(),
            current_score,
            new_score: best_score,
            reason: format!(
                "score {best_score:.2} beats current {current_score:.2} by more than {margin:.2}"
            ),
        });
    }
    reallocations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(id: &str, assignee: &str) -> Task {
        Task::new(id, id)
            .with_status(TaskStatus::InProgress)
            .with_assignee(assignee)
    }

    #[test]
    fn test_clearly_better_member_takes_over() {
        // Availability 1.0 vs 0.4 differs by .18 in base score.
        let members = vec![TeamMember::new("slow", 0.4), TeamMember::new("free", 1.0)];
        let moves = reallocate_tasks(
            &[running("t1", "slow")],
            &members,
            &AllocationConfig::default(),
            0,
        );

        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].from_assignee, "slow");
        assert_eq!(moves[0].to_assignee, "free");
        assert!(moves[0].new_score - moves[0].current_score > 0.1);
    }

    #[test]
    fn test_small_advantage_stays_within_hysteresis() {
        // .2 availability difference is only .06 of score.
        let members = vec![TeamMember::new("a", 0.8), TeamMember::new("b", 1.0)];
        let moves = reallocate_tasks(
            &[running("t1", "a")],
            &members,
            &AllocationConfig::default(),
            0,
        );
        assert!(moves.is_empty());
    }

    #[test]
    fn test_picks_highest_scorer_not_first_to_clear_margin() {
        // cur .57, b .72, c .81: both clear the margin, c wins though b comes first.
        let members = vec![
            TeamMember::new("cur", 0.2),
            TeamMember::new("b", 0.7),
            TeamMember::new("c", 1.0),
        ];
        let moves = reallocate_tasks(
            &[running("t1", "cur")],
            &members,
            &AllocationConfig::default(),
            0,
        );

        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].to_assignee, "c");
        assert!((moves[0].current_score - 0.57).abs() < 1e-9);
        assert!((moves[0].new_score - 0.81).abs() < 1e-9);
    }

    #[test]
    fn test_work_leaves_unavailable_assignee() {
        let members = vec![
            TeamMember::new("away", 1.0).inactive(),
            TeamMember::new("zero", 0.0),
            TeamMember::new("free", 0.5),
        ];
        let tasks = vec![running("t1", "away"), running("t2", "zero")];
        let moves = reallocate_tasks(&tasks, &members, &AllocationConfig::default(), 0);

        let moved: Vec<(&str, &str, &str)> = moves
            .iter()
            .map(|m| (m.task_id.as_str(), m.from_assignee.as_str(), m.to_assignee.as_str()))
            .collect();
        assert_eq!(moved, vec![("t1", "away", "free"), ("t2", "zero", "free")]);
        assert!(moves.iter().all(|m| m.current_score == 0.0));
    }

    #[test]
    fn test_unavailable_assignee_keeps_work_without_replacement() {
        let members = vec![TeamMember::new("away", 1.0).inactive()];
        let moves = reallocate_tasks(
            &[running("t1", "away")],
            &members,
            &AllocationConfig::default(),
            0,
        );
        assert!(moves.is_empty());
    }

    #[test]
    fn test_only_running_tasks_with_known_assignee() {
        let members = vec![TeamMember::new("slow", 0.2), TeamMember::new("free", 1.0)];
        let tasks = vec![
            Task::new("pending", "Pending").with_assignee("slow"),
            Task::new("unassigned", "Unassigned").with_status(TaskStatus::InProgress),
            running("outsider", "someone-else"),
        ];
        let moves = reallocate_tasks(&tasks, &members, &AllocationConfig::default(), 0);
        assert!(moves.is_empty());
    }
}
