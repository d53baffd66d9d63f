//! Assignment scoring shared by allocation, recommendation and reallocation.

use serde::{Deserialize, Serialize};

use crate::config::AllocationConfig;
use crate::models::{Task, TeamMember};

/// Weighted factors behind a recommendation score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationFactors {
    pub availability: f64,
    pub skill_match: f64,
    pub workload: f64,
    pub performance: f64,
}

impl RecommendationFactors {
    fn values(&self) -> [f64; 4] {
        [self.availability, self.skill_match, self.workload, self.performance]
    }

    pub fn total(&self) -> f64 {
        self.values().iter().sum()
    }

    /// `1 / (1 + variance)` of the factors about their mean, capped at 1.
    ///
    /// Agreeing factors give a confident recommendation; one factor carrying
    /// the score gives a weak one.
    pub fn confidence(&self) -> f64 {
        let values = self.values();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        (1.0 / (1.0 + variance)).min(1.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssigneeRecommendation {
    pub user_id: String,
    pub score: f64,
    pub factors: RecommendationFactors,
    pub confidence: f64,
}

/// Scores task/member pairs with the configured weights.
#[derive(Clone, Copy, Debug)]
pub struct Scorer<'a> {
    config: &'a AllocationConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'a AllocationConfig {
        self.config
    }

    /// Score every strategy starts from.
    pub fn base_score(&self, task: &Task, member: &TeamMember) -> f64 {
        let w = &self.config.base_weights;
        member.availability * w.availability
            + task.priority.weight() * w.priority
            + task.complexity.weight() * w.complexity
            + task.task_type.weight() * w.task_type
    }

    pub fn skill_score(&self, task: &Task, member: &TeamMember) -> f64 {
        self.base_score(task, member) + task.task_type.skill_bonus()
    }

    pub fn priority_score(&self, task: &Task, member: &TeamMember) -> f64 {
        self.base_score(task, member) + task.priority.weight() * self.config.priority_bonus_weight
    }

    /// Base score penalized by the member's load (0-1).
    pub fn workload_score(&self, task: &Task, member: &TeamMember, load: f64) -> f64 {
        self.base_score(task, member) - load * self.config.load_penalty_weight
    }

    /// Rank `member` for `task` given the member's current load (0-1).
    pub fn recommend(&self, task: &Task, member: &TeamMember, load: f64) -> AssigneeRecommendation {
        let w = &self.config.recommendation_weights;
        let factors = RecommendationFactors {
            availability: member.availability * w.availability,
            skill_match: self.skill_score(task, member) * w.skill,
            workload: (1.0 - load).max(0.0) * w.workload,
            performance: self.config.performance_placeholder * w.performance,
        };
        AssigneeRecommendation {
            user_id: member.user_id.clone(),
            score: factors.total(),
            factors,
            confidence: factors.confidence(),
        }
    }
}
