//! Configuration types for the planning engine.
//!
//! Every tuning constant used by scheduling, allocation and prediction lives
//! here as a named field. Configs deserialize from TOML with all fields
//! optional; missing fields take the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    pub scheduling: SchedulingConfig,
    pub allocation: AllocationConfig,
    pub prediction: PredictionConfig,
}

impl EngineConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Scheduling, critical path and optimization parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Working hours per calendar day when a calendar is requested.
    pub hours_per_day: f64,
    /// Page size used when draining paginated repositories.
    pub page_size: usize,
    /// Utilization above this is reported as over-allocation.
    pub over_allocation_threshold: f64,
    /// Utilization below this is reported as under-utilization.
    pub under_utilization_threshold: f64,
    /// Critical tasks longer than this are suggested for splitting.
    pub split_task_threshold_hours: f64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 8.0,
            page_size: 1000,
            over_allocation_threshold: 1.0,
            under_utilization_threshold: 0.5,
            split_task_threshold_hours: 16.0,
        }
    }
}

/// Weights for the base assignment score shared by all strategies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseScoreWeights {
    pub availability: f64,
    pub priority: f64,
    pub complexity: f64,
    pub task_type: f64,
}

impl Default for BaseScoreWeights {
    fn default() -> Self {
        Self {
            availability: 0.3,
            priority: 0.2,
            complexity: 0.2,
            task_type: 0.3,
        }
    }
}

/// Factor weights used when ranking assignee recommendations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationWeights {
    pub availability: f64,
    pub skill: f64,
    pub workload: f64,
    pub performance: f64,
}

impl Default for RecommendationWeights {
    fn default() -> Self {
        Self {
            availability: 0.25,
            skill: 0.3,
            workload: 0.25,
            performance: 0.2,
        }
    }
}

/// Allocation, reallocation and workload parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub base_weights: BaseScoreWeights,
    pub recommendation_weights: RecommendationWeights,
    /// Extra weight on priority for the priority-based strategy.
    pub priority_bonus_weight: f64,
    /// Penalty weight on projected load for the workload-based strategy.
    pub load_penalty_weight: f64,
    /// Score a candidate must beat the current assignee by before reallocation.
    pub hysteresis_margin: f64,
    /// Max-min load gap that triggers a rebalance recommendation.
    pub imbalance_threshold: f64,
    /// Default weekly capacity in hours for members without their own.
    pub weekly_capacity_hours: f64,
    /// Members loaded above this are flagged by the efficiency pass.
    pub overload_threshold: f64,
    /// Team average load below this is flagged by the capacity pass.
    pub underload_threshold: f64,
    /// Flat performance factor until per-member performance data exists.
    pub performance_placeholder: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            base_weights: BaseScoreWeights::default(),
            recommendation_weights: RecommendationWeights::default(),
            priority_bonus_weight: 0.5,
            load_penalty_weight: 0.5,
            hysteresis_margin: 0.1,
            imbalance_threshold: 0.3,
            weekly_capacity_hours: 40.0,
            overload_threshold: 0.9,
            underload_threshold: 0.6,
            performance_placeholder: 0.8,
        }
    }
}

/// Completion prediction parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Accuracy assumed when no completed tasks carry actual hours.
    pub default_accuracy: f64,
    /// Overrun percentage assumed when no history exists.
    pub default_variance_percent: f64,
    /// Number of latest-finishing tasks reported as critical for a project.
    pub critical_task_count: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            default_accuracy: 0.85,
            default_variance_percent: 15.0,
            critical_task_count: 3,
        }
    }
}
