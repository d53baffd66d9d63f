//! Critical path method (CPM) over a project's dependency graph.
//!
//! A forward pass computes earliest start/finish, a backward pass from the
//! makespan computes latest start/finish, and zero-slack tasks form the
//! critical path.

mod analysis;
mod calculation;
mod types;

pub use analysis::{analyze_risks, suggest_optimizations};
pub use calculation::calculate_critical_path;
pub use types::{
    CriticalPath, CriticalPathAnalysis, CriticalPathResult, CriticalPathRisk, CriticalPathTask,
    PathSuggestion, RiskKind, TaskTiming,
};
