//! Task scheduling and allocation engine.
//!
//! Builds dependency-ordered schedules, computes critical paths, detects and
//! resolves schedule conflicts, forecasts completion and assigns tasks to
//! team members. The passes are pure functions over task snapshots;
//! [`service::PlanningService`] wires them to repositories.

pub mod allocation;
pub mod config;
pub mod conflicts;
pub mod critical_path;
pub mod error;
pub mod graph;
mod interner;
pub mod logging;
pub mod models;
pub mod optimization;
pub mod prediction;
pub mod repository;
pub mod scheduler;
pub mod service;

pub use allocation::{AllocationResult, AllocationStrategy, WorkloadStrategy};
pub use config::{AllocationConfig, EngineConfig, PredictionConfig, SchedulingConfig};
pub use conflicts::{ConflictType, ResolutionStrategy, ScheduleConflict, Severity};
pub use critical_path::{CriticalPath, CriticalPathAnalysis};
pub use error::{EngineError, Result};
pub use graph::DependencyGraph;
pub use models::{
    Complexity, Priority, Project, ScheduledTask, Task, TaskSchedule, TaskStatus, TaskType, Team,
    TeamMember,
};
pub use optimization::OptimizationStrategy;
pub use repository::{InMemoryStore, Page, TaskFilter};
pub use scheduler::{Scheduler, WorkingHours};
pub use service::{AllocationRequest, GeneratedSchedule, PlanningService, PredictionTarget};
