//! The callable planning surface.
//!
//! [`PlanningService`] fetches snapshots from the repositories, runs the pure
//! engine passes over them and persists schedules through the version-checked
//! [`ScheduleRepository`]. It holds no mutable state, so one instance can
//! serve concurrent calls for different projects.

mod allocation;
mod scheduling;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{Project, Task, Team, TeamMember};
use crate::repository::{
    collect_pages, InMemoryStore, ProjectRepository, ScheduleRepository, TaskRepository,
    TeamRepository,
};

pub use allocation::AllocationRequest;
pub use scheduling::{GeneratedSchedule, PredictionTarget};

pub struct PlanningService {
    tasks: Arc<dyn TaskRepository>,
    teams: Arc<dyn TeamRepository>,
    projects: Arc<dyn ProjectRepository>,
    schedules: Arc<dyn ScheduleRepository>,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl PlanningService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        teams: Arc<dyn TeamRepository>,
        projects: Arc<dyn ProjectRepository>,
        schedules: Arc<dyn ScheduleRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tasks,
            teams,
            projects,
            schedules,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Service backed entirely by one in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, config: EngineConfig) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            config,
        )
    }

    /// Abort work once `cancel` fires.
    ///
    /// The token is checked after every repository fetch and before anything
    /// is persisted, so a cancelled call never stores a partial result.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn verbosity(&self) -> u8 {
        self.config.verbosity
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::debug!(target: "taskflow_engine", "Planning call cancelled");
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    fn project(&self, project_id: &str) -> Result<Project> {
        let project = self.projects.find_by_id(project_id)?;
        self.check_cancelled()?;
        project.ok_or_else(|| EngineError::not_found("project", project_id))
    }

    fn team(&self, team_id: &str) -> Result<Team> {
        let team = self.teams.find_by_id(team_id)?;
        self.check_cancelled()?;
        team.ok_or_else(|| EngineError::not_found("team", team_id))
    }

    fn task(&self, task_id: &str) -> Result<Task> {
        let task = self.tasks.find_by_id(task_id)?;
        self.check_cancelled()?;
        task.ok_or_else(|| EngineError::not_found("task", task_id))
    }

    fn project_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        collect_pages(self.config.scheduling.page_size, |page| {
            let batch = self.tasks.find_by_project(project_id, page)?;
            self.check_cancelled()?;
            Ok(batch)
        })
    }

    fn assignee_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        collect_pages(self.config.scheduling.page_size, |page| {
            let batch = self.tasks.find_by_assignee(user_id, page)?;
            self.check_cancelled()?;
            Ok(batch)
        })
    }

    /// Members of `team_id`, or of every team in the organization when no
    /// team is given. A member of several teams is listed once.
    fn members(&self, organization_id: &str, team_id: Option<&str>) -> Result<Vec<TeamMember>> {
        if let Some(team_id) = team_id {
            return Ok(self.team(team_id)?.members);
        }

        let teams = collect_pages(self.config.scheduling.page_size, |page| {
            let batch = self.teams.find_by_organization(organization_id, page)?;
            self.check_cancelled()?;
            Ok(batch)
        })?;

        let mut members: Vec<TeamMember> = Vec::new();
        for member in teams.into_iter().flat_map(|t| t.members) {
            if !members.iter().any(|m| m.user_id == member.user_id) {
                members.push(member);
            }
        }
        Ok(members)
    }
}
