//! Allocation, reallocation and workload operations.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::allocation::{
    self, member_workload, team_metrics, AllocationResult, AllocationStrategy,
    AssigneeRecommendation, MemberWorkload, TaskReallocation, TeamWorkloadReport,
    WorkloadOptimization, WorkloadStrategy,
};
use crate::error::Result;
use crate::models::{TaskStatus, TeamMember};
use crate::repository::{collect_pages, TaskFilter};

use super::PlanningService;

/// Which tasks to allocate and to whom.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub organization_id: String,
    /// Restrict to one project's tasks.
    pub project_id: Option<String>,
    /// Restrict candidates to one team; otherwise every team in the organization.
    pub team_id: Option<String>,
    pub strategy: String,
    /// Cap on tasks allocated in this call.
    pub max_tasks: Option<usize>,
}

impl PlanningService {
    fn member_workloads(&self, members: &[TeamMember]) -> Result<Vec<MemberWorkload>> {
        members
            .iter()
            .map(|member| {
                let tasks = self.assignee_tasks(&member.user_id)?;
                Ok(member_workload(member, &tasks, &self.config.allocation))
            })
            .collect()
    }

    fn member_loads(&self, members: &[TeamMember]) -> Result<FxHashMap<String, f64>> {
        Ok(self
            .member_workloads(members)?
            .into_iter()
            .map(|w| (w.user_id, w.current_load))
            .collect())
    }

    /// Assign pending, unassigned tasks with the named strategy.
    ///
    /// Returns the assignments for the caller to apply; no task is modified.
    pub fn allocate_tasks(&self, request: &AllocationRequest) -> Result<AllocationResult> {
        let strategy: AllocationStrategy = request.strategy.parse()?;
        let members = self.members(&request.organization_id, request.team_id.as_deref())?;

        let filter = TaskFilter {
            organization_id: Some(request.organization_id.clone()),
            project_id: request.project_id.clone(),
            status: Some(TaskStatus::Pending),
            unassigned_only: true,
            assignee_ids: Vec::new(),
        };
        let mut tasks = collect_pages(self.config.scheduling.page_size, |page| {
            let batch = self.tasks.search(&filter, page)?;
            self.check_cancelled()?;
            Ok(batch)
        })?;
        if let Some(max) = request.max_tasks {
            tasks.truncate(max);
        }

        let loads = if strategy == AllocationStrategy::WorkloadBased {
            self.member_loads(&members)?
        } else {
            FxHashMap::default()
        };

        allocation::allocate_tasks(
            &tasks,
            &members,
            strategy,
            &loads,
            &self.config.allocation,
            self.verbosity(),
        )
    }

    /// Rank candidates for a task, drawn from `team_id` or the task's organization.
    pub fn recommend_assignee(
        &self,
        task_id: &str,
        team_id: Option<&str>,
    ) -> Result<Vec<AssigneeRecommendation>> {
        let task = self.task(task_id)?;
        let members = self.members(&task.organization_id, team_id)?;
        let loads = self.member_loads(&members)?;
        Ok(allocation::recommend_assignees(
            &task,
            &members,
            &loads,
            &self.config.allocation,
        ))
    }

    /// Suggest moving in-progress tasks to clearly better-suited members.
    pub fn reallocate_tasks(
        &self,
        organization_id: &str,
        team_id: Option<&str>,
    ) -> Result<Vec<TaskReallocation>> {
        let members = self.members(organization_id, team_id)?;
        let filter = TaskFilter {
            organization_id: Some(organization_id.to_string()),
            status: Some(TaskStatus::InProgress),
            assignee_ids: members.iter().map(|m| m.user_id.clone()).collect(),
            ..TaskFilter::default()
        };
        if filter.assignee_ids.is_empty() {
            return Ok(Vec::new());
        }
        let tasks = collect_pages(self.config.scheduling.page_size, |page| {
            let batch = self.tasks.search(&filter, page)?;
            self.check_cancelled()?;
            Ok(batch)
        })?;

        Ok(allocation::reallocate_tasks(
            &tasks,
            &members,
            &self.config.allocation,
            self.verbosity(),
        ))
    }

    pub fn analyze_team_workload(&self, team_id: &str) -> Result<TeamWorkloadReport> {
        let team = self.team(team_id)?;
        let members = self.member_workloads(&team.members)?;
        let metrics = team_metrics(&members);
        Ok(TeamWorkloadReport {
            team_id: team.id,
            members,
            metrics,
        })
    }

    /// Workload recommendations for a team under the named strategy.
    pub fn optimize_workload(
        &self,
        team_id: &str,
        strategy: &str,
    ) -> Result<Vec<WorkloadOptimization>> {
        let strategy: WorkloadStrategy = strategy.parse()?;
        let report = self.analyze_team_workload(team_id)?;
        Ok(allocation::optimize_workload(
            &report,
            strategy,
            &self.config.allocation,
        ))
    }
}
