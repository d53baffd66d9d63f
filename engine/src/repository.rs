//! Storage seams consumed by [`crate::service::PlanningService`].
//!
//! List operations are paginated; callers drain them page by page until a
//! page comes back short. [`InMemoryStore`] implements every trait and backs
//! the tests.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::{Project, Task, TaskSchedule, TaskStatus, Team};

/// One page of a list query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }

    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}

/// Criteria for [`TaskRepository::search`]. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub unassigned_only: bool,
    /// Match tasks assigned to any of these members.
    pub assignee_ids: Vec<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(org) = &self.organization_id {
            if &task.organization_id != org {
                return false;
            }
        }
        if let Some(project) = &self.project_id {
            if task.project_id.as_ref() != Some(project) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if self.unassigned_only && task.assignee.is_some() {
            return false;
        }
        if !self.assignee_ids.is_empty() {
            match &task.assignee {
                Some(assignee) if self.assignee_ids.contains(assignee) => {}
                _ => return false,
            }
        }
        true
    }
}

pub trait TaskRepository: Send + Sync {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>>;
    fn find_by_project(&self, project_id: &str, page: Page) -> Result<Vec<Task>>;
    fn find_by_assignee(&self, assignee_id: &str, page: Page) -> Result<Vec<Task>>;
    fn search(&self, filter: &TaskFilter, page: Page) -> Result<Vec<Task>>;
}

pub trait TeamRepository: Send + Sync {
    fn find_by_id(&self, team_id: &str) -> Result<Option<Team>>;
    fn find_by_organization(&self, organization_id: &str, page: Page) -> Result<Vec<Team>>;
}

pub trait ProjectRepository: Send + Sync {
    fn find_by_id(&self, project_id: &str) -> Result<Option<Project>>;
}

/// Holds the one live schedule per project.
pub trait ScheduleRepository: Send + Sync {
    fn find_by_project(&self, project_id: &str) -> Result<Option<TaskSchedule>>;

    /// Store `schedule` if the stored version still equals `expected_version`
    /// (0 when no schedule exists yet).
    ///
    /// The stored copy gets version `expected_version + 1` and is returned.
    /// A mismatch fails with [`EngineError::VersionConflict`].
    fn save(&self, schedule: TaskSchedule, expected_version: u64) -> Result<TaskSchedule>;
}

/// Drain a paginated query until a short page.
pub fn collect_pages<T>(
    page_size: usize,
    mut fetch: impl FnMut(Page) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    let mut page = Page::first(page_size.max(1));
    let mut items = Vec::new();
    loop {
        let batch = fetch(page)?;
        let short = batch.len() < page.limit;
        items.extend(batch);
        if short {
            return Ok(items);
        }
        page = page.next();
    }
}

fn paginate<'a, T: Clone + 'a>(items: impl Iterator<Item = &'a T>, page: Page) -> Vec<T> {
    items.skip(page.offset).take(page.limit).cloned().collect()
}

/// Thread-safe store keeping insertion order for list queries.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tasks: RwLock<Vec<Task>>,
    teams: RwLock<Vec<Team>>,
    projects: RwLock<FxHashMap<String, Project>>,
    schedules: RwLock<FxHashMap<String, TaskSchedule>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| EngineError::Repository("store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| EngineError::Repository("store lock poisoned".to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a task by id.
    pub fn put_task(&self, task: Task) -> Result<()> {
        let mut tasks = write(&self.tasks)?;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => tasks.push(task),
        }
        Ok(())
    }

    pub fn put_team(&self, team: Team) -> Result<()> {
        let mut teams = write(&self.teams)?;
        match teams.iter_mut().find(|t| t.id == team.id) {
            Some(existing) => *existing = team,
            None => teams.push(team),
        }
        Ok(())
    }

    pub fn put_project(&self, project: Project) -> Result<()> {
        write(&self.projects)?.insert(project.id.clone(), project);
        Ok(())
    }
}

impl TaskRepository for InMemoryStore {
    fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        Ok(read(&self.tasks)?.iter().find(|t| t.id == task_id).cloned())
    }

    fn find_by_project(&self, project_id: &str, page: Page) -> Result<Vec<Task>> {
        let tasks = read(&self.tasks)?;
        Ok(paginate(
            tasks
                .iter()
                .filter(|t| t.project_id.as_deref() == Some(project_id)),
            page,
        ))
    }

    fn find_by_assignee(&self, assignee_id: &str, page: Page) -> Result<Vec<Task>> {
        let tasks = read(&self.tasks)?;
        Ok(paginate(
            tasks
                .iter()
                .filter(|t| t.assignee.as_deref() == Some(assignee_id)),
            page,
        ))
    }

    fn search(&self, filter: &TaskFilter, page: Page) -> Result<Vec<Task>> {
        let tasks = read(&self.tasks)?;
        Ok(paginate(tasks.iter().filter(|t| filter.matches(t)), page))
    }
}

impl TeamRepository for InMemoryStore {
    fn find_by_id(&self, team_id: &str) -> Result<Option<Team>> {
        Ok(read(&self.teams)?.iter().find(|t| t.id == team_id).cloned())
    }

    fn find_by_organization(&self, organization_id: &str, page: Page) -> Result<Vec<Team>> {
        let teams = read(&self.teams)?;
        Ok(paginate(
            teams
                .iter()
                .filter(|t| t.organization_id == organization_id),
            page,
        ))
    }
}

impl ProjectRepository for InMemoryStore {
    fn find_by_id(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(read(&self.projects)?.get(project_id).cloned())
    }
}

impl ScheduleRepository for InMemoryStore {
    fn find_by_project(&self, project_id: &str) -> Result<Option<TaskSchedule>> {
        Ok(read(&self.schedules)?.get(project_id).cloned())
    }

    fn save(&self, mut schedule: TaskSchedule, expected_version: u64) -> Result<TaskSchedule> {
        let mut schedules = write(&self.schedules)?;
        let found = schedules
            .get(&schedule.project_id)
            .map_or(0, |stored| stored.version);
        if found != expected_version {
            return Err(EngineError::VersionConflict {
                project_id: schedule.project_id,
                expected: expected_version,
                found,
            });
        }
        schedule.version = expected_version + 1;
        schedules.insert(schedule.project_id.clone(), schedule.clone());
        Ok(schedule)
    }
}
