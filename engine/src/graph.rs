//! Dependency graph construction and topological sequencing.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::error::{EngineError, Result};
use crate::interner::{TaskIdx, TaskIndex};
use crate::log_checks;
use crate::models::Task;

/// Largest accepted per-task estimate, in hours.
pub const MAX_ESTIMATE_HOURS: f64 = 1_000_000.0;

/// Adjacency structure over one project's tasks.
///
/// Nodes are numbered in input order. Edges run from a dependency to its
/// dependent. Dependencies naming tasks outside the input are dropped, since
/// they cannot constrain this task set.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    index: TaskIndex,
    durations: Vec<f64>,
    predecessors: Vec<Vec<TaskIdx>>,
    successors: Vec<Vec<TaskIdx>>,
}

impl DependencyGraph {
    /// Build the graph for a task set.
    ///
    /// # Arguments
    /// * `tasks` - Tasks of one project, in caller order
    /// * `verbosity` - Logging verbosity level
    ///
    /// # Returns
    /// * `Err(EngineError::Validation)` if two tasks share an id, or an
    ///   estimate is not finite or exceeds [`MAX_ESTIMATE_HOURS`]
    pub fn build(tasks: &[Task], verbosity: u8) -> Result<Self> {
        let mut index = TaskIndex::with_capacity(tasks.len());
        for task in tasks {
            if let Some(hours) = task.estimated_hours {
                if !hours.is_finite() || hours > MAX_ESTIMATE_HOURS {
                    return Err(EngineError::Validation(format!(
                        "task {} has an unusable estimate of {} hours",
                        task.id, hours
                    )));
                }
            }
            if index.insert(&task.id).is_none() {
                return Err(EngineError::Validation(format!(
                    "duplicate task id: {}",
                    task.id
                )));
            }
        }

        let n = tasks.len();
        let mut predecessors: Vec<Vec<TaskIdx>> = vec![Vec::new(); n];
        let mut successors: Vec<Vec<TaskIdx>> = vec![Vec::new(); n];

        for (idx, task) in tasks.iter().enumerate() {
            let mut seen: FxHashSet<TaskIdx> = FxHashSet::default();
            for dep_id in &task.dependencies {
                let Some(dep_idx) = index.get(dep_id) else {
                    log_checks!(
                        verbosity,
                        task_id = %task.id,
                        dependency = %dep_id,
                        "Ignoring dependency outside the task set"
                    );
                    continue;
                };
                if seen.insert(dep_idx) {
                    predecessors[idx].push(dep_idx);
                    successors[dep_idx].push(idx);
                }
            }
        }

        Ok(Self {
            index,
            durations: tasks.iter().map(Task::duration_hours).collect(),
            predecessors,
            successors,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn idx(&self, task_id: &str) -> Option<TaskIdx> {
        self.index.get(task_id)
    }

    pub fn task_id(&self, idx: TaskIdx) -> &str {
        self.index.resolve(idx)
    }

    pub fn duration(&self, idx: TaskIdx) -> f64 {
        self.durations[idx]
    }

    pub fn predecessors(&self, idx: TaskIdx) -> &[TaskIdx] {
        &self.predecessors[idx]
    }

    pub fn successors(&self, idx: TaskIdx) -> &[TaskIdx] {
        &self.successors[idx]
    }

    /// Order tasks so every task follows all of its dependencies.
    ///
    /// Kahn's algorithm with a FIFO queue seeded in input order; tasks that
    /// become ready are queued in the order they are discovered.
    ///
    /// # Returns
    /// * `Ok(order)` containing every task exactly once
    /// * `Err(EngineError::CyclicDependency)` naming every task that could not
    ///   be ordered, in input order
    pub fn topological_sequence(&self) -> Result<Vec<TaskIdx>> {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();

        let mut queue: VecDeque<TaskIdx> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            for &succ in &self.successors[idx] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() != n {
            let tasks = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.task_id(i).to_string())
                .collect();
            return Err(EngineError::CyclicDependency { tasks });
        }

        Ok(order)
    }

    /// Topological order as task ids.
    pub fn sequence_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .topological_sequence()?
            .into_iter()
            .map(|idx| self.task_id(idx).to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: &str, deps: &[&str]) -> Task {
        Task::new(id, id).with_dependencies(deps).with_estimate(1.0)
    }

    fn assert_respects_dependencies(tasks: &[Task], order: &[String]) {
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        for task in tasks {
            for dep in &task.dependencies {
                assert!(pos(dep) < pos(&task.id), "{} must precede {}", dep, task.id);
            }
        }
    }

    #[test]
    fn test_chain_order() {
        let tasks = vec![
            make_task("c", &["b"]),
            make_task("b", &["a"]),
            make_task("a", &[]),
        ];
        let graph = DependencyGraph::build(&tasks, 0).unwrap();
        assert_eq!(graph.sequence_ids().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ready_ties_keep_input_order() {
        let tasks = vec![
            make_task("x", &[]),
            make_task("y", &[]),
            make_task("z", &["x"]),
            make_task("w", &[]),
        ];
        let graph = DependencyGraph::build(&tasks, 0).unwrap();
        assert_eq!(graph.sequence_ids().unwrap(), vec!["x", "y", "w", "z"]);
    }

    #[test]
    fn test_diamond_respects_dependencies() {
        let tasks = vec![
            make_task("d", &["b", "c"]),
            make_task("b", &["a"]),
            make_task("c", &["a"]),
            make_task("a", &[]),
            make_task("e", &["d", "a"]),
        ];
        let graph = DependencyGraph::build(&tasks, 0).unwrap();
        let order = graph.sequence_ids().unwrap();
        assert_eq!(order.len(), tasks.len());
        assert_respects_dependencies(&tasks, &order);
    }

    #[test]
    fn test_cycle_is_reported_without_partial_order() {
        let tasks = vec![
            make_task("root", &[]),
            make_task("a", &["root", "c"]),
            make_task("b", &["a"]),
            make_task("c", &["b"]),
            make_task("tail", &["c"]),
        ];
        let graph = DependencyGraph::build(&tasks, 0).unwrap();
        match graph.topological_sequence() {
            Err(EngineError::CyclicDependency { tasks }) => {
                assert_eq!(tasks, vec!["a", "b", "c", "tail"]);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![make_task("a", &["a"])];
        let graph = DependencyGraph::build(&tasks, 0).unwrap();
        assert!(matches!(
            graph.topological_sequence(),
            Err(EngineError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_and_duplicate_dependencies() {
        let tasks = vec![make_task("a", &[]), make_task("b", &["a", "a", "ghost"])];
        let graph = DependencyGraph::build(&tasks, 0).unwrap();
        let b = graph.idx("b").unwrap();
        assert_eq!(graph.predecessors(b), &[0]);
        assert_eq!(graph.successors(0), &[b]);
        assert_eq!(graph.sequence_ids().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_task_id_rejected() {
        let tasks = vec![make_task("a", &[]), make_task("a", &[])];
        assert!(matches!(
            DependencyGraph::build(&tasks, 0),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_unusable_estimates_rejected() {
        for hours in [f64::INFINITY, f64::NAN, 1e15] {
            let tasks = vec![make_task("a", &[]), Task::new("b", "b").with_estimate(hours)];
            assert!(
                matches!(
                    DependencyGraph::build(&tasks, 0),
                    Err(EngineError::Validation(_))
                ),
                "estimate {hours} should be rejected"
            );
        }

        let tasks = vec![Task::new("a", "a").with_estimate(MAX_ESTIMATE_HOURS)];
        assert!(DependencyGraph::build(&tasks, 0).is_ok());
    }

    #[test]
    fn test_wide_dag_respects_dependencies() {
        // Each task depends on the tasks whose index divides its own.
        let tasks: Vec<Task> = (1..=30)
            .rev()
            .map(|i| {
                let deps: Vec<String> = (1..i).filter(|d| i % d == 0).map(|d| format!("t{}", d)).collect();
                let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                make_task(&format!("t{}", i), &deps)
            })
            .collect();
        let graph = DependencyGraph::build(&tasks, 0).unwrap();
        let order = graph.sequence_ids().unwrap();
        assert_eq!(order.len(), 30);
        assert_respects_dependencies(&tasks, &order);
    }
}
