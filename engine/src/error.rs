//! Error taxonomy for the planning engine.

use thiserror::Error;

/// Errors surfaced by the scheduling and allocation engine.
///
/// Only structural failures are errors. Partial outcomes such as unresolved
/// conflicts are returned as data.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Circular dependency detected among tasks: {}", tasks.join(", "))]
    CyclicDependency { tasks: Vec<String> },

    #[error("Unknown strategy: {0}")]
    InvalidStrategy(String),

    #[error("No available team members: {0}")]
    CapacityExhausted(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Schedule for project {project_id} changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        project_id: String,
        expected: u64,
        found: u64,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Repository failure: {0}")]
    Repository(String),

    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = EngineError::not_found("project", "p-1");
        assert_eq!(err.to_string(), "project not found: p-1");
    }

    #[test]
    fn test_cycle_lists_tasks() {
        let err = EngineError::CyclicDependency {
            tasks: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected among tasks: a, b"
        );
    }
}
