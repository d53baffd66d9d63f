//! Dense integer ids for task id strings.
//!
//! Graph passes index plain vectors by these ids instead of hashing strings
//! on every edge visit. Ids are assigned in first-seen order, which keeps
//! every pass that walks `0..len()` in input order.

use rustc_hash::FxHashMap;

pub type TaskIdx = usize;

#[derive(Debug, Clone, Default)]
pub struct TaskIndex {
    to_idx: FxHashMap<String, TaskIdx>,
    from_idx: Vec<String>,
}

impl TaskIndex {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_idx: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_idx: Vec::with_capacity(capacity),
        }
    }

    /// Insert a new id. Returns `None` if the id was already present.
    pub fn insert(&mut self, id: &str) -> Option<TaskIdx> {
        if self.to_idx.contains_key(id) {
            return None;
        }
        let idx = self.from_idx.len();
        self.from_idx.push(id.to_string());
        self.to_idx.insert(id.to_string(), idx);
        Some(idx)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<TaskIdx> {
        self.to_idx.get(id).copied()
    }

    /// Panics if `idx` was not issued by this index.
    #[inline]
    pub fn resolve(&self, idx: TaskIdx) -> &str {
        &self.from_idx[idx]
    }

    pub fn len(&self) -> usize {
        self.from_idx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_idx.is_empty()
    }
}
