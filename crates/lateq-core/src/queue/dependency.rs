//! Dependency index for resolving task dependencies.
//!
//! Design:
//! - Forward edges live on each `TaskRecord` (`remaining_dependencies`).
//! - This index holds the reverse edges: upstream -> tasks waiting on it.
//! - Invariant: an entry exists only while it has at least one waiting task.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::TaskId;

/// Reverse adjacency of the dependency graph.
///
/// Enables O(1) lookup of "who is waiting for this task?" when it completes,
/// and feeds the blockage rating at selection time.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    waiting: HashMap<TaskId, HashSet<TaskId>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self {
            waiting: HashMap::new(),
        }
    }

    /// Record that `dependent` waits for `upstream`.
    ///
    /// Example: link(task_b, task_a) means "B waits for A"
    pub fn link(&mut self, dependent: TaskId, upstream: TaskId) {
        self.waiting.entry(upstream).or_default().insert(dependent);
    }

    /// Forget that `dependent` waits for `upstream`, dropping the entry once empty.
    pub fn unlink(&mut self, dependent: TaskId, upstream: TaskId) {
        match self.waiting.entry(upstream) {
            Entry::Occupied(mut e) => {
                e.get_mut().remove(&dependent);
                if e.get().is_empty() {
                    e.remove_entry();
                }
            }
            Entry::Vacant(_) => {}
        }
    }

    /// Tasks waiting for `upstream`.
    pub fn dependents(&self, upstream: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.waiting
            .get(&upstream)
            .into_iter()
            .flat_map(|waiting| waiting.iter().copied())
    }

    /// Remove the entry for `upstream` and return the tasks that were waiting on it.
    ///
    /// Note: this returns ALL waiting tasks, even those with other dependencies.
    /// The caller decides which of them became ready.
    pub fn take(&mut self, upstream: TaskId) -> Vec<TaskId> {
        self.waiting
            .remove(&upstream)
            .map(|waiting| waiting.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, upstream: TaskId) -> bool {
        self.waiting.contains_key(&upstream)
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Ordered copy for status output.
    pub fn snapshot(&self) -> BTreeMap<TaskId, Vec<TaskId>> {
        self.waiting
            .iter()
            .map(|(upstream, waiting)| {
                let mut waiting: Vec<TaskId> = waiting.iter().copied().collect();
                waiting.sort_unstable();
                (*upstream, waiting)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_index_is_empty() {
        let index = DependencyIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.dependents(TaskId::new(1)).count(), 0);
    }

    #[test]
    fn link_creates_reverse_edge() {
        let mut index = DependencyIndex::new();
        let task_a = TaskId::new(1);
        let task_b = TaskId::new(2);

        index.link(task_b, task_a); // B depends on A

        assert!(index.contains(task_a));
        assert!(!index.contains(task_b));
        assert_eq!(index.dependents(task_a).collect::<Vec<_>>(), vec![task_b]);
    }

    #[test]
    fn unlink_drops_empty_entry() {
        let mut index = DependencyIndex::new();
        let task_a = TaskId::new(1);
        let task_b = TaskId::new(2);
        let task_c = TaskId::new(3);

        index.link(task_b, task_a);
        index.link(task_c, task_a);

        index.unlink(task_b, task_a);
        assert!(index.contains(task_a));

        index.unlink(task_c, task_a);
        assert!(!index.contains(task_a));

        // unlinking something never linked is a no-op
        index.unlink(task_c, task_a);
        assert!(index.is_empty());
    }

    #[test]
    fn take_returns_all_waiting_and_removes_entry() {
        let mut index = DependencyIndex::new();
        let a = TaskId::new(1);
        let b = TaskId::new(2);
        let c = TaskId::new(3);

        // B and C both wait for A
        index.link(b, a);
        index.link(c, a);

        let mut waiting = index.take(a);
        waiting.sort();
        assert_eq!(waiting, vec![b, c]);
        assert!(!index.contains(a));
        assert!(index.take(a).is_empty());
    }

    #[test]
    fn snapshot_is_sorted() {
        let mut index = DependencyIndex::new();
        let a = TaskId::new(1);
        let d = TaskId::new(4);

        // Diamond-ish: 2 and 3 wait for 1, 3 waits for 4 too
        index.link(TaskId::new(3), a);
        index.link(TaskId::new(2), a);
        index.link(TaskId::new(3), d);

        let snapshot = index.snapshot();
        assert_eq!(
            snapshot.get(&a),
            Some(&vec![TaskId::new(2), TaskId::new(3)])
        );
        assert_eq!(snapshot.get(&d), Some(&vec![TaskId::new(3)]));
        assert_eq!(snapshot.keys().copied().collect::<Vec<_>>(), vec![a, d]);
    }
}
