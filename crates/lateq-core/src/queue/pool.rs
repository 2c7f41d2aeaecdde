//! Availability pool with late-evaluated ordering.
//!
//! A task's rank depends on the blockage rating, which is derived from the
//! *current* dependency graph of other tasks and changes every time any task
//! completes. A heap keyed on it would hold stale keys, so the pool stores ids
//! unordered and ranks them only when a task is actually taken: O(1) insert,
//! O(n) poll.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::domain::TaskId;

/// Selection order of an available task. Smaller is selected first.
///
/// 1. higher priority
/// 2. higher blockage rating
/// 3. older creation time
/// 4. lower id
#[derive(Debug, Clone, Copy)]
pub struct Rank {
    pub priority: i32,
    pub blockage: f64,
    pub created_at: DateTime<Utc>,
    pub id: TaskId,
}

impl PartialEq for Rank {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rank {}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering on priority and blockage: higher values come first
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.blockage.total_cmp(&self.blockage))
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// How much completing a task helps the tasks waiting on it.
///
/// Takes the remaining-dependency count of every waiting task. Each one
/// contributes `1 / (1 + remaining)`: a dependent one step from ready counts
/// for more than one still waiting on many others.
pub fn blockage_rating(dependent_remaining: impl IntoIterator<Item = usize>) -> f64 {
    let mut counts: Vec<usize> = dependent_remaining.into_iter().collect();
    // fixed summation order so equal inputs give bit-identical ratings
    counts.sort_unstable();
    counts.iter().map(|&n| 1.0 / (1.0 + n as f64)).sum()
}

/// Ready, unleased tasks.
#[derive(Debug, Default)]
pub struct AvailabilityPool {
    ids: Vec<TaskId>,
}

impl AvailabilityPool {
    pub fn new() -> Self {
        Self { ids: Vec::new() }
    }

    pub fn push(&mut self, id: TaskId) {
        self.ids.push(id);
    }

    /// Remove by id. Returns whether it was present.
    pub fn remove(&mut self, id: TaskId) -> bool {
        match self.ids.iter().position(|&candidate| candidate == id) {
            Some(index) => {
                self.ids.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.ids.iter().copied()
    }

    /// Take the best task under `rank`, evaluated now for every candidate.
    pub fn poll(&mut self, mut rank: impl FnMut(TaskId) -> Rank) -> Option<TaskId> {
        let (index, _) = self
            .ids
            .iter()
            .enumerate()
            .map(|(index, &id)| (index, rank(id)))
            .min_by(|(_, a), (_, b)| a.cmp(b))?;
        Some(self.ids.swap_remove(index))
    }

    /// All ids in the order `poll` would hand them out right now.
    pub fn ranked(&self, mut rank: impl FnMut(TaskId) -> Rank) -> Vec<TaskId> {
        let mut ranked: Vec<Rank> = self.ids.iter().map(|&id| rank(id)).collect();
        ranked.sort_unstable();
        ranked.into_iter().map(|r| r.id).collect()
    }
}
