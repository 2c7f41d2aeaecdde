//! Queue engine: one named queue, all state behind one lock.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::dependency::DependencyIndex;
use super::lease::{LeaseManager, LeasePolicy};
use super::pool::{AvailabilityPool, Rank, blockage_rating};
use super::record::TaskRecord;
use crate::domain::{TaskId, TaskSpec};
use crate::error::SchedulerError;
use crate::observability::{QueueCounts, QueueInfo};
use crate::ports::TaskQueue;

/// Engine state.
///
/// The four structures are mutually dependent (a task must never be seen in
/// the processing set and the pool at once), so they share one lock.
#[derive(Debug)]
struct EngineState {
    /// All live task records (single source of truth).
    tasks: HashMap<TaskId, TaskRecord>,

    /// Upstream -> waiting tasks.
    dependencies: DependencyIndex,

    /// Ready, unleased tasks (TaskIds only).
    available: AvailabilityPool,

    /// Leased tasks.
    leases: LeaseManager,

    /// Next task ID to assign.
    next_task_id: TaskId,
}

impl EngineState {
    fn new(policy: LeasePolicy) -> Self {
        Self {
            tasks: HashMap::new(),
            dependencies: DependencyIndex::new(),
            available: AvailabilityPool::new(),
            leases: LeaseManager::new(policy),
            next_task_id: TaskId::new(0),
        }
    }

    /// Allocate a new TaskId.
    fn allocate_task_id(&mut self) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id = id.next();
        id
    }

    fn add_task(&mut self, mut spec: TaskSpec) -> TaskId {
        // The submitter does not have to know what already completed.
        let live: BTreeSet<TaskId> = spec
            .dependencies
            .iter()
            .copied()
            .filter(|dep| self.tasks.contains_key(dep))
            .collect();
        spec.dependencies = live.iter().copied().collect();

        let id = self.allocate_task_id();
        let record = TaskRecord::new(id, spec, self.leases.now());
        if record.is_ready() {
            self.available.push(id);
        } else {
            for upstream in live {
                self.dependencies.link(id, upstream);
            }
        }
        self.tasks.insert(id, record);
        id
    }

    /// Pop the best available task, ranked now.
    fn take_next(&mut self) -> Option<TaskId> {
        let tasks = &self.tasks;
        let dependencies = &self.dependencies;
        self.available.poll(|id| rank_of(tasks, dependencies, id))
    }

    fn lease_next(&mut self) -> Result<TaskRecord, SchedulerError> {
        // Each reclaim round refills the pool, so this settles after at most
        // one reclaim that found something.
        loop {
            if let Some(id) = self.take_next() {
                let Some(record) = self.tasks.get_mut(&id) else {
                    continue;
                };
                self.leases.lease(record)?;
                return Ok(record.clone());
            }

            if self.reclaim_expired().is_empty() {
                return Err(SchedulerError::NoAvailableTask);
            }
        }
    }

    /// Move every task whose lease outlived the max lock time back to the pool.
    fn reclaim_expired(&mut self) -> Vec<TaskId> {
        let expired = self.leases.expired(&self.tasks);
        for &id in &expired {
            if let Some(record) = self.tasks.get_mut(&id) {
                self.leases.force_release(record);
                self.available.push(id);
            }
        }
        expired
    }

    /// Returns the tasks that became ready.
    fn complete(&mut self, id: TaskId, lock: &str) -> Result<Vec<TaskId>, SchedulerError> {
        let record = self
            .tasks
            .get_mut(&id)
            .ok_or(SchedulerError::UnknownOrNotLeased(id))?;
        self.leases.release(record, lock)?;

        // Promote dependents before the record goes away.
        let mut promoted = Vec::new();
        for dependent in self.dependencies.take(id) {
            if let Some(waiting) = self.tasks.get_mut(&dependent) {
                waiting.remove_dependency(id);
                if waiting.is_ready() && !waiting.is_leased() {
                    self.available.push(dependent);
                    promoted.push(dependent);
                }
            }
        }
        self.tasks.remove(&id);

        promoted.sort_unstable();
        Ok(promoted)
    }

    fn reject(&mut self, id: TaskId, lock: &str) -> Result<(), SchedulerError> {
        let record = self
            .tasks
            .get_mut(&id)
            .ok_or(SchedulerError::UnknownOrNotLeased(id))?;
        self.leases.release(record, lock)?;
        self.available.push(id);
        Ok(())
    }

    /// Delete one task. Tasks waiting on it keep the dangling id.
    fn remove(&mut self, id: TaskId) -> Result<TaskRecord, SchedulerError> {
        let mut record = self.tasks.remove(&id).ok_or(SchedulerError::NotFound(id))?;

        if self.leases.forget(id) {
            record.clear_lease();
        }
        self.available.remove(id);
        self.dependencies.take(id);
        for &upstream in record.remaining_dependencies() {
            self.dependencies.unlink(id, upstream);
        }
        Ok(record)
    }

    fn remove_group(&mut self, group: &str) -> Vec<TaskId> {
        let mut members: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|r| r.group.as_deref() == Some(group))
            .map(|r| r.id)
            .collect();
        members.sort_unstable();

        members
            .into_iter()
            .filter_map(|id| self.remove(id).ok().map(|r| r.id))
            .collect()
    }

    fn counts(&self) -> QueueCounts {
        QueueCounts {
            tasks: self.tasks.len(),
            available: self.available.len(),
            processing: self.leases.len(),
            waiting: self.tasks.values().filter(|r| !r.is_ready()).count(),
        }
    }

    fn info(&self) -> QueueInfo {
        let mut ids: Vec<&TaskId> = self.tasks.keys().collect();
        ids.sort_unstable();

        let tasks = &self.tasks;
        let dependencies = &self.dependencies;
        let view = |id: TaskId| tasks.get(&id).map(TaskRecord::view);

        QueueInfo {
            tasks: ids.into_iter().filter_map(|&id| view(id)).collect(),
            available_tasks: self
                .available
                .ranked(|id| rank_of(tasks, dependencies, id))
                .into_iter()
                .filter_map(view)
                .collect(),
            processing_tasks: self.leases.processing().filter_map(view).collect(),
            dependencies: self.dependencies.snapshot(),
            counts: self.counts(),
        }
    }
}

/// Rank of `id` against the current graph.
fn rank_of(
    tasks: &HashMap<TaskId, TaskRecord>,
    dependencies: &DependencyIndex,
    id: TaskId,
) -> Rank {
    let blockage = blockage_rating(
        dependencies
            .dependents(id)
            .filter_map(|dependent| tasks.get(&dependent))
            .map(|dependent| dependent.remaining_dependencies().len()),
    );
    match tasks.get(&id) {
        Some(record) => Rank {
            priority: record.priority,
            blockage,
            created_at: record.created_at,
            id,
        },
        // stale pool entry: rank it last, lease_next skips it
        None => Rank {
            priority: i32::MIN,
            blockage: f64::NEG_INFINITY,
            created_at: Default::default(),
            id,
        },
    }
}

/// In-memory implementation of one named queue.
#[derive(Debug)]
pub struct QueueEngine {
    name: String,
    state: Mutex<EngineState>,
}

impl QueueEngine {
    pub fn new(name: impl Into<String>, policy: LeasePolicy) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(EngineState::new(policy)),
        }
    }

    /// Return every expired lease to the pool. Returns the reclaimed ids.
    pub async fn reclaim_expired(&self) -> Vec<TaskId> {
        let mut state = self.state.lock().await;
        let reclaimed = state.reclaim_expired();
        if !reclaimed.is_empty() {
            warn!(queue = %self.name, ?reclaimed, "reclaimed expired leases");
        }
        reclaimed
    }

    pub async fn counts(&self) -> QueueCounts {
        let state = self.state.lock().await;
        state.counts()
    }
}

#[async_trait]
impl TaskQueue for QueueEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_task(&self, spec: TaskSpec) -> TaskId {
        let mut state = self.state.lock().await;
        let name = spec.name.clone();
        let id = state.add_task(spec);
        debug!(queue = %self.name, task_id = %id, %name, "task added");
        id
    }

    async fn get_available_task(&self) -> Result<TaskRecord, SchedulerError> {
        let mut state = self.state.lock().await;
        match state.lease_next() {
            Ok(record) => {
                debug!(queue = %self.name, task_id = %record.id, "task leased");
                Ok(record)
            }
            Err(err @ SchedulerError::AlreadyLeased(_)) => {
                error!(queue = %self.name, error = %err, "lease invariant violated");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn complete_task(&self, id: TaskId, lock: &str) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        let promoted = state.complete(id, lock)?;
        debug!(queue = %self.name, task_id = %id, ?promoted, "task completed");
        Ok(())
    }

    async fn reject_task(&self, id: TaskId, lock: &str) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        state.reject(id, lock)?;
        debug!(queue = %self.name, task_id = %id, "task rejected");
        Ok(())
    }

    async fn remove_task(&self, id: TaskId) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        state.remove(id)?;
        debug!(queue = %self.name, task_id = %id, "task removed");
        Ok(())
    }

    async fn remove_group(&self, group: &str) -> Vec<TaskId> {
        let mut state = self.state.lock().await;
        let removed = state.remove_group(group);
        debug!(queue = %self.name, %group, ?removed, "group removed");
        removed
    }

    async fn info(&self) -> QueueInfo {
        let state = self.state.lock().await;
        state.info()
    }
}
