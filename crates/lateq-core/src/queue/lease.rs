//! Lease (lock) management: issue, validate, expire.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::record::{Lease, TaskRecord};
use crate::domain::{LeaseToken, TaskId};
use crate::error::SchedulerError;
use crate::ports::{Clock, LeaseTokenGenerator, SystemClock, UlidTokenGenerator};

/// How long a lease may be held before it can be reclaimed.
pub const DEFAULT_MAX_LOCK_TIME: Duration = Duration::from_secs(9);

/// Lease settings shared by every queue of a registry.
#[derive(Clone)]
pub struct LeasePolicy {
    pub max_lock_time: Duration,
    pub clock: Arc<dyn Clock>,
    pub tokens: Arc<dyn LeaseTokenGenerator>,
}

impl LeasePolicy {
    pub fn new(
        max_lock_time: Duration,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn LeaseTokenGenerator>,
    ) -> Self {
        Self {
            max_lock_time,
            clock,
            tokens,
        }
    }

    /// Wall clock + ULID tokens.
    pub fn system(max_lock_time: Duration) -> Self {
        Self::with_clock(max_lock_time, Arc::new(SystemClock))
    }

    /// ULID tokens stamped from `clock`.
    pub fn with_clock(max_lock_time: Duration, clock: Arc<dyn Clock>) -> Self {
        let tokens = Arc::new(UlidTokenGenerator::new(Arc::clone(&clock)));
        Self::new(max_lock_time, clock, tokens)
    }
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self::system(DEFAULT_MAX_LOCK_TIME)
    }
}

impl fmt::Debug for LeasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeasePolicy")
            .field("max_lock_time", &self.max_lock_time)
            .finish_non_exhaustive()
    }
}

/// Tracks which tasks are out for work.
///
/// The lease itself lives on the `TaskRecord`; this keeps the processing set
/// in step with it. Invariant: id in `processing` <=> record carries a lease.
#[derive(Debug)]
pub struct LeaseManager {
    policy: LeasePolicy,
    processing: BTreeSet<TaskId>,
}

impl LeaseManager {
    pub fn new(policy: LeasePolicy) -> Self {
        Self {
            policy,
            processing: BTreeSet::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.policy.clock.now()
    }

    /// Lease `record` with a fresh token.
    pub fn lease(&mut self, record: &mut TaskRecord) -> Result<LeaseToken, SchedulerError> {
        let token = self.policy.tokens.generate();
        record.lock(token.clone(), self.now())?;
        self.processing.insert(record.id);
        Ok(token)
    }

    /// Give back a lease held under `presented`.
    pub fn release(
        &mut self,
        record: &mut TaskRecord,
        presented: &str,
    ) -> Result<(), SchedulerError> {
        if !self.processing.contains(&record.id) {
            return Err(SchedulerError::UnknownOrNotLeased(record.id));
        }
        if !record.unlock(presented) {
            return Err(SchedulerError::LeaseMismatch(record.id));
        }
        self.processing.remove(&record.id);
        Ok(())
    }

    /// Drop a lease without its token (reclaim).
    pub fn force_release(&mut self, record: &mut TaskRecord) -> Option<Lease> {
        self.processing.remove(&record.id);
        record.clear_lease()
    }

    /// Stop tracking a task that is being deleted.
    pub fn forget(&mut self, id: TaskId) -> bool {
        self.processing.remove(&id)
    }

    pub fn is_processing(&self, id: TaskId) -> bool {
        self.processing.contains(&id)
    }

    /// Processing ids in ascending order.
    pub fn processing(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.processing.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.processing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Processing tasks whose lease is older than the max lock time.
    pub fn expired(&self, tasks: &HashMap<TaskId, TaskRecord>) -> Vec<TaskId> {
        let now = self.now();
        let max = self.policy.max_lock_time;
        self.processing
            .iter()
            .copied()
            .filter(|id| tasks.get(id).is_some_and(|r| r.lease_expired(now, max)))
            .collect()
    }
}
