//! Task record: content + dependency and lease state.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{LeaseToken, TaskId, TaskSpec, TaskView};
use crate::error::SchedulerError;

/// A lease held on a task by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub token: LeaseToken,
    pub leased_at: DateTime<Utc>,
}

/// One task owned by a queue engine.
///
/// Design:
/// - This is the "single source of truth" for a task.
/// - Pool, processing set and dependency index hold TaskId only.
/// - Lease transitions happen here; the engine decides when.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub extra_info: serde_json::Value,
    pub priority: i32,
    pub group: Option<String>,
    pub created_at: DateTime<Utc>,

    /// Upstream tasks this one is still waiting on.
    remaining_dependencies: HashSet<TaskId>,

    lease: Option<Lease>,
}

impl TaskRecord {
    /// `spec.dependencies` must already be filtered down to live tasks.
    pub fn new(id: TaskId, spec: TaskSpec, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: spec.name,
            extra_info: spec.extra_info,
            priority: spec.priority,
            group: spec.group,
            created_at,
            remaining_dependencies: spec.dependencies.into_iter().collect(),
            lease: None,
        }
    }

    pub fn remaining_dependencies(&self) -> &HashSet<TaskId> {
        &self.remaining_dependencies
    }

    /// All dependencies met.
    pub fn is_ready(&self) -> bool {
        self.remaining_dependencies.is_empty()
    }

    /// Forget `upstream` because it completed. Returns whether it was awaited.
    pub fn remove_dependency(&mut self, upstream: TaskId) -> bool {
        self.remaining_dependencies.remove(&upstream)
    }

    pub fn lease(&self) -> Option<&Lease> {
        self.lease.as_ref()
    }

    pub fn is_leased(&self) -> bool {
        self.lease.is_some()
    }

    /// Mark as being processed.
    pub fn lock(&mut self, token: LeaseToken, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        if self.lease.is_some() {
            return Err(SchedulerError::AlreadyLeased(self.id));
        }
        self.lease = Some(Lease {
            token,
            leased_at: now,
        });
        Ok(())
    }

    /// Release the lease if `presented` matches it. The lease is untouched on mismatch.
    pub fn unlock(&mut self, presented: &str) -> bool {
        match &self.lease {
            Some(lease) if lease.token.matches(presented) => {
                self.lease = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the lease without a token (reclaim / removal).
    pub fn clear_lease(&mut self) -> Option<Lease> {
        self.lease.take()
    }

    /// Has the lease been held for longer than `max`?
    pub fn lease_expired(&self, now: DateTime<Utc>, max: Duration) -> bool {
        let Some(lease) = &self.lease else {
            return false;
        };
        match now.signed_duration_since(lease.leased_at).to_std() {
            Ok(held) => held > max,
            // leased_at is in the future: the clock went backwards
            Err(_) => false,
        }
    }

    pub fn view(&self) -> TaskView {
        TaskView {
            id: self.id,
            name: self.name.clone(),
            creation_time: self.created_at.timestamp(),
            priority: self.priority,
            lock: self.lease.as_ref().map(|l| l.token.clone()),
            group: self.group.clone(),
            extra_info: self.extra_info.clone(),
        }
    }
}
