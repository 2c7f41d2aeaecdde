//! TaskQueue port - 名前付きキュー 1 つ分の操作
//!
//! リクエストハンドラはこの trait だけを見る。
//! 実装は `queue::QueueEngine`（in-memory）。

use async_trait::async_trait;

use crate::domain::{TaskId, TaskSpec};
use crate::error::SchedulerError;
use crate::observability::QueueInfo;
use crate::queue::TaskRecord;

/// Operations on one named queue.
///
/// Every call is atomic with respect to every other call on the same queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    fn name(&self) -> &str;

    /// Add a task. Dependencies that are not live tasks are dropped.
    async fn add_task(&self, spec: TaskSpec) -> TaskId;

    /// Lease the best available task, reclaiming expired leases if none is ready.
    async fn get_available_task(&self) -> Result<TaskRecord, SchedulerError>;

    /// Finish a leased task and unblock the tasks waiting on it.
    async fn complete_task(&self, id: TaskId, lock: &str) -> Result<(), SchedulerError>;

    /// Hand a leased task back to the pool.
    async fn reject_task(&self, id: TaskId, lock: &str) -> Result<(), SchedulerError>;

    /// Delete a task. Tasks depending on it are not removed.
    async fn remove_task(&self, id: TaskId) -> Result<(), SchedulerError>;

    /// Delete every task in `group`. Returns the removed ids.
    async fn remove_group(&self, group: &str) -> Vec<TaskId>;

    async fn info(&self) -> QueueInfo;
}
