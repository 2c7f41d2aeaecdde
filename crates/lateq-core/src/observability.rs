use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{TaskId, TaskView};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Live tasks.
    pub tasks: usize,
    /// Ready and unleased.
    pub available: usize,
    /// Leased.
    pub processing: usize,
    /// Still waiting on at least one dependency.
    pub waiting: usize,
}

/// Consistent snapshot of one queue, taken under the engine lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    /// Every live task, by id.
    pub tasks: Vec<TaskView>,
    /// Available tasks in the order they would be handed out.
    pub available_tasks: Vec<TaskView>,
    /// Leased tasks, by id.
    pub processing_tasks: Vec<TaskView>,
    /// Upstream task -> tasks waiting on it.
    pub dependencies: BTreeMap<TaskId, Vec<TaskId>>,
    pub counts: QueueCounts,
}
