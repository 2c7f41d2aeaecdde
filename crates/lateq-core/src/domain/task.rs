use serde::{Deserialize, Serialize};

use super::{LeaseToken, TaskId};

/// External (wire) form of a task.
///
/// `lock` and `group` are omitted entirely when absent, so clients can test
/// for the key rather than for null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub name: String,
    /// Unix seconds.
    pub creation_time: i64,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LeaseToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub extra_info: serde_json::Value,
}
