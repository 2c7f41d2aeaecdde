//! Input spec for a task submission.
//!
//! `extra_info` is kept as `serde_json::Value`: the scheduler carries it for the
//! executor and never looks inside.

use serde::{Deserialize, Serialize};

use super::ids::TaskId;

/// Priority given to tasks that do not ask for one.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Everything a client supplies when adding a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Human-readable name, e.g. "Smoothen roads".
    pub name: String,

    /// Tasks that must complete first. Ids that are no longer live at
    /// submission time are dropped by the queue.
    #[serde(default)]
    pub dependencies: Vec<TaskId>,

    /// Context for the executor.
    #[serde(default)]
    pub extra_info: serde_json::Value,

    /// Higher runs first.
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Optional tag used for bulk removal.
    #[serde(default)]
    pub group: Option<String>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl TaskSpec {
    /// Convenience constructor for a task with no dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            extra_info: serde_json::Value::Null,
            priority: DEFAULT_PRIORITY,
            group: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_extra_info(mut self, extra_info: serde_json::Value) -> Self {
        self.extra_info = extra_info;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_spec_uses_default_priority() {
        let spec = TaskSpec::new("hello");
        assert_eq!(spec.priority, DEFAULT_PRIORITY);
        assert!(spec.dependencies.is_empty());
        assert!(spec.group.is_none());
        assert!(spec.extra_info.is_null());
    }

    #[test]
    fn spec_without_optional_fields_then_get_defaults() {
        let json = r#"{ "name": "hello" }"#;
        let spec: TaskSpec = serde_json::from_str(json).expect("deserialize");
        assert_eq!(spec.priority, DEFAULT_PRIORITY);
        assert!(spec.dependencies.is_empty());
    }

    #[test]
    fn builder_methods_fill_fields() {
        let spec = TaskSpec::new("build")
            .with_dependencies([TaskId::new(1), TaskId::new(2)])
            .with_priority(8)
            .with_group("nightly")
            .with_extra_info(serde_json::json!({ "target": "x86_64" }));

        assert_eq!(spec.dependencies, vec![TaskId::new(1), TaskId::new(2)]);
        assert_eq!(spec.priority, 8);
        assert_eq!(spec.group.as_deref(), Some("nightly"));
        assert_eq!(spec.extra_info["target"], "x86_64");
    }
}
