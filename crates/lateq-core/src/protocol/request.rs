//! Request parsing.
//!
//! Clients are loose about numbers: `priority`, `task_id` and dependency ids
//! may arrive as JSON numbers or as numeric strings. Both are accepted.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{DEFAULT_PRIORITY, TaskId, TaskSpec};

/// Why a line could not be turned into a `Request`.
///
/// The message text is what the client sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("invalid JSON: {0}")]
    Malformed(String),

    #[error("request must be a JSON object")]
    NotAnObject,

    #[error("no action specified")]
    MissingAction,

    #[error("no queue_name specified")]
    MissingQueueName,

    #[error("Unrecognized action specified: {0}")]
    UnknownAction(String),

    #[error("Missing required parameter [{0}]")]
    MissingParameter(&'static str),

    #[error("Invalid parameter [{name}]: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// An operation on one named queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddTask(TaskSpec),
    GetTask,
    CompleteTask { task_id: TaskId, lock: String },
    RejectTask { task_id: TaskId, lock: String },
    GetInfo,
    RemoveTask { task_id: TaskId },
    RemoveGroup { group: String },
    DropQueue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Queue { queue_name: String, action: Action },
    /// End the session. Needs no queue.
    Close,
}

impl Request {
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| RequestError::Malformed(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(RequestError::NotAnObject);
        };

        let action = match fields.get("action") {
            None | Some(Value::Null) => return Err(RequestError::MissingAction),
            Some(Value::String(action)) => action.as_str(),
            Some(_) => {
                return Err(RequestError::InvalidParameter {
                    name: "action",
                    reason: "expected a string".to_string(),
                });
            }
        };
        if action == "close" {
            return Ok(Request::Close);
        }

        let queue_name = match fields.get("queue_name") {
            None | Some(Value::Null) => return Err(RequestError::MissingQueueName),
            Some(_) => required_string(&fields, "queue_name")?,
        };

        let action = match action {
            "add_task" => Action::AddTask(task_spec(&fields)?),
            "get_task" => Action::GetTask,
            "complete_task" => Action::CompleteTask {
                task_id: required_task_id(&fields)?,
                lock: required_string(&fields, "lock")?,
            },
            "reject_task" => Action::RejectTask {
                task_id: required_task_id(&fields)?,
                lock: required_string(&fields, "lock")?,
            },
            "get_info" => Action::GetInfo,
            "remove_task" => Action::RemoveTask {
                task_id: required_task_id(&fields)?,
            },
            "remove_group" => Action::RemoveGroup {
                group: required_string(&fields, "group")?,
            },
            "drop_queue" => Action::DropQueue,
            other => return Err(RequestError::UnknownAction(other.to_string())),
        };

        Ok(Request::Queue { queue_name, action })
    }
}

fn task_spec(fields: &Map<String, Value>) -> Result<TaskSpec, RequestError> {
    let mut spec = TaskSpec::new(required_string(fields, "task_name")?);

    if let Some(deps) = present(fields, "dependencies") {
        let Value::Array(deps) = deps else {
            return Err(invalid("dependencies", "expected an array of task ids"));
        };
        spec.dependencies = deps
            .iter()
            .map(|dep| integer(dep, "dependencies").map(TaskId::new))
            .collect::<Result<_, _>>()?;
    }

    if let Some(extra_info) = present(fields, "extra_info") {
        spec.extra_info = extra_info.clone();
    }

    spec.priority = match present(fields, "priority") {
        Some(priority) => integer(priority, "priority")?,
        None => DEFAULT_PRIORITY,
    };

    if present(fields, "group").is_some() {
        spec.group = Some(required_string(fields, "group")?);
    }

    Ok(spec)
}

/// Field value, treating an explicit `null` as absent.
fn present<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

fn required_string(
    fields: &Map<String, Value>,
    name: &'static str,
) -> Result<String, RequestError> {
    match present(fields, name) {
        None => Err(RequestError::MissingParameter(name)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(name, "expected a string")),
    }
}

fn required_task_id(fields: &Map<String, Value>) -> Result<TaskId, RequestError> {
    let raw = present(fields, "task_id").ok_or(RequestError::MissingParameter("task_id"))?;
    integer(raw, "task_id").map(TaskId::new)
}

/// A JSON number or a numeric string, converted to `T`.
fn integer<T>(value: &Value, name: &'static str) -> Result<T, RequestError>
where
    T: TryFrom<i64>,
{
    let n = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid(name, "expected an integer"))?;

    T::try_from(n).map_err(|_| invalid(name, "out of range"))
}

fn invalid(name: &'static str, reason: &str) -> RequestError {
    RequestError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}
