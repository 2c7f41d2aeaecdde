//! RequestHandler - 1 行のリクエストを 1 行のレスポンスに変換する
//!
//! # フロー
//! 1. `Request::parse` で行を解釈（失敗はエラーレスポンス、接続は維持）
//! 2. `QueueRegistry::resolve` でキューを取得（なければ作る）
//! 3. `TaskQueue` の操作を実行し、結果を `Response` に詰める

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::ports::TaskQueue;
use crate::protocol::{Action, Request, Response};
use crate::queue::QueueRegistry;

/// What the connection should do after answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

#[derive(Debug, Clone)]
pub struct RequestHandler {
    registry: Arc<QueueRegistry>,
}

impl RequestHandler {
    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<QueueRegistry> {
        &self.registry
    }

    pub async fn handle_line(&self, line: &str) -> (Response, Flow) {
        match Request::parse(line) {
            Ok(Request::Close) => (Response::ok(), Flow::Close),
            Ok(Request::Queue { queue_name, action }) => {
                (self.dispatch(&queue_name, action).await, Flow::Continue)
            }
            Err(err) => {
                warn!(error = %err, "rejected request");
                (Response::error(err.to_string()), Flow::Continue)
            }
        }
    }

    async fn dispatch(&self, queue_name: &str, action: Action) -> Response {
        match self.execute(queue_name, action).await {
            Ok(response) => response,
            Err(err) => {
                debug!(queue = %queue_name, kind = err.kind(), error = %err, "operation failed");
                Response::error(err.to_string())
            }
        }
    }

    async fn execute(&self, queue_name: &str, action: Action) -> Result<Response, SchedulerError> {
        // every action but drop_queue creates the queue on first use
        let registry = &self.registry;
        let queue = move || registry.resolve(queue_name);

        let response = match action {
            Action::AddTask(spec) => {
                let task_id = queue().await.add_task(spec).await;
                Response::success(json!({ "task_id": task_id }))
            }
            Action::GetTask => {
                let task = queue().await.get_available_task().await?;
                Response::success(json!({ "task": task.view() }))
            }
            Action::CompleteTask { task_id, lock } => {
                queue().await.complete_task(task_id, &lock).await?;
                Response::ok()
            }
            Action::RejectTask { task_id, lock } => {
                queue().await.reject_task(task_id, &lock).await?;
                Response::ok()
            }
            Action::GetInfo => Response::success(queue().await.info().await),
            Action::RemoveTask { task_id } => {
                queue().await.remove_task(task_id).await?;
                Response::ok()
            }
            Action::RemoveGroup { group } => {
                let removed = queue().await.remove_group(&group).await;
                Response::success(json!({ "removed": removed }))
            }
            Action::DropQueue => {
                let dropped = registry.drop_queue(queue_name).await;
                Response::success(json!({ "dropped": dropped }))
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Outcome;
    use serde_json::Value;

    fn handler() -> RequestHandler {
        RequestHandler::new(Arc::new(QueueRegistry::default()))
    }

    async fn send(handler: &RequestHandler, line: &str) -> Response {
        let (response, flow) = handler.handle_line(line).await;
        assert_eq!(flow, Flow::Continue);
        response
    }

    #[tokio::test]
    async fn add_get_complete_round_trip() {
        let h = handler();

        let added = send(&h, r#"{"queue_name":"q","action":"add_task","task_name":"A"}"#).await;
        assert!(added.is_success());
        assert_eq!(added.cargo, json!({"task_id": 0}));

        let got = send(&h, r#"{"queue_name":"q","action":"get_task"}"#).await;
        let task = &got.cargo["task"];
        assert_eq!(task["id"], 0);
        assert_eq!(task["name"], "A");
        assert_eq!(task["priority"], 5);
        let lock = task["lock"].as_str().unwrap().to_string();

        let done = send(
            &h,
            &format!(r#"{{"queue_name":"q","action":"complete_task","task_id":0,"lock":"{lock}"}}"#),
        )
        .await;
        assert_eq!(done, Response::ok());
    }

    #[tokio::test]
    async fn empty_queue_reports_error_and_keeps_going() {
        let h = handler();

        let response = send(&h, r#"{"queue_name":"q","action":"get_task"}"#).await;

        assert_eq!(response.result, Outcome::Error);
        assert_eq!(response.cargo, Value::String(String::new()));
        assert!(response.message.is_some());
    }

    #[tokio::test]
    async fn bad_request_reports_parse_error() {
        let h = handler();

        let response = send(&h, r#"{"queue_name":"q"}"#).await;
        assert_eq!(response, Response::error("no action specified"));
    }

    #[tokio::test]
    async fn close_ends_session() {
        let h = handler();

        let (response, flow) = h.handle_line(r#"{"action":"close"}"#).await;
        assert_eq!(response, Response::ok());
        assert_eq!(flow, Flow::Close);
    }

    #[tokio::test]
    async fn info_reflects_dependencies() {
        let h = handler();
        send(&h, r#"{"queue_name":"q","action":"add_task","task_name":"A"}"#).await;
        send(&h, r#"{"queue_name":"q","action":"add_task","task_name":"B","dependencies":[0]}"#).await;

        let info = send(&h, r#"{"queue_name":"q","action":"get_info"}"#).await.cargo;
        assert_eq!(info["dependencies"], json!({"0": [1]}));
        assert_eq!(info["counts"]["waiting"], 1);
        assert_eq!(info["available_tasks"][0]["name"], "A");
    }

    #[tokio::test]
    async fn group_and_queue_removal() {
        let h = handler();
        send(&h, r#"{"queue_name":"q","action":"add_task","task_name":"A","group":"g"}"#).await;
        send(&h, r#"{"queue_name":"q","action":"add_task","task_name":"B"}"#).await;

        let removed = send(&h, r#"{"queue_name":"q","action":"remove_group","group":"g"}"#).await;
        assert_eq!(removed.cargo, json!({"removed": [0]}));

        let missing = send(&h, r#"{"queue_name":"q","action":"remove_task","task_id":0}"#).await;
        assert_eq!(missing.result, Outcome::Error);

        let dropped = send(&h, r#"{"queue_name":"q","action":"drop_queue"}"#).await;
        assert_eq!(dropped.cargo, json!({"dropped": true}));
        assert!(h.registry().get("q").await.is_none());
    }

    #[tokio::test]
    async fn dropping_unknown_queue_does_not_create_it() {
        let h = handler();

        let dropped = send(&h, r#"{"queue_name":"ghost","action":"drop_queue"}"#).await;
        assert!(dropped.is_success());
        assert_eq!(dropped.cargo, json!({"dropped": false}));
        assert!(h.registry().get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn wrong_lock_is_refused() {
        let h = handler();
        send(&h, r#"{"queue_name":"q","action":"add_task","task_name":"A"}"#).await;
        send(&h, r#"{"queue_name":"q","action":"get_task"}"#).await;

        let response = send(
            &h,
            r#"{"queue_name":"q","action":"reject_task","task_id":"0","lock":"nope"}"#,
        )
        .await;
        assert_eq!(
            response.message.as_deref(),
            Some(SchedulerError::LeaseMismatch(crate::domain::TaskId::new(0)).to_string().as_str())
        );
    }
}
