//! A real server on an ephemeral port, driven over TCP.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::watch;

use lateq_core::app::{RequestHandler, Server};
use lateq_core::queue::QueueRegistry;

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let (reader, writer) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn call(&mut self, request: Value) -> Value {
        let mut line = request.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
        let reply = self.lines.next_line().await.unwrap().unwrap();
        serde_json::from_str(&reply).unwrap()
    }
}

async fn start() -> (SocketAddr, watch::Sender<bool>) {
    let handler = Arc::new(RequestHandler::new(Arc::new(QueueRegistry::default())));
    let server = Server::bind("127.0.0.1:0", handler, None).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = watch::channel(false);
    tokio::spawn(server.run(rx));
    (addr, tx)
}

#[tokio::test]
async fn two_workers_share_one_queue() {
    let (addr, _shutdown) = start().await;
    let mut producer = Client::connect(addr).await;
    let mut worker = Client::connect(addr).await;

    let a = producer
        .call(json!({"queue_name": "q", "action": "add_task", "task_name": "A"}))
        .await;
    assert_eq!(a, json!({"result": "success", "cargo": {"task_id": 0}}));
    producer
        .call(json!({
            "queue_name": "q", "action": "add_task", "task_name": "B",
            "dependencies": [0], "extra_info": {"size": 3}, "priority": "2"
        }))
        .await;

    let got = worker.call(json!({"queue_name": "q", "action": "get_task"})).await;
    let task = &got["cargo"]["task"];
    assert_eq!(task["name"], "A");
    let lock = task["lock"].as_str().unwrap().to_string();

    let empty = worker.call(json!({"queue_name": "q", "action": "get_task"})).await;
    assert_eq!(empty["result"], "error");

    let done = worker
        .call(json!({"queue_name": "q", "action": "complete_task", "task_id": 0, "lock": lock}))
        .await;
    assert_eq!(done, json!({"result": "success", "cargo": ""}));

    let next = worker.call(json!({"queue_name": "q", "action": "get_task"})).await;
    assert_eq!(next["cargo"]["task"]["name"], "B");
    assert_eq!(next["cargo"]["task"]["priority"], 2);
    assert_eq!(next["cargo"]["task"]["extra_info"], json!({"size": 3}));

    let info = producer.call(json!({"queue_name": "q", "action": "get_info"})).await;
    assert_eq!(info["cargo"]["counts"]["processing"], 1);
    assert_eq!(info["cargo"]["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn close_is_acknowledged_before_hangup() {
    let (addr, _shutdown) = start().await;
    let mut client = Client::connect(addr).await;

    let missing = client.call(json!({"action": "get_task"})).await;
    assert_eq!(
        missing,
        json!({"result": "error", "message": "no queue_name specified", "cargo": ""})
    );

    let ack = client.call(json!({"action": "close"})).await;
    assert_eq!(ack, json!({"result": "success", "cargo": ""}));
    assert!(client.lines.next_line().await.unwrap().is_none());
}
