//! lateq-core
//!
//! Dependency-aware task scheduler served over a line-delimited JSON TCP protocol.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, LeaseToken, TaskSpec, TaskView）
//! - **ports**: 抽象化レイヤー（TaskQueue, Clock, LeaseTokenGenerator）
//! - **queue**: キュー本体（依存グラフ、availability pool、lease、QueueRegistry）
//! - **protocol**: リクエスト/レスポンスの JSON 形式
//! - **app**: アプリケーション層（RequestHandler, Server, ReaperLoop, InstanceLock）
//! - **config**: 環境変数からの設定読み込み
//!
//! # 学習ポイント
//! - 「利用可能なタスク」の順位は取り出す瞬間に計算する（late evaluation）
//! - キューごとに 1 つの `tokio::sync::Mutex` で全状態を守る

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod protocol;
pub mod queue;

pub use config::{Config, ConfigError};
pub use error::SchedulerError;
