//! App - アプリケーション層
//!
//! queue と protocol を組み合わせてサーバーを構成します。
//!
//! # 主要コンポーネント
//! - **RequestHandler**: 1 行のリクエストをキュー操作に振り分け
//! - **Server**: TCP accept ループと接続ごとのタスク
//! - **ReaperLoop**: Lease 期限切れの定期回収（任意）
//! - **InstanceLock**: 多重起動防止のロックファイル

pub mod handler;
pub mod instance_lock;
pub mod reaper_loop;
pub mod server;

pub use self::handler::{Flow, RequestHandler};
pub use self::instance_lock::{InstanceLock, InstanceLockError};
pub use self::reaper_loop::ReaperLoop;
pub use self::server::Server;
