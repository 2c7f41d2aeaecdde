//! Ports - 抽象化レイヤー
//!
//! 外部から差し替えたいもの（時刻、トークン生成）と、
//! ハンドラから見たキュー操作をここで trait として定義します。

pub mod clock;
pub mod task_queue;
pub mod token_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::task_queue::TaskQueue;
pub use self::token_generator::{LeaseTokenGenerator, UlidTokenGenerator};
