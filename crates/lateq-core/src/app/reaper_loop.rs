//! ReaperLoop - Lease 期限切れの定期回収
//!
//! `get_available_task` はプールが空のときに自分で回収するので、
//! このループは任意。有効にすると期限切れタスクが `get_info` 上でも
//! 早めに available に戻る。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::queue::QueueRegistry;

/// ReaperLoop は一定間隔で全キューの期限切れ lease を回収する
///
/// # フロー
/// 1. `QueueRegistry::engines()` でキュー一覧をスナップショット
/// 2. 各キューで `reclaim_expired()`（キューごとに個別にロック）
/// 3. shutdown が来たら抜ける
pub struct ReaperLoop {
    registry: Arc<QueueRegistry>,
    interval: Duration,
}

impl ReaperLoop {
    pub fn new(registry: Arc<QueueRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// One sweep over every queue. Returns how many leases were reclaimed.
    pub async fn sweep(&self) -> usize {
        let mut reclaimed = 0;
        for engine in self.registry.engines().await {
            reclaimed += engine.reclaim_expired().await.len();
        }
        if reclaimed > 0 {
            debug!(reclaimed, "reaper sweep");
        }
        reclaimed
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "reaper started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("reaper stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
