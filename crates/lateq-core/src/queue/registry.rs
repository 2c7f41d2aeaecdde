//! Named queues, created on first use.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::engine::QueueEngine;
use super::lease::LeasePolicy;

/// Maps queue names to engines.
///
/// Queues are independent: ids, graph and leases never cross a queue
/// boundary. A queue lives until it is dropped explicitly.
#[derive(Debug)]
pub struct QueueRegistry {
    queues: RwLock<HashMap<String, Arc<QueueEngine>>>,
    policy: LeasePolicy,
}

impl QueueRegistry {
    pub fn new(policy: LeasePolicy) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &LeasePolicy {
        &self.policy
    }

    /// Queue named `name`, created empty if it does not exist yet.
    ///
    /// Concurrent first requests for the same name get the same engine.
    pub async fn resolve(&self, name: &str) -> Arc<QueueEngine> {
        if let Some(engine) = self.queues.read().await.get(name) {
            return Arc::clone(engine);
        }

        let mut queues = self.queues.write().await;
        let engine = queues.entry(name.to_string()).or_insert_with(|| {
            info!(queue = %name, "queue created");
            Arc::new(QueueEngine::new(name, self.policy.clone()))
        });
        Arc::clone(engine)
    }

    /// Queue named `name`, without creating it.
    pub async fn get(&self, name: &str) -> Option<Arc<QueueEngine>> {
        self.queues.read().await.get(name).cloned()
    }

    /// Forget a queue and all its tasks. Returns whether it existed.
    pub async fn drop_queue(&self, name: &str) -> bool {
        let removed = self.queues.write().await.remove(name).is_some();
        if removed {
            info!(queue = %name, "queue dropped");
        }
        removed
    }

    /// Queue names in sorted order.
    pub async fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.read().await.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Snapshot of every engine, for background sweeps.
    pub async fn engines(&self) -> Vec<Arc<QueueEngine>> {
        self.queues.read().await.values().cloned().collect()
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new(LeasePolicy::default())
    }
}
