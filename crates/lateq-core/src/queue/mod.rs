//! Queue module: task records, dependency graph, availability pool, leases,
//! and the per-name engine that ties them together.

mod dependency;
mod engine;
mod lease;
mod pool;
mod record;
mod registry;

pub use dependency::DependencyIndex;
pub use engine::QueueEngine;
pub use lease::{DEFAULT_MAX_LOCK_TIME, LeaseManager, LeasePolicy};
pub use pool::{AvailabilityPool, Rank, blockage_rating};
pub use record::{Lease, TaskRecord};
pub use registry::QueueRegistry;
