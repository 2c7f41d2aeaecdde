//! Domain model (IDs, task specs, task views).

pub mod ids;
pub mod spec;
pub mod task;

pub use ids::{LeaseToken, TaskId};
pub use spec::{DEFAULT_PRIORITY, TaskSpec};
pub use task::TaskView;
