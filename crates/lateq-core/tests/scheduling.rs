//! Whole-queue scenarios through the public API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use lateq_core::SchedulerError;
use lateq_core::domain::{TaskId, TaskSpec};
use lateq_core::ports::{FixedClock, TaskQueue};
use lateq_core::queue::{LeasePolicy, QueueRegistry, TaskRecord};

fn registry() -> (QueueRegistry, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ));
    let policy = LeasePolicy::with_clock(Duration::from_secs(9), clock.clone());
    (QueueRegistry::new(policy), clock)
}

fn lock(task: &TaskRecord) -> String {
    task.lease().unwrap().token.as_str().to_string()
}

/// Road works: survey, then two independent jobs, then the opening.
#[tokio::test]
async fn diamond_runs_in_dependency_order() {
    let (registry, _) = registry();
    let queue = registry.resolve("roads").await;

    let survey = queue.add_task(TaskSpec::new("survey")).await;
    let drain = queue
        .add_task(TaskSpec::new("drain").with_dependencies([survey]))
        .await;
    let pave = queue
        .add_task(TaskSpec::new("pave").with_dependencies([survey]).with_priority(7))
        .await;
    let open = queue
        .add_task(TaskSpec::new("open").with_dependencies([drain, pave]))
        .await;

    let mut order = Vec::new();
    while let Ok(task) = queue.get_available_task().await {
        order.push(task.id);
        queue.complete_task(task.id, &lock(&task)).await.unwrap();
    }

    assert_eq!(order, vec![survey, pave, drain, open]);
    assert_eq!(queue.counts().await.tasks, 0);
}

#[tokio::test]
async fn crashed_worker_lease_is_recovered() {
    let (registry, clock) = registry();
    let queue = registry.resolve("jobs").await;

    let a = queue.add_task(TaskSpec::new("A")).await;
    let b = queue
        .add_task(TaskSpec::new("B").with_dependencies([a]))
        .await;

    // worker 1 takes A and disappears
    let lost = queue.get_available_task().await.unwrap();
    clock.advance(Duration::from_secs(30));

    // worker 2 gets A again and finishes it
    let retry = queue.get_available_task().await.unwrap();
    assert_eq!(retry.id, a);
    queue.complete_task(a, &lock(&retry)).await.unwrap();

    // worker 1 comes back too late
    assert_eq!(
        queue.complete_task(a, &lock(&lost)).await.unwrap_err(),
        SchedulerError::UnknownOrNotLeased(a)
    );

    assert_eq!(queue.get_available_task().await.unwrap().id, b);
}

#[tokio::test]
async fn ids_restart_per_queue_and_never_cross() {
    let (registry, _) = registry();
    let left = registry.resolve("left").await;
    let right = registry.resolve("right").await;

    assert_eq!(left.add_task(TaskSpec::new("L")).await, TaskId::new(0));
    assert_eq!(right.add_task(TaskSpec::new("R")).await, TaskId::new(0));

    let task = left.get_available_task().await.unwrap();
    assert_eq!(
        right.complete_task(task.id, &lock(&task)).await.unwrap_err(),
        SchedulerError::UnknownOrNotLeased(task.id)
    );
    assert_eq!(right.info().await.processing_tasks.len(), 0);
}
