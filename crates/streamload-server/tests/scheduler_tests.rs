//! Scheduler admission, concurrency and abort behaviour

mod common;

use common::{wait_for_status, wait_until, FieldsAdapter, Harness, Script};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use streamload_common::Status;
use streamload_server::ingest::framework::{
    Scheduler, SchedulerConfig, SchedulerError, StatusStore,
};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use uuid::Uuid;

const CSV: &str = "name,value\nfoo,1\nbar,2\n";

fn url(name: &str) -> String {
    format!("http://fixtures.test/{name}.csv")
}

fn start(
    harness: &Harness,
    max_workers: usize,
    delete_on_abort: bool,
    batch_size: usize,
) -> (Scheduler<FieldsAdapter>, JoinHandle<()>) {
    let config = SchedulerConfig {
        max_workers,
        tick_interval: Duration::from_millis(5),
        delete_on_abort,
    };
    Scheduler::start(config, harness.pipeline(batch_size))
}

/// Register a job that streams `CSV` and then blocks until released
fn held_job(harness: &Harness, name: &str) -> (String, Arc<Notify>) {
    let release = Arc::new(Notify::new());
    let url = url(name);
    harness
        .source
        .add(&url, Script::whole(CSV).held(release.clone()));
    (url, release)
}

fn quick_job(harness: &Harness, name: &str) -> String {
    let url = url(name);
    harness.source.add(&url, Script::whole(CSV));
    url
}

async fn in_flight(scheduler: &Scheduler<FieldsAdapter>) -> Vec<Uuid> {
    scheduler.snapshot().await.unwrap().in_flight
}

#[tokio::test]
async fn test_positions_reflect_queue_length() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 0, false, 100);

    let mut ids = Vec::new();
    for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
        let job = scheduler.enqueue(url(name)).await.unwrap();
        assert_eq!(job.position, i + 1);
        assert_eq!(job.url, url(name));
        ids.push(job.id);
    }

    assert_eq!(scheduler.snapshot().await.unwrap().pending, ids);

    let pending = scheduler.status(ids[1]).await.unwrap().unwrap();
    assert_eq!(pending.status, Status::Pending);
    assert_eq!(pending.url, Some(url("b")));
}

#[tokio::test]
async fn test_never_exceeds_worker_limit() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 2, false, 100);

    let mut jobs = Vec::new();
    for i in 0..5 {
        let (url, release) = held_job(&harness, &format!("held-{i}"));
        let job = scheduler.enqueue(url).await.unwrap();
        jobs.push((job.id, release));
    }

    // Let plenty of ticks pass while every admitted job is held
    for _ in 0..30 {
        let running = in_flight(&scheduler).await;
        assert!(running.len() <= 2, "{} jobs in flight", running.len());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(in_flight(&scheduler).await.len(), 2);

    for (_, release) in &jobs {
        release.notify_one();
    }

    for (id, _) in &jobs {
        assert!(wait_for_status(&harness.statuses, *id, Status::Finished).await);
        assert!(in_flight(&scheduler).await.len() <= 2);
    }
}

#[tokio::test]
async fn test_admits_jobs_in_fifo_order() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, false, 100);

    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        ids.push(scheduler.enqueue(quick_job(&harness, name)).await.unwrap().id);
    }

    for id in &ids {
        assert!(wait_for_status(&harness.statuses, *id, Status::Finished).await);
    }

    let history = harness.statuses.history();
    let started_at: Vec<usize> = ids
        .iter()
        .map(|id| {
            history
                .iter()
                .position(|s| s.id == *id && s.status == Status::InProgress)
                .unwrap()
        })
        .collect();
    assert!(started_at.windows(2).all(|w| w[0] < w[1]), "{started_at:?}");
}

#[tokio::test]
async fn test_queued_job_waits_for_a_free_slot() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, false, 100);

    let (held_url, release) = held_job(&harness, "b");
    let b = scheduler.enqueue(held_url).await.unwrap();
    assert!(wait_for_status(&harness.statuses, b.id, Status::InProgress).await);

    let a = scheduler.enqueue(quick_job(&harness, "a")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        scheduler.status(a.id).await.unwrap().unwrap().status,
        Status::Pending
    );

    release.notify_one();

    assert!(wait_for_status(&harness.statuses, a.id, Status::Finished).await);
    assert_eq!(
        harness.statuses.statuses_for(a.id),
        vec![Status::Pending, Status::InProgress, Status::Finished]
    );
}

#[tokio::test]
async fn test_abort_running_job_purges_records() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, true, 1);

    let (held_url, _release) = held_job(&harness, "abort-me");
    let job = scheduler.enqueue(held_url.clone()).await.unwrap();
    assert!(
        wait_until(|| harness
            .statuses
            .history_for(job.id)
            .iter()
            .any(|s| s.records == Some(2)))
        .await
    );

    let status = scheduler.abort(job.id).await.unwrap().unwrap();
    assert_eq!(status.status, Status::Aborted);
    assert_eq!(status.url, Some(held_url));
    assert_eq!(status.records, Some(2));

    assert_eq!(harness.data.deletes(), vec![job.id]);
    assert!(harness.data.records(job.id).await.is_empty());
    assert!(in_flight(&scheduler).await.is_empty());

    // No write from the cancelled execution lands afterwards
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(
        harness.statuses.statuses_for(job.id).last(),
        Some(&Status::Aborted)
    );

    // The freed slot is reused
    let next = scheduler.enqueue(quick_job(&harness, "next")).await.unwrap();
    assert!(wait_for_status(&harness.statuses, next.id, Status::Finished).await);
}

#[tokio::test]
async fn test_abort_completes_when_caller_goes_away() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, true, 1);

    let (held_url, _release) = held_job(&harness, "dropped-caller");
    let job = scheduler.enqueue(held_url).await.unwrap();
    assert!(
        wait_until(|| harness
            .statuses
            .history_for(job.id)
            .iter()
            .any(|s| s.records == Some(2)))
        .await
    );

    // Polled once, then dropped, like a cancelled request handler
    assert!(scheduler.abort(job.id).now_or_never().is_none());

    assert!(wait_for_status(&harness.statuses, job.id, Status::Aborted).await);
    assert!(wait_until(|| harness.data.deletes() == vec![job.id]).await);
    assert!(harness.data.records(job.id).await.is_empty());
    assert!(in_flight(&scheduler).await.is_empty());

    let status = scheduler.status(job.id).await.unwrap().unwrap();
    assert_eq!(status.status, Status::Aborted);
}

#[tokio::test]
async fn test_abort_without_purge_keeps_records() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, false, 1);

    let (held_url, _release) = held_job(&harness, "keep");
    let job = scheduler.enqueue(held_url).await.unwrap();
    assert!(
        wait_until(|| harness
            .statuses
            .history_for(job.id)
            .iter()
            .any(|s| s.records == Some(2)))
        .await
    );

    let status = scheduler.abort(job.id).await.unwrap().unwrap();
    assert_eq!(status.status, Status::Aborted);
    assert!(harness.data.deletes().is_empty());
    assert_eq!(harness.data.records(job.id).await.len(), 2);
}

#[tokio::test]
async fn test_abort_unknown_job() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, true, 100);

    assert!(scheduler.abort(Uuid::new_v4()).await.unwrap().is_none());
    assert!(harness.statuses.history().is_empty());
    assert!(harness.data.deletes().is_empty());
}

#[tokio::test]
async fn test_abort_queued_job_leaves_it_queued() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, true, 100);

    let (held_url, _release) = held_job(&harness, "running");
    let running = scheduler.enqueue(held_url).await.unwrap();
    assert!(wait_for_status(&harness.statuses, running.id, Status::InProgress).await);

    let queued = scheduler.enqueue(quick_job(&harness, "queued")).await.unwrap();
    let status = scheduler.abort(queued.id).await.unwrap().unwrap();

    assert_eq!(status.status, Status::Pending);
    assert_eq!(scheduler.snapshot().await.unwrap().pending, vec![queued.id]);
    assert_eq!(harness.statuses.statuses_for(queued.id), vec![Status::Pending]);
    assert!(harness.data.deletes().is_empty());
}

#[tokio::test]
async fn test_abort_finished_job_is_a_no_op() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, true, 100);

    let job = scheduler.enqueue(quick_job(&harness, "done")).await.unwrap();
    assert!(wait_for_status(&harness.statuses, job.id, Status::Finished).await);

    let status = scheduler.abort(job.id).await.unwrap().unwrap();
    assert_eq!(status.status, Status::Finished);
    assert!(harness.data.deletes().is_empty());
}

#[tokio::test]
async fn test_failed_job_frees_its_slot() {
    let harness = Harness::new();
    let (scheduler, _task) = start(&harness, 1, false, 100);

    let broken = url("broken");
    harness.source.add(&broken, Script::request_error("Network Error"));
    let failed = scheduler.enqueue(broken).await.unwrap();
    let next = scheduler.enqueue(quick_job(&harness, "after")).await.unwrap();

    assert!(wait_for_status(&harness.statuses, failed.id, Status::Error).await);
    assert!(wait_for_status(&harness.statuses, next.id, Status::Finished).await);

    let stored = harness.statuses.get_status(failed.id).await.unwrap().unwrap();
    assert_eq!(stored.error.as_deref(), Some("Network Error"));
}

#[tokio::test]
async fn test_shutdown_stops_the_scheduler() {
    let harness = Harness::new();
    let (scheduler, task) = start(&harness, 1, false, 100);

    let (held_url, _release) = held_job(&harness, "running");
    let job = scheduler.enqueue(held_url).await.unwrap();
    assert!(wait_for_status(&harness.statuses, job.id, Status::InProgress).await);

    scheduler.shutdown().await.unwrap();
    task.await.unwrap();

    assert!(matches!(
        scheduler.enqueue(url("late")).await,
        Err(SchedulerError::Stopped)
    ));
}
