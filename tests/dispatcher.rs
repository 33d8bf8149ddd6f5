use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hotfolder::engine::{
    BatchDispatcher, DispatchSettings, FolderWatcher, RunStatistics, StopSignal, WatcherSettings,
};
use hotfolder::errors::HotFolderError;
use hotfolder::fs::mock::MockFileSystem;
use hotfolder::watch::{Batch, FileAction};
use hotfolder_test_utils::{init_tracing, wait_until, with_timeout, RecordingClient, ScriptedSource};

const LIMIT: Duration = Duration::from_secs(10);

fn batch_of(count: usize) -> Batch {
    (0..count)
        .map(|i| (PathBuf::from(format!("/hot/f{i:02}.xml")), FileAction::Added))
        .collect()
}

fn dispatcher(
    client: &Arc<RecordingClient>,
    stop: &StopSignal,
    concurrency: usize,
    grace_period: Duration,
) -> BatchDispatcher {
    BatchDispatcher::new(
        "hotfolder",
        client.clone(),
        stop.clone(),
        Arc::new(RunStatistics::new()),
        DispatchSettings {
            concurrency,
            poll_interval: Duration::from_millis(20),
            grace_period,
        },
    )
}

#[tokio::test]
async fn empty_batch_completes_immediately() {
    let client = Arc::new(RecordingClient::new());
    let stop = StopSignal::new();
    let d = dispatcher(&client, &stop, 4, Duration::from_secs(1));

    assert_eq!(d.run(Batch::new()).await.unwrap(), 0);
    assert_eq!(d.stats().snapshot().batches, 0);
}

#[tokio::test]
async fn two_files_with_two_workers_run_in_parallel() {
    init_tracing();

    let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(100)));
    let stop = StopSignal::new();
    let d = dispatcher(&client, &stop, 2, Duration::from_secs(1));

    let started = Instant::now();
    let completed = with_timeout(LIMIT, d.run(batch_of(2))).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(completed, 2);
    assert_eq!(client.max_in_flight(), 2);
    assert!(elapsed >= Duration::from_millis(100), "took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(190), "took {elapsed:?}");
}

#[tokio::test]
async fn concurrency_bound_is_never_exceeded() {
    init_tracing();

    let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(30)));
    let stop = StopSignal::new();
    let d = dispatcher(&client, &stop, 3, Duration::from_secs(1));

    let completed = with_timeout(LIMIT, d.run(batch_of(12))).await.unwrap();

    assert_eq!(completed, 12);
    assert_eq!(client.max_in_flight(), 3);
    let totals = d.stats().snapshot();
    assert_eq!(totals.added, 12);
    assert_eq!(totals.batches, 1);
}

#[tokio::test]
async fn single_worker_runs_files_serially_in_batch_order() {
    init_tracing();

    let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(30)));
    let stop = StopSignal::new();
    let d = dispatcher(&client, &stop, 1, Duration::from_secs(1));

    let started = Instant::now();
    with_timeout(LIMIT, d.run(batch_of(4))).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(120));
    assert_eq!(client.max_in_flight(), 1);
    assert_eq!(
        client.file_names(),
        vec!["f00.xml", "f01.xml", "f02.xml", "f03.xml"]
    );
}

#[tokio::test]
async fn zero_concurrency_is_treated_as_one() {
    let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(10)));
    let stop = StopSignal::new();
    let d = dispatcher(&client, &stop, 0, Duration::from_secs(1));

    assert_eq!(with_timeout(LIMIT, d.run(batch_of(3))).await.unwrap(), 3);
    assert_eq!(client.max_in_flight(), 1);
}

#[tokio::test]
async fn stop_lets_queued_files_of_the_batch_run() {
    init_tracing();

    let stop = StopSignal::new();
    let client = Arc::new(
        RecordingClient::new()
            .with_delay(Duration::from_millis(20))
            .stop_after(1, stop.clone()),
    );
    let d = dispatcher(&client, &stop, 1, Duration::from_secs(2));

    let result = with_timeout(LIMIT, d.run(batch_of(10))).await;

    assert!(matches!(result, Err(HotFolderError::Stopped)), "got {result:?}");
    // Everything handed to the pool ran, one at a time, in batch order.
    assert_eq!(client.completed(), 10);
    assert_eq!(client.max_in_flight(), 1);
    assert_eq!(client.file_names()[..2], ["f00.xml", "f01.xml"]);
    assert_eq!(d.stats().snapshot().added, 10);
}

#[tokio::test]
async fn stop_waits_for_running_callbacks_within_grace() {
    init_tracing();

    let stop = StopSignal::new();
    let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(200)));
    let d = dispatcher(&client, &stop, 1, Duration::from_secs(2));

    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.set();
    });

    let started = Instant::now();
    let result = with_timeout(LIMIT, d.run(batch_of(3))).await;

    assert!(matches!(result, Err(HotFolderError::Stopped)));
    // Nothing was interrupted and nothing was skipped.
    assert_eq!(client.call_count(), 3);
    assert_eq!(client.completed(), 3);
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn files_outliving_grace_period_finish_in_background() {
    init_tracing();

    let stop = StopSignal::new();
    let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(300)));
    let d = dispatcher(&client, &stop, 1, Duration::from_millis(100));

    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.set();
    });

    let started = Instant::now();
    let result = with_timeout(LIMIT, d.run(batch_of(2))).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(HotFolderError::Stopped)));
    assert!(elapsed < Duration::from_millis(300), "took {elapsed:?}");
    assert_eq!(client.completed(), 0);

    // The detached tasks keep running, including the one still queued.
    wait_until(LIMIT, || client.completed() == 2).await;
    assert_eq!(client.file_names(), vec!["f00.xml", "f01.xml"]);
}

#[tokio::test]
async fn failure_aborts_batch_with_callback_error() {
    init_tracing();

    let client = Arc::new(
        RecordingClient::new()
            .with_delay(Duration::from_millis(20))
            .failing_on("f01.xml"),
    );
    let stop = StopSignal::new();
    let d = dispatcher(&client, &stop, 1, Duration::from_secs(1));

    let result = with_timeout(LIMIT, d.run(batch_of(6))).await;

    match result {
        Err(HotFolderError::CallbackFailed { path, error, .. }) => {
            assert_eq!(path, PathBuf::from("/hot/f01.xml"));
            assert!(error.to_string().contains("f01.xml"));
        }
        other => panic!("expected CallbackFailed, got {other:?}"),
    }
    // At most the file that grabbed the freed slot ran after the failure.
    assert!(client.call_count() <= 3, "calls: {:?}", client.file_names());
    assert!(!stop.is_set(), "a batch failure does not raise the stop signal");
}

#[tokio::test]
async fn stop_during_initial_sync_lets_dispatched_files_complete() {
    init_tracing();

    let fs = MockFileSystem::new();
    for i in 0..10 {
        fs.add_file(format!("/hot/f{i:02}.xml"));
    }

    let stop = StopSignal::new();
    let client = Arc::new(
        RecordingClient::new()
            .with_delay(Duration::from_millis(50))
            .stop_after(1, stop.clone()),
    );
    let settings = WatcherSettings::new("/hot")
        .with_poll_interval(Duration::from_millis(20))
        .with_concurrency(1);
    let watcher = FolderWatcher::with_fs(
        "hotfolder",
        settings,
        client.clone(),
        stop.clone(),
        Arc::new(fs),
    );

    let source = ScriptedSource::new("/hot");
    let probe = source.probe();
    let result = with_timeout(LIMIT, watcher.run_with_source(source.boxed())).await;

    assert!(result.is_ok(), "stop is a clean exit, got {result:?}");
    assert_eq!(client.completed(), 10);
    assert_eq!(client.close_count(), 1);
    // Stopped before the watch loop: the source was never polled for a new batch.
    assert_eq!(probe.polls(), 0);
}
