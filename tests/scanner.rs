use std::sync::Arc;
use std::time::{Duration, Instant};

use hotfolder::engine::{DualFolderScanner, ScanSettings, StopSignal, WatcherSettings, WatcherState};
use hotfolder::errors::HotFolderError;
use hotfolder::types::DetectorMode;
use hotfolder::watch::FileAction;
use hotfolder_test_utils::{
    init_tracing, wait_for_state, wait_until, with_timeout, HotFolderFixture, RecordingClient,
};

const LIMIT: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(50);

fn scan_settings(fixture: &HotFolderFixture, detector: DetectorMode) -> ScanSettings {
    ScanSettings {
        watch: WatcherSettings::new(&fixture.watch)
            .with_poll_interval(POLL)
            .with_grace_period(Duration::from_millis(500))
            .with_detector(detector),
        stop_folder: fixture.stop.clone(),
        stop_file: "stoprunning".to_string(),
    }
}

/// Start the scanner and wait until both folders are being watched.
async fn start(
    scanner: DualFolderScanner,
) -> tokio::task::JoinHandle<hotfolder::errors::Result<()>> {
    let mut primary_state = scanner.primary().subscribe_state();
    let mut stop_state = scanner.stop_watcher().subscribe_state();
    let handle = tokio::spawn(scanner.run());
    wait_for_state(&mut primary_state, WatcherState::Watching, LIMIT).await;
    wait_for_state(&mut stop_state, WatcherState::Watching, LIMIT).await;
    handle
}

#[tokio::test]
async fn native_watch_delivers_new_files_and_stops_on_sentinel() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );
    let stop = scanner.stop_signal();
    let handle = start(scanner).await;

    fixture.drop_file("a.xml", "<a/>").unwrap();
    fixture.drop_file("b.xml", "<b/>").unwrap();
    wait_until(LIMIT, || client.call_count() >= 2).await;

    let requested = Instant::now();
    fixture.request_stop().unwrap();
    let result = with_timeout(LIMIT, handle).await.unwrap();

    assert!(result.is_ok(), "got {result:?}");
    assert!(stop.is_set());
    assert_eq!(client.actions_for("a.xml"), vec![FileAction::Added]);
    assert_eq!(client.actions_for("b.xml"), vec![FileAction::Added]);
    assert_eq!(client.close_count(), 1);
    assert!(requested.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn polling_watch_delivers_new_files() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Polling),
        client.clone(),
        StopSignal::new(),
    );
    let handle = start(scanner).await;

    fixture.drop_file("report.csv", "1,2,3").unwrap();
    wait_until(LIMIT, || client.call_count() >= 1).await;

    fixture.request_stop().unwrap();
    with_timeout(LIMIT, handle).await.unwrap().unwrap();

    assert_eq!(client.actions_for("report.csv"), vec![FileAction::Added]);
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn files_present_at_startup_are_delivered_oldest_first() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let base = std::time::SystemTime::now() - Duration::from_secs(3600);
    for (name, age) in [("newest.xml", 30), ("oldest.xml", 10), ("middle.xml", 20)] {
        let path = fixture.write_file(name, "x").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(base + Duration::from_secs(age)).unwrap();
    }

    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );
    let handle = start(scanner).await;
    wait_until(LIMIT, || client.call_count() >= 3).await;

    fixture.request_stop().unwrap();
    with_timeout(LIMIT, handle).await.unwrap().unwrap();

    assert_eq!(
        &client.file_names()[..3],
        ["oldest.xml", "middle.xml", "newest.xml"]
    );
}

#[tokio::test]
async fn external_stop_signal_ends_the_session() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let client = Arc::new(RecordingClient::new());
    let stop = StopSignal::new();
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        stop.clone(),
    );
    let handle = start(scanner).await;

    stop.set();
    let result = with_timeout(LIMIT, handle).await.unwrap();

    assert!(result.is_ok());
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn other_files_in_stop_folder_do_not_stop() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );
    let stop = scanner.stop_signal();
    let handle = start(scanner).await;

    fixture.drop_into(&fixture.stop, "readme.txt", "hi").unwrap();
    tokio::time::sleep(POLL * 4).await;
    assert!(!stop.is_set());
    assert!(!handle.is_finished());

    fixture.request_stop().unwrap();
    with_timeout(LIMIT, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn sentinel_present_at_startup_stops_the_scan() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    fixture.request_stop().unwrap();

    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );

    let result = with_timeout(LIMIT, scanner.run()).await;

    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn primary_failure_is_reraised_and_stop_watcher_cancelled() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    fixture.write_file("bad.xml", "x").unwrap();

    let client = Arc::new(RecordingClient::new().failing_on("bad.xml"));
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );
    let stop = scanner.stop_signal();

    let result = with_timeout(LIMIT, scanner.run()).await;

    match result {
        Err(HotFolderError::CallbackFailed { path, .. }) => {
            assert_eq!(path.file_name().unwrap(), "bad.xml");
        }
        other => panic!("expected CallbackFailed, got {other:?}"),
    }
    assert!(stop.is_set());
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn missing_primary_folder_is_reported() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let mut settings = scan_settings(&fixture, DetectorMode::Native);
    settings.watch.folder = fixture.root().join("missing");

    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(settings, client.clone(), StopSignal::new());

    let result = with_timeout(LIMIT, scanner.run()).await;

    assert!(matches!(result, Err(HotFolderError::FolderNotFound(_))), "got {result:?}");
    assert_eq!(client.close_count(), 1);
}

#[tokio::test]
async fn missing_stop_folder_is_reported_after_primary_winds_down() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let mut settings = scan_settings(&fixture, DetectorMode::Native);
    settings.stop_folder = fixture.root().join("missing-stop");

    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(settings, client.clone(), StopSignal::new());

    let result = with_timeout(LIMIT, scanner.run()).await;

    assert!(matches!(result, Err(HotFolderError::FolderNotFound(ref p)) if p.ends_with("missing-stop")));
    assert_eq!(client.close_count(), 1, "primary watcher still closes its client");
}

#[tokio::test]
async fn sentinel_during_a_long_batch_lets_dispatched_files_finish() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    for i in 0..10 {
        fixture.write_file(&format!("f{i:02}.xml"), "x").unwrap();
    }

    let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(150)));
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );
    let mut stop_state = scanner.stop_watcher().subscribe_state();
    let handle = tokio::spawn(scanner.run());

    wait_for_state(&mut stop_state, WatcherState::Watching, LIMIT).await;
    wait_until(LIMIT, || client.call_count() >= 1).await;

    let requested = Instant::now();
    fixture.request_stop().unwrap();
    let result = with_timeout(LIMIT, handle).await.unwrap();

    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(client.close_count(), 1);
    // One poll to notice the sentinel, one to notice the flag, plus the grace period.
    assert!(requested.elapsed() < POLL * 4 + Duration::from_millis(150) + Duration::from_millis(500));

    // The files already dispatched keep running after the watcher returned.
    wait_until(LIMIT, || client.completed() == 10).await;
    assert_eq!(client.max_in_flight(), 1);

    // Nothing polls the hot folder anymore.
    fixture.drop_file("late.xml", "x").unwrap();
    tokio::time::sleep(POLL * 4).await;
    assert!(client.actions_for("late.xml").is_empty());
    assert_eq!(client.call_count(), 10);
}

#[tokio::test]
async fn sentinel_written_in_place_stops_the_scan() {
    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let client = Arc::new(RecordingClient::new());
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );
    let stop = scanner.stop_signal();
    let handle = start(scanner).await;

    std::fs::write(fixture.stop.join("stoprunning"), "stop\n").unwrap();
    let result = with_timeout(LIMIT, handle).await.unwrap();

    assert!(result.is_ok(), "got {result:?}");
    assert!(stop.is_set());
    assert_eq!(client.close_count(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn file_written_in_place_is_processed_by_command() {
    use hotfolder::exec::{CommandClient, CommandSettings};

    init_tracing();

    let fixture = HotFolderFixture::new().unwrap();
    let client = Arc::new(CommandClient::new(CommandSettings {
        cmd: r#"test "$HOTFOLDER_ACTION" = file_added"#.to_string(),
        timeout: None,
        processed_folder: fixture.processed.clone(),
        failed_folder: fixture.failed.clone(),
        process_modified: false,
    }));
    let scanner = DualFolderScanner::new(
        scan_settings(&fixture, DetectorMode::Native),
        client.clone(),
        StopSignal::new(),
    );
    let handle = start(scanner).await;

    std::fs::write(fixture.watch.join("inplace.xml"), "<a/>").unwrap();
    let processed = fixture.processed.join("inplace.xml");
    wait_until(LIMIT, || processed.is_file()).await;

    fixture.request_stop().unwrap();
    with_timeout(LIMIT, handle).await.unwrap().unwrap();

    assert!(!fixture.watch.join("inplace.xml").exists());
    assert_eq!(client.totals(), (1, 0));
}
