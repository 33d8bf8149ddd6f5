pub mod builders;
pub mod recording_client;
pub mod scripted_source;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use hotfolder::engine::WatcherState;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ConfigFileBuilder, HotFolderFixture};
pub use recording_client::{Call, RecordingClient};
pub use scripted_source::{ScriptedSource, SourceProbe};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Await `fut`, panicking if it takes longer than `limit`.
pub async fn with_timeout<F: Future>(limit: Duration, fut: F) -> F::Output {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| panic!("timed out after {limit:?}"))
}

/// Poll `cond` every 10ms until it holds, panicking after `limit`.
pub async fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) {
    with_timeout(limit, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

/// Wait until a watcher publishes `state`.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<WatcherState>,
    state: WatcherState,
    limit: Duration,
) {
    with_timeout(limit, rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("watcher closed before reaching {state:?}"));
}
