use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hotfolder::errors::{HotFolderError, Result};
use hotfolder::watch::{ChangeSource, FileEvent, Poll};

enum Step {
    Events(Vec<FileEvent>),
    Invalidate,
    Call(Box<dyn FnOnce() + Send>),
}

/// Observes a [`ScriptedSource`] after it was moved into a watcher.
#[derive(Debug, Clone, Default)]
pub struct SourceProbe {
    polls: Arc<AtomicUsize>,
    rearms: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
    exhausted: Arc<AtomicBool>,
}

impl SourceProbe {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn rearms(&self) -> usize {
        self.rearms.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// True once every scripted step was consumed.
    pub fn exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }
}

/// A change source that replays a fixed script instead of watching anything.
///
/// Each `poll` consumes the next event list. `Call` steps run in between
/// without consuming a poll, which lets a test mutate a mock filesystem or
/// raise a stop signal at a precise point. When the script is exhausted,
/// every poll sleeps for its timeout and reports `Timeout`.
pub struct ScriptedSource {
    folder: PathBuf,
    steps: VecDeque<Step>,
    probe: SourceProbe,
}

impl ScriptedSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            steps: VecDeque::new(),
            probe: SourceProbe::default(),
        }
    }

    pub fn then_events(mut self, events: Vec<FileEvent>) -> Self {
        self.steps.push_back(Step::Events(events));
        self
    }

    pub fn then_overflow(self) -> Self {
        self.then_events(vec![FileEvent::overflow()])
    }

    pub fn then_call(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.steps.push_back(Step::Call(Box::new(f)));
        self
    }

    /// The next poll fails as if the folder had been removed.
    pub fn then_invalidate(mut self) -> Self {
        self.steps.push_back(Step::Invalidate);
        self
    }

    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }

    pub fn boxed(self) -> Box<dyn ChangeSource> {
        Box::new(self)
    }
}

impl ChangeSource for ScriptedSource {
    fn folder(&self) -> &Path {
        &self.folder
    }

    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Poll>> + Send + '_>> {
        Box::pin(async move {
            self.probe.polls.fetch_add(1, Ordering::SeqCst);
            loop {
                match self.steps.pop_front() {
                    Some(Step::Call(f)) => f(),
                    Some(Step::Events(events)) => return Ok(Poll::Events(events)),
                    Some(Step::Invalidate) => {
                        return Err(HotFolderError::SubscriptionInvalidated(self.folder.clone()));
                    }
                    None => {
                        self.probe.exhausted.store(true, Ordering::SeqCst);
                        tokio::time::sleep(timeout).await;
                        return Ok(Poll::Timeout);
                    }
                }
            }
        })
    }

    fn rearm(&mut self) -> Result<()> {
        self.probe.rearms.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(self: Box<Self>) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}
