//! The capture loop
//!
//! A [`Recorder`] subscribes to a [`KeySource`] and runs one background thread
//! that handles presses strictly one at a time, in arrival order:
//!
//! 1. normalize the raw press to an identifier
//! 2. increment the counter store
//! 3. rewrite the counts file
//! 4. notify observers
//!
//! A failed write is recorded in [`RecorderStatus`] and logged; counting
//! carries on and the next successful write includes everything.

use super::error::RecorderError;
use super::notify::ChangeNotifier;
use super::persist::PersistenceGateway;
use super::store::{CounterStore, CounterView, Snapshot};
use crate::config::Config;
use crate::keyboard::{self, normalize, KeySource, RawKeyEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often an idle capture thread checks for a stop request
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Why the recorder stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// stop() was called
    Requested,
    /// The key source ended its event sequence on its own
    SourceEnded,
}

/// Recorder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Listening,
    Stopped(StopReason),
}

impl RecorderState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Listening => "LISTENING",
            Self::Stopped(StopReason::Requested) => "STOPPED",
            Self::Stopped(StopReason::SourceEnded) => "SOURCE LOST",
        }
    }
}

/// Observable recorder health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderStatus {
    pub state: RecorderState,
    /// Presses handled since start()
    pub events: u64,
    /// Writes that failed since start()
    pub failed_saves: u64,
    /// Error of the latest write, cleared by the next successful one
    pub last_save_error: Option<String>,
}

impl Default for RecorderStatus {
    fn default() -> Self {
        Self {
            state: RecorderState::Idle,
            events: 0,
            failed_saves: 0,
            last_save_error: None,
        }
    }
}

type SharedStatus = Arc<Mutex<RecorderStatus>>;

fn with_status<T>(status: &SharedStatus, f: impl FnOnce(&mut RecorderStatus) -> T) -> T {
    f(&mut status.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Everything the capture thread owns
struct Pipeline {
    store: CounterStore,
    gateway: PersistenceGateway,
    notifier: ChangeNotifier,
    status: SharedStatus,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    fn run(mut self, events: mpsc::Receiver<RawKeyEvent>) {
        let reason = loop {
            let raw = match events.recv_timeout(STOP_CHECK_INTERVAL) {
                Ok(raw) => raw,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if self.stop.load(Ordering::SeqCst) {
                        break StopReason::Requested;
                    }
                    continue;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    if self.stop.load(Ordering::SeqCst) {
                        break StopReason::Requested;
                    }
                    break StopReason::SourceEnded;
                }
            };

            // Presses queued behind a stop request are dropped
            if self.stop.load(Ordering::SeqCst) {
                break StopReason::Requested;
            }
            self.process(&raw);
        };

        if reason == StopReason::SourceEnded {
            log::warn!("key source ended its event stream; capture stopped");
        }
        with_status(&self.status, |status| {
            status.state = RecorderState::Stopped(reason)
        });
    }

    fn process(&mut self, raw: &RawKeyEvent) {
        let id = normalize(raw);
        let count = self.store.increment(&id);
        log::trace!("{} -> {}", id, count);

        let saved = self.gateway.save(&self.store.snapshot());

        with_status(&self.status, |status| {
            status.events += 1;
            match &saved {
                Ok(()) => status.last_save_error = None,
                Err(e) => {
                    status.failed_saves += 1;
                    status.last_save_error = Some(e.to_string());
                }
            }
        });
        if let Err(e) = saved {
            log::warn!("counts not saved: {}", e);
        }

        self.notifier.emit();
    }
}

/// Owns the capture pipeline and exposes it to presentation code
pub struct Recorder {
    source: Box<dyn KeySource>,
    pipeline: Option<Pipeline>,
    view: CounterView,
    notifier: ChangeNotifier,
    status: SharedStatus,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Recorder {
    /// Create an idle recorder, loading previous counts through `gateway`
    pub fn new(source: Box<dyn KeySource>, gateway: PersistenceGateway) -> Self {
        let store = CounterStore::from_counts(gateway.load_counts());
        let view = store.view();
        let notifier = ChangeNotifier::new();
        let status = SharedStatus::default();
        let stop = Arc::new(AtomicBool::new(false));

        let pipeline = Pipeline {
            store,
            gateway,
            notifier: notifier.clone(),
            status: Arc::clone(&status),
            stop: Arc::clone(&stop),
        };

        Self {
            source,
            pipeline: Some(pipeline),
            view,
            notifier,
            status,
            stop,
            worker: None,
        }
    }

    /// Recorder wired to the configured key source and counts file
    pub fn from_config(config: &Config) -> Self {
        let source = keyboard::open_source(&config.capture);
        let gateway = PersistenceGateway::new(config.storage.data_file())
            .with_indent(config.storage.indent);
        Self::new(source, gateway)
    }

    /// Subscribe to the key source and start counting.
    ///
    /// Fails with [`RecorderError::UsageFault`] unless the recorder is idle,
    /// and with [`RecorderError::SourceUnavailable`] if the source refuses;
    /// in that case the recorder stays idle and start() may be retried.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        match self.state() {
            RecorderState::Idle => {}
            RecorderState::Listening => {
                log::error!("start() called on a recorder that is already listening");
                return Err(RecorderError::UsageFault("recorder is already listening"));
            }
            RecorderState::Stopped(_) => {
                log::error!("start() called on a stopped recorder");
                return Err(RecorderError::UsageFault("recorder has been stopped"));
            }
        }

        let Some(pipeline) = self.pipeline.take() else {
            return Err(RecorderError::UsageFault("capture pipeline already consumed"));
        };

        let (tx, rx) = mpsc::channel();
        if let Err(e) = self.source.subscribe(tx) {
            log::error!("could not subscribe to {} key source: {}", self.source.name(), e);
            self.pipeline = Some(pipeline);
            return Err(RecorderError::SourceUnavailable(e));
        }

        with_status(&self.status, |status| status.state = RecorderState::Listening);

        let spawned = thread::Builder::new()
            .name("capture-loop".into())
            .spawn(move || pipeline.run(rx));

        match spawned {
            Ok(worker) => {
                log::info!("listening for key presses via {}", self.source.name());
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                self.source.unsubscribe();
                with_status(&self.status, |status| {
                    status.state = RecorderState::Stopped(StopReason::Requested)
                });
                Err(RecorderError::Spawn(e))
            }
        }
    }

    /// Stop counting. Safe to call in any state and more than once.
    ///
    /// A press being handled when this is called is finished, including its
    /// write. Nothing is counted or notified after this returns.
    pub fn stop(&mut self) {
        if self.state() == RecorderState::Idle {
            with_status(&self.status, |status| {
                status.state = RecorderState::Stopped(StopReason::Requested)
            });
            log::info!("recorder stopped before starting");
            return;
        }

        self.stop.store(true, Ordering::SeqCst);
        self.source.unsubscribe();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("capture thread panicked");
                with_status(&self.status, |status| {
                    if status.state == RecorderState::Listening {
                        status.state = RecorderState::Stopped(StopReason::Requested);
                    }
                });
            }
            log::info!("recorder stopped");
        }
    }

    pub fn state(&self) -> RecorderState {
        with_status(&self.status, |status| status.state)
    }

    pub fn status(&self) -> RecorderStatus {
        with_status(&self.status, |status| status.clone())
    }

    /// Name of the key source in use
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Read-only handle to the live counts
    pub fn counts(&self) -> CounterView {
        self.view.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.view.snapshot()
    }

    /// Register a callback run after every counted press
    pub fn on_change(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.notifier.on_change(callback);
    }

    /// Channel that receives `()` after every counted press
    pub fn subscribe_changes(&self) -> mpsc::Receiver<()> {
        self.notifier.subscribe()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{KeyCode, ScriptedSource};

    fn recorder_in(dir: &tempfile::TempDir) -> (Recorder, crate::keyboard::ScriptedFeed) {
        let (source, feed) = ScriptedSource::new();
        let gateway = PersistenceGateway::new(dir.path().join("data.json"));
        (Recorder::new(Box::new(source), gateway), feed)
    }

    #[test]
    fn new_recorder_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, _feed) = recorder_in(&dir);
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.status(), RecorderStatus::default());
        assert!(recorder.snapshot().is_empty());
    }

    #[test]
    fn stop_from_idle_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let (mut recorder, _feed) = recorder_in(&dir);
        recorder.stop();
        assert_eq!(
            recorder.state(),
            RecorderState::Stopped(StopReason::Requested)
        );
        assert!(matches!(
            recorder.start(),
            Err(RecorderError::UsageFault(_))
        ));
    }

    #[test]
    fn refused_subscription_leaves_recorder_idle() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::unavailable("permission denied");
        let gateway = PersistenceGateway::new(dir.path().join("data.json"));
        let mut recorder = Recorder::new(Box::new(source), gateway);

        assert!(matches!(
            recorder.start(),
            Err(RecorderError::SourceUnavailable(_))
        ));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn processes_a_press_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (mut recorder, feed) = recorder_in(&dir);
        let changes = recorder.subscribe_changes();
        recorder.start().unwrap();

        assert!(feed.press(RawKeyEvent::plain(KeyCode(30))));
        changes
            .recv_timeout(Duration::from_secs(5))
            .expect("change notification");

        assert_eq!(recorder.snapshot().get("a"), 1);
        let status = recorder.status();
        assert_eq!(status.events, 1);
        assert_eq!(status.failed_saves, 0);

        recorder.stop();
        let on_disk = PersistenceGateway::new(dir.path().join("data.json")).load_counts();
        assert_eq!(on_disk.get("a"), Some(&1));
    }

    #[test]
    fn state_labels() {
        assert_eq!(RecorderState::Listening.label(), "LISTENING");
        assert_eq!(
            RecorderState::Stopped(StopReason::SourceEnded).label(),
            "SOURCE LOST"
        );
    }
}
