//! Verification coordinator: the single serialization point for all producers.
//!
//! The filesystem watcher, the clipboard poller and the control socket only
//! hold a `CoordinatorHandle`; every signal lands in one unbounded queue and
//! the coordinator task applies them to the `VerificationMachine` one at a
//! time. Digesting runs on the blocking pool and only its result is queued.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::action::UserAction;
use crate::config::{ConfigError, HashmatchConfig};
use crate::digest::{Algorithm, DigestEngine, DigestError};
use crate::observer::VerificationObserver;
use crate::registry::TrackedFile;
use crate::sources::ClipboardWriter;
use crate::state::{Input, ResetTimer, StatusSnapshot, VerificationMachine};

pub const DEFAULT_RESET_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub enum Signal {
    Input(Input),
    Snapshot(oneshot::Sender<StatusSnapshot>),
    Shutdown,
}

/// Engine, compare algorithm and reset delay. The compare algorithm is always
/// one the engine computes.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    engine: DigestEngine,
    compare: Algorithm,
    reset_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            engine: DigestEngine::default(),
            compare: Algorithm::Sha256,
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }
}

impl CoordinatorConfig {
    pub fn new(
        engine: DigestEngine,
        compare: Algorithm,
        reset_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if !engine.computes(compare) {
            return Err(ConfigError::CompareNotComputed(compare));
        }
        Ok(Self {
            engine,
            compare,
            reset_delay,
        })
    }

    pub fn with_reset_delay(mut self, reset_delay: Duration) -> Self {
        self.reset_delay = reset_delay;
        self
    }

    pub fn engine(&self) -> &DigestEngine {
        &self.engine
    }

    pub fn compare(&self) -> Algorithm {
        self.compare
    }

    pub fn reset_delay(&self) -> Duration {
        self.reset_delay
    }
}

impl TryFrom<&HashmatchConfig> for CoordinatorConfig {
    type Error = ConfigError;

    fn try_from(cfg: &HashmatchConfig) -> Result<Self, Self::Error> {
        Self::new(cfg.digest_engine()?, cfg.compare_algorithm, cfg.reset_delay())
    }
}

/// Paths being digested, each with a flag set when the path was reported
/// again mid-digest.
type InFlightMap = Arc<Mutex<HashMap<PathBuf, bool>>>;

/// Claim on one in-flight path. Dropping it without `finish` (panic, failed
/// join) releases the path.
struct InFlightGuard {
    map: InFlightMap,
    path: PathBuf,
    released: bool,
}

impl InFlightGuard {
    fn claim(map: &InFlightMap, path: PathBuf) -> Option<Self> {
        let mut entries = map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(changed) = entries.get_mut(&path) {
            *changed = true;
            return None;
        }
        entries.insert(path.clone(), false);
        Some(Self {
            map: Arc::clone(map),
            path,
            released: false,
        })
    }

    /// Release the path unless it was reported again while digesting, in
    /// which case the flag is cleared and `false` asks for another pass.
    fn finish(&mut self) -> bool {
        let mut entries = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(&self.path) {
            Some(changed) if *changed => {
                *changed = false;
                false
            }
            _ => {
                entries.remove(&self.path);
                self.released = true;
                true
            }
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.released {
            self.map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.path);
        }
    }
}

/// Cheap, cloneable sender side. Every method is non-blocking; `false` means
/// the coordinator has stopped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Signal>,
    engine: Arc<DigestEngine>,
    compare: Algorithm,
    in_flight: InFlightMap,
}

impl CoordinatorHandle {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<Signal>,
        engine: DigestEngine,
        compare: Algorithm,
    ) -> Self {
        Self {
            tx,
            engine: Arc::new(engine),
            compare,
            in_flight: Arc::default(),
        }
    }

    fn send(&self, signal: Signal) -> bool {
        if self.tx.send(signal).is_err() {
            tracing::debug!("coordinator stopped; signal dropped");
            return false;
        }
        true
    }

    /// A completed file was reported. Digests it on the blocking pool and
    /// submits the result. Returns `None` when the path is already being
    /// digested; that digest is then redone once it ends, so a file that
    /// grew mid-pass is never tracked from a partial read. Must be called
    /// from within a tokio runtime.
    pub fn file_ready(&self, path: PathBuf) -> Option<JoinHandle<()>> {
        let Some(mut guard) = InFlightGuard::claim(&self.in_flight, path.clone()) else {
            tracing::debug!(path = %path.display(), "digest in progress; will redo it");
            return None;
        };
        let handle = self.clone();
        Some(tokio::spawn(async move {
            loop {
                let engine = Arc::clone(&handle.engine);
                let path = guard.path.clone();
                tracing::debug!(path = %path.display(), "digesting");
                let result = match tokio::task::spawn_blocking(move || engine.track(&path)).await
                {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(path = %guard.path.display(), "digest task failed: {}", e);
                        return;
                    }
                };
                if guard.finish() {
                    handle.submit_file(result);
                    return;
                }
                tracing::debug!(path = %guard.path.display(), "changed while digesting");
            }
        }))
    }

    /// Submit an already computed digest result.
    pub fn submit_file(&self, result: Result<TrackedFile, DigestError>) -> bool {
        self.send(Signal::Input(Input::FileReady(result)))
    }

    pub fn clipboard_changed(&self, text: String) -> bool {
        self.send(Signal::Input(Input::ClipboardChanged(text)))
    }

    pub fn user_action(&self, action: UserAction) -> bool {
        self.send(Signal::Input(Input::UserAction(action)))
    }

    /// Current state, or `None` if the coordinator has stopped.
    pub async fn snapshot(&self) -> Option<StatusSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if !self.send(Signal::Snapshot(reply_tx)) {
            return None;
        }
        reply_rx.await.ok()
    }

    /// Put the current file's compare digest on the clipboard. The change
    /// this causes is not taken as a pasted digest, so it can never verify the
    /// file against itself. `Ok(None)` when no file is tracked.
    pub async fn copy_digest(&self, writer: Arc<dyn ClipboardWriter>) -> Result<Option<String>> {
        let snapshot = self
            .snapshot()
            .await
            .ok_or_else(|| anyhow!("coordinator stopped"))?;
        let Some(digest) = snapshot
            .current
            .as_ref()
            .and_then(|f| f.digest(self.compare))
            .map(str::to_string)
        else {
            return Ok(None);
        };
        // Queued before the write, so it is applied before the poller can
        // report the resulting change.
        if !self.send(Signal::Input(Input::ClipboardWritten(digest.clone()))) {
            return Err(anyhow!("coordinator stopped"));
        }
        let text = digest.clone();
        tokio::task::spawn_blocking(move || writer.write_text(&text))
            .await
            .context("clipboard writer task failed")??;
        tracing::info!(algorithm = %self.compare, "copied digest to clipboard");
        Ok(Some(digest))
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Signal::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct Coordinator {
    machine: VerificationMachine,
    observer: Arc<dyn VerificationObserver>,
    rx: mpsc::UnboundedReceiver<Signal>,
    timer_tx: mpsc::WeakUnboundedSender<Signal>,
    reset_delay: Duration,
    timer: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Spawn the coordinator task. It runs until `shutdown()` is called or
    /// every handle is dropped.
    pub fn spawn(
        config: CoordinatorConfig,
        observer: Arc<dyn VerificationObserver>,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Coordinator {
            machine: VerificationMachine::new(config.compare),
            observer,
            rx,
            timer_tx: tx.downgrade(),
            reset_delay: config.reset_delay,
            timer: None,
        };
        let handle = CoordinatorHandle::new(tx, config.engine, config.compare);
        (handle, tokio::spawn(coordinator.run()))
    }

    async fn run(mut self) {
        tracing::debug!("coordinator started");
        while let Some(signal) = self.rx.recv().await {
            match signal {
                Signal::Shutdown => break,
                Signal::Snapshot(reply) => {
                    let _ = reply.send(self.machine.snapshot());
                }
                Signal::Input(input) => self.apply(input),
            }
        }
        self.cancel_timer();
        tracing::info!("coordinator stopped");
    }

    fn apply(&mut self, input: Input) {
        let step = self.machine.apply(input);
        tracing::trace!(state = ?self.machine.state(), notices = step.notices.len(), "transition");
        for notice in &step.notices {
            notice.deliver(self.observer.as_ref());
        }
        match step.timer {
            ResetTimer::Unchanged => {}
            ResetTimer::Cancel => self.cancel_timer(),
            ResetTimer::Schedule(epoch) => {
                self.cancel_timer();
                let tx = self.timer_tx.clone();
                let delay = self.reset_delay;
                self.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(tx) = tx.upgrade() {
                        let _ = tx.send(Signal::Input(Input::ResetElapsed(epoch)));
                    }
                }));
            }
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
