//! Download folder watcher.
//!
//! `notify` events are debounced per path: a file is reported complete once no
//! event has touched it for the settle period and it still exists. Browsers
//! write into `.part`/`.crdownload` files and rename at the end, so the rename
//! target shows up as a fresh path and settles on its own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::control::ShutdownToken;
use crate::coordinator::CoordinatorHandle;

const TICK: Duration = Duration::from_millis(250);

/// Name suffixes browsers and download tools use while a transfer is in progress.
const PARTIAL_SUFFIXES: [&str; 3] = [".tmp", ".crdownload", ".part"];

/// Decides which paths are worth digesting.
#[derive(Debug, Clone, Default)]
pub struct DownloadFilter {
    extensions: Vec<String>,
}

impl DownloadFilter {
    /// `extensions` may be given with or without the leading dot; empty accepts all.
    pub fn new(extensions: &[String]) -> Self {
        let extensions = extensions
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| if e.starts_with('.') { e } else { format!(".{e}") })
            .collect();
        Self { extensions }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        if PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return false;
        }
        self.extensions.is_empty() || self.extensions.iter().any(|e| name.ends_with(e.as_str()))
    }
}

/// Paths an event says may have new content.
fn touched_paths(event: &Event) -> Vec<&Path> {
    match &event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.iter().map(PathBuf::as_path).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().map(PathBuf::as_path).into_iter().collect()
        }
        EventKind::Modify(_) => event.paths.iter().map(PathBuf::as_path).collect(),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            event.paths.iter().map(PathBuf::as_path).collect()
        }
        _ => Vec::new(),
    }
}

/// Per-path quiet-period tracker.
#[derive(Debug)]
pub struct Settling {
    quiet: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Settling {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_seen: HashMap::new(),
        }
    }

    pub fn touch(&mut self, path: PathBuf, now: Instant) {
        self.last_seen.insert(path, now);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    /// Remove and return every path quiet for at least the settle period.
    pub fn drain_settled(&mut self, now: Instant) -> Vec<PathBuf> {
        let quiet = self.quiet;
        let mut settled = Vec::new();
        self.last_seen.retain(|path, seen| {
            if now.saturating_duration_since(*seen) >= quiet {
                settled.push(path.clone());
                false
            } else {
                true
            }
        });
        settled.sort();
        settled
    }
}

pub struct DownloadWatcher {
    task: JoinHandle<()>,
}

impl DownloadWatcher {
    /// Start watching `dirs` (created if missing). Ready files are handed to
    /// `handle.file_ready`. Must be called from within a tokio runtime.
    pub fn start(
        dirs: &[PathBuf],
        filter: DownloadFilter,
        settle: Duration,
        handle: CoordinatorHandle,
        shutdown: ShutdownToken,
    ) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                if events_tx.send(result).is_err() {
                    tracing::trace!("watch event after watcher task ended");
                }
            },
            Config::default(),
        )
        .context("create filesystem watcher")?;

        for dir in dirs {
            std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("watch {}", dir.display()))?;
            tracing::info!(dir = %dir.display(), "watching for downloads");
        }

        let task = tokio::spawn(run_watch_loop(
            watcher, events_rx, filter, settle, handle, shutdown,
        ));
        Ok(Self { task })
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!("download watcher panicked: {}", e);
            }
        }
    }
}

async fn run_watch_loop(
    // Owned here so watching stops when the loop ends.
    _watcher: RecommendedWatcher,
    mut events_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    filter: DownloadFilter,
    settle: Duration,
    handle: CoordinatorHandle,
    shutdown: ShutdownToken,
) {
    let mut settling = Settling::new(settle);
    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = events_rx.recv() => match maybe {
                Some(Ok(event)) => {
                    let now = Instant::now();
                    for path in touched_paths(&event) {
                        if filter.accepts(path) {
                            settling.touch(path.to_path_buf(), now);
                        }
                    }
                }
                Some(Err(e)) => tracing::warn!("watch error: {}", e),
                None => break,
            },
            _ = tick.tick() => {
                if shutdown.is_triggered() || handle.is_closed() {
                    break;
                }
                for path in settling.drain_settled(Instant::now()) {
                    if !path.is_file() {
                        tracing::trace!(path = %path.display(), "gone before settling");
                        continue;
                    }
                    tracing::info!(path = %path.display(), "download complete");
                    handle.file_ready(path);
                }
            }
        }
    }
    tracing::debug!("download watcher stopped");
}
