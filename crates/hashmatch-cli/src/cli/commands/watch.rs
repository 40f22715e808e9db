//! `hashmatch watch` – run the coordinator with the folder watcher, the
//! clipboard poller and the control socket until Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use hashmatch_core::config::HashmatchConfig;
use hashmatch_core::control::{self, ShutdownToken};
use hashmatch_core::sources::{spawn_clipboard_poller, DownloadWatcher};
use hashmatch_core::{Coordinator, CoordinatorConfig};
use std::sync::Arc;

use crate::cli::control_socket;
use crate::console::ConsoleObserver;

pub async fn run_watch(cfg: &HashmatchConfig) -> Result<()> {
    let (handle, coordinator) = Coordinator::spawn(
        CoordinatorConfig::try_from(cfg)?,
        Arc::new(ConsoleObserver::default()),
    );
    let socket_path = control::default_control_socket_path()?;
    let listener = match control_socket::spawn_control_listener(
        handle.clone(),
        Arc::new(cfg.clipboard_writer()),
        &socket_path,
    ) {
        Ok(task) => task,
        Err(e) => {
            handle.shutdown();
            let _ = coordinator.await;
            return Err(e);
        }
    };
    let shutdown = ShutdownToken::new();

    let watcher = DownloadWatcher::start(
        &cfg.watch_dirs,
        cfg.download_filter(),
        cfg.settle(),
        handle.clone(),
        shutdown.clone(),
    )?;
    let reader = cfg.clipboard_reader();
    tracing::debug!(argv = ?reader.argv(), "clipboard command");
    let poller = spawn_clipboard_poller(
        reader,
        cfg.clipboard_poll_interval(),
        handle.clone(),
        shutdown.clone(),
    )
    .context("start clipboard poller")?;

    println!(
        "Watching {} folder(s). Run `hashmatch verify`, then copy the published digest. Ctrl-C to stop.",
        cfg.watch_dirs.len()
    );
    wait_for_signal().await?;
    tracing::info!("shutting down");

    shutdown.trigger();
    listener.abort();
    let _ = std::fs::remove_file(&socket_path);
    watcher.join().await;
    handle.shutdown();
    if let Err(e) = coordinator.await {
        tracing::error!("coordinator task failed: {}", e);
    }
    if tokio::task::spawn_blocking(move || poller.join())
        .await
        .map_or(true, |r| r.is_err())
    {
        tracing::error!("clipboard poller panicked");
    }
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r.context("wait for Ctrl-C")?,
        _ = term.recv() => {}
    }
    Ok(())
}

