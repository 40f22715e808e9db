//! Shutdown signalling for the producer loops and the control socket location.
//!
//! The watcher task and the clipboard thread each hold a clone of the same
//! `ShutdownToken` and check it on every tick; `hashmatch watch` trips it on
//! Ctrl-C/SIGTERM.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Default path for the control socket, under the XDG state dir next to the log.
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("hashmatch")?.get_state_home();
    Ok(dir.join("control.sock"))
}
