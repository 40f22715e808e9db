//! Clipboard poller.
//!
//! Reading the clipboard is blocking (an external command on Debian desktops),
//! so the poller runs on its own thread with a fixed sleep and only forwards
//! changed text to the coordinator.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};

use crate::control::ShutdownToken;
use crate::coordinator::CoordinatorHandle;

const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Longest a clipboard command may run before it is killed. A selection owner
/// that never answers would otherwise hang the poller and shutdown with it.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Source of the current clipboard text.
pub trait ClipboardReader: Send + 'static {
    fn read_text(&mut self) -> Result<String>;
}

/// Sink for text the application itself puts on the clipboard.
pub trait ClipboardWriter: Send + Sync + 'static {
    fn write_text(&self, text: &str) -> Result<()>;
}

fn split_program(argv: &[String]) -> Result<(&String, &[String])> {
    argv.split_first()
        .ok_or_else(|| anyhow!("empty clipboard command"))
}

/// Wait for `child`, killing it once `timeout` has passed.
fn wait_with_deadline(child: &mut Child, program: &str, timeout: Duration) -> Result<ExitStatus> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| format!("wait for {}", program))? {
            return Ok(status);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            bail!("{} did not finish within {:?}", program, timeout);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Reads the clipboard by running a command that prints it to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandClipboard {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `wl-paste` under Wayland, `xclip` otherwise.
    pub fn detect() -> Self {
        let argv: &[&str] = if is_wayland() {
            &["wl-paste", "--no-newline", "--type", "text"]
        } else {
            &["xclip", "-o", "-selection", "clipboard"]
        };
        Self::new(argv.iter().map(|s| s.to_string()).collect())
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

fn is_wayland() -> bool {
    std::env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty())
}

impl ClipboardReader for CommandClipboard {
    fn read_text(&mut self) -> Result<String> {
        let (program, args) = split_program(&self.argv)?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("run {}", program))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("missing {} stdout pipe", program))?;
        // Drain on a helper thread so a large selection cannot fill the pipe
        // and stall the child past its deadline.
        let drain = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        let status = wait_with_deadline(&mut child, program, self.timeout);
        let out = drain
            .join()
            .map_err(|_| anyhow!("{} output reader panicked", program))?;
        let status = status?;
        if !status.success() {
            bail!("{} exited with {}", program, status);
        }
        let out = out.with_context(|| format!("read {} output", program))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Writes the clipboard by piping text into a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboardWriter {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandClipboardWriter {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `wl-copy` under Wayland, `xclip -i` otherwise. Both fork to serve the
    /// selection, so the foreground process exits once the text is taken.
    pub fn detect() -> Self {
        let argv: &[&str] = if is_wayland() {
            &["wl-copy"]
        } else {
            &["xclip", "-i", "-selection", "clipboard"]
        };
        Self::new(argv.iter().map(|s| s.to_string()).collect())
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl ClipboardWriter for CommandClipboardWriter {
    fn write_text(&self, text: &str) -> Result<()> {
        let (program, args) = split_program(&self.argv)?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("run {}", program))?;
        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("missing {} stdin pipe", program))?;
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e).with_context(|| format!("write to {}", program));
            }
        }
        let status = wait_with_deadline(&mut child, program, self.timeout)?;
        if !status.success() {
            bail!("{} exited with {}", program, status);
        }
        Ok(())
    }
}

/// Last observed clipboard text, used only to detect changes.
#[derive(Debug, Default)]
pub struct ClipboardSample {
    text: Option<String>,
    seq: u64,
}

impl ClipboardSample {
    /// Record a read. Returns true when the text differs from the previous
    /// read; the very first read only seeds the sample so whatever was on the
    /// clipboard at startup is not treated as new.
    pub fn observe(&mut self, text: &str) -> bool {
        match &self.text {
            None => {
                self.text = Some(text.to_string());
                false
            }
            Some(prev) if prev == text => false,
            Some(_) => {
                self.text = Some(text.to_string());
                self.seq += 1;
                true
            }
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Poll `reader` every `interval` until shutdown or until the coordinator stops.
/// Read failures are logged (once per distinct message) and retried after a backoff.
pub fn spawn_clipboard_poller<R: ClipboardReader>(
    mut reader: R,
    interval: Duration,
    handle: CoordinatorHandle,
    shutdown: ShutdownToken,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("clipboard-poller".to_string())
        .spawn(move || {
            let mut sample = ClipboardSample::default();
            let mut last_error: Option<String> = None;
            while !shutdown.is_triggered() {
                match reader.read_text() {
                    Ok(text) => {
                        last_error = None;
                        if sample.observe(&text) {
                            tracing::trace!(seq = sample.seq(), "clipboard changed");
                            if !handle.clipboard_changed(text) {
                                break;
                            }
                        }
                        thread::sleep(interval);
                    }
                    Err(e) => {
                        let msg = format!("{:#}", e);
                        if last_error.as_deref() == Some(msg.as_str()) {
                            tracing::trace!("clipboard read failed again: {}", msg);
                        } else {
                            tracing::warn!("clipboard read failed: {}", msg);
                        }
                        last_error = Some(msg);
                        thread::sleep(ERROR_BACKOFF);
                    }
                }
            }
            tracing::debug!("clipboard poller stopped");
        })
}
