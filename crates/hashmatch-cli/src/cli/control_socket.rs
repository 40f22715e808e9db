//! Control socket: server (during `hashmatch watch`) and client (for `hashmatch verify` etc).
//! Protocol: one line per command: "verify", "ignore", "dismiss", "copy" or "status".
//! "status" is answered with one line of JSON; "copy" with the copied digest,
//! an empty line when no file is tracked, or "error: <reason>".

use anyhow::{bail, Context, Result};
use hashmatch_core::sources::ClipboardWriter;
use hashmatch_core::{ControlCommand, CoordinatorHandle, StatusSnapshot, UserAction};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(200);
const COPY_ERROR_PREFIX: &str = "error: ";

/// Binds `path` and spawns a task that turns each line into a coordinator
/// signal. Unknown commands are logged and ignored. Fails if another
/// `hashmatch watch` is already answering on `path`; a stale socket file
/// left by a crashed run is replaced.
pub fn spawn_control_listener(
    handle: CoordinatorHandle,
    writer: Arc<dyn ClipboardWriter>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    if path.exists() {
        if std::os::unix::net::UnixStream::connect(&path).is_ok() {
            bail!("hashmatch watch is already running (socket {})", path.display());
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("remove stale socket {}", path.display()))?;
    }
    let listener =
        UnixListener::bind(&path).with_context(|| format!("bind {}", path.display()))?;
    tracing::debug!(path = %path.display(), "control socket listening");

    Ok(tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let handle = handle.clone();
                    let writer = Arc::clone(&writer);
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, handle, writer).await {
                            tracing::debug!("control connection: {:#}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("control socket accept: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }))
}

async fn serve_connection(
    stream: UnixStream,
    handle: CoordinatorHandle,
    writer: Arc<dyn ClipboardWriter>,
) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match line.parse::<ControlCommand>() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("control socket: {}", e);
                continue;
            }
        };
        let mut reply = match command {
            ControlCommand::Action(action) => {
                tracing::debug!(%action, "user action from control socket");
                handle.user_action(action);
                continue;
            }
            ControlCommand::Status => {
                let Some(snapshot) = handle.snapshot().await else {
                    bail!("coordinator stopped");
                };
                serde_json::to_string(&snapshot)?
            }
            ControlCommand::Copy => match handle.copy_digest(Arc::clone(&writer)).await {
                Ok(copied) => copied.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!("copy to clipboard failed: {:#}", e);
                    format!("{}{:#}", COPY_ERROR_PREFIX, e)
                }
            },
        };
        reply.push('\n');
        write.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

async fn connect(socket_path: &Path) -> Result<UnixStream> {
    if !socket_path.exists() {
        bail!("hashmatch watch is not running (no socket at {})", socket_path.display());
    }
    UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("connect {}", socket_path.display()))
}

/// Send one command and return its single reply line.
async fn request(socket_path: &Path, command: ControlCommand) -> Result<String> {
    let stream = connect(socket_path).await?;
    let (read, mut write) = stream.into_split();
    write.write_all(format!("{}\n", command).as_bytes()).await?;
    let mut lines = BufReader::new(read).lines();
    let Some(line) = lines.next_line().await? else {
        bail!("control socket closed without a reply");
    };
    Ok(line)
}

/// Sends "<action>\n" to a running `hashmatch watch`.
pub async fn send_action(socket_path: &Path, action: UserAction) -> Result<()> {
    let mut stream = connect(socket_path).await?;
    let msg = format!("{}\n", ControlCommand::from(action));
    stream.write_all(msg.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Asks a running `hashmatch watch` for its current state.
pub async fn query_status(socket_path: &Path) -> Result<StatusSnapshot> {
    let line = request(socket_path, ControlCommand::Status).await?;
    serde_json::from_str(&line).context("parse status reply")
}

/// Asks a running `hashmatch watch` to copy the current digest to the
/// clipboard. `None` when it is not tracking a file.
pub async fn request_copy(socket_path: &Path) -> Result<Option<String>> {
    let line = request(socket_path, ControlCommand::Copy).await?;
    if let Some(reason) = line.strip_prefix(COPY_ERROR_PREFIX) {
        bail!("copy failed: {}", reason);
    }
    Ok(Some(line).filter(|digest| !digest.is_empty()))
}
