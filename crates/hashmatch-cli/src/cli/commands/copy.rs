//! `hashmatch copy` – have the running watcher put the current file's digest on the clipboard.

use anyhow::Result;

use crate::cli::control_socket;

pub async fn run_copy() -> Result<()> {
    let path = hashmatch_core::control::default_control_socket_path()?;
    match control_socket::request_copy(&path).await? {
        Some(digest) => println!("Copied {}", digest),
        None => println!("No file is being tracked."),
    }
    Ok(())
}
