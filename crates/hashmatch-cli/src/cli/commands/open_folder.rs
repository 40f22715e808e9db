//! `hashmatch open-folder` – open the folder holding the tracked file.

use anyhow::{bail, Context, Result};
use hashmatch_core::StatusSnapshot;
use std::path::{Path, PathBuf};

use crate::cli::control_socket;

pub async fn run_open_folder() -> Result<()> {
    let path = hashmatch_core::control::default_control_socket_path()?;
    let snapshot = control_socket::query_status(&path).await?;
    let Some(folder) = folder_of(&snapshot) else {
        println!("No file is being tracked.");
        return Ok(());
    };
    if !folder.is_dir() {
        bail!("{} no longer exists", folder.display());
    }
    let shown = folder.clone();
    tokio::task::spawn_blocking(move || reveal(&folder)).await??;
    println!("Opened {}", shown.display());
    Ok(())
}

fn folder_of(snapshot: &StatusSnapshot) -> Option<PathBuf> {
    snapshot
        .current
        .as_ref()
        .and_then(|f| f.path.parent())
        .map(Path::to_path_buf)
}

fn reveal(folder: &Path) -> Result<()> {
    let status = std::process::Command::new("xdg-open")
        .arg(folder)
        .spawn()
        .context("run xdg-open")?
        .wait()
        .context("wait for xdg-open")?;
    if !status.success() {
        bail!("xdg-open exited with {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashmatch_core::{CoordinatorState, TrackedFile};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn folder_is_the_parent_of_the_tracked_file() {
        let mut snap = StatusSnapshot {
            state: CoordinatorState::Idle,
            current: None,
            pending: false,
        };
        assert_eq!(folder_of(&snap), None);

        snap.state = CoordinatorState::FileDetected;
        snap.current = Some(Arc::new(TrackedFile {
            path: PathBuf::from("/home/me/Downloads/debian.iso"),
            display_name: "debian.iso".to_string(),
            size_bytes: 1,
            digests: BTreeMap::new(),
        }));
        assert_eq!(folder_of(&snap), Some(PathBuf::from("/home/me/Downloads")));
    }
}
