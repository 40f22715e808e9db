//! `hashmatch status` – show what the running watcher is tracking.

use anyhow::Result;
use hashmatch_core::StatusSnapshot;

use crate::cli::control_socket;
use crate::console::format_size;

pub async fn run_status(json: bool) -> Result<()> {
    let path = hashmatch_core::control::default_control_socket_path()?;
    let snapshot = control_socket::query_status(&path).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render(&snapshot));
    }
    Ok(())
}

fn render(snapshot: &StatusSnapshot) -> String {
    let state = serde_json::to_value(snapshot.state)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", snapshot.state));
    let mut out = format!("{:<10} {}\n", "STATE", state);
    match &snapshot.current {
        None => out.push_str(&format!("{:<10} -\n", "FILE")),
        Some(file) => {
            out.push_str(&format!(
                "{:<10} {} ({})\n",
                "FILE",
                file.display_name,
                format_size(file.size_bytes)
            ));
            out.push_str(&format!("{:<10} {}\n", "PATH", file.path.display()));
            for (alg, digest) in &file.digests {
                out.push_str(&format!("{:<10} {}\n", alg.as_str().to_uppercase(), digest));
            }
        }
    }
    if snapshot.pending {
        out.push_str("Waiting for a digest on the clipboard.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashmatch_core::{Algorithm, CoordinatorState, TrackedFile};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn render_idle() {
        let snap = StatusSnapshot {
            state: CoordinatorState::Idle,
            current: None,
            pending: false,
        };
        assert_eq!(render(&snap), "STATE      idle\nFILE       -\n");
    }

    #[test]
    fn render_awaiting_lists_digests() {
        let mut digests = BTreeMap::new();
        digests.insert(Algorithm::Sha256, "ab".repeat(32));
        let snap = StatusSnapshot {
            state: CoordinatorState::AwaitingVerification,
            current: Some(Arc::new(TrackedFile {
                path: PathBuf::from("/downloads/debian.iso"),
                display_name: "debian.iso".to_string(),
                size_bytes: 2048,
                digests,
            })),
            pending: true,
        };
        let text = render(&snap);
        assert!(text.starts_with("STATE      awaiting_verification\n"));
        assert!(text.contains("FILE       debian.iso (2.0 KB)\n"));
        assert!(text.contains(&format!("SHA256     {}\n", "ab".repeat(32))));
        assert!(text.ends_with("Waiting for a digest on the clipboard.\n"));
    }
}
