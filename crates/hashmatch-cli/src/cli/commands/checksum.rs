//! Checksum command: print every configured digest of a file.

use anyhow::Result;
use hashmatch_core::config::HashmatchConfig;
use std::path::Path;

/// One line per algorithm, `sha256sum`-style after the algorithm name.
pub async fn run_checksum(cfg: &HashmatchConfig, path: &Path) -> Result<()> {
    let engine = cfg.digest_engine()?;
    let owned = path.to_path_buf();
    let set = tokio::task::spawn_blocking(move || engine.compute(&owned)).await??;
    for (alg, digest) in &set.digests {
        println!("{:<7} {}  {}", alg, digest, path.display());
    }
    Ok(())
}
