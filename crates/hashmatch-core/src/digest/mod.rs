//! Digest engine: every configured algorithm computed in one streamed pass.
//!
//! Downloaded images can be several GiB, so the file is read exactly once in
//! fixed-size chunks and each chunk is fed to all running hashers.

mod algorithm;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::TrackedFile;

pub use algorithm::{Algorithm, UnknownAlgorithm};

pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Why a file could not be digested. Both are terminal for the event.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("{} does not exist or is not a regular file", path.display())]
    NotFound { path: PathBuf },
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DigestError {
    pub fn path(&self) -> &Path {
        match self {
            DigestError::NotFound { path } | DigestError::Read { path, .. } => path,
        }
    }

    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            DigestError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DigestError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Result of one pass over a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSet {
    pub size_bytes: u64,
    pub digests: BTreeMap<Algorithm, String>,
}

enum RunningHash {
    Md5(md5::Context),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl RunningHash {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Md5 => RunningHash::Md5(md5::Context::new()),
            Algorithm::Sha1 => RunningHash::Sha1(Sha1::new()),
            Algorithm::Sha256 => RunningHash::Sha256(Sha256::new()),
            Algorithm::Sha512 => RunningHash::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            RunningHash::Md5(ctx) => ctx.consume(chunk),
            RunningHash::Sha1(h) => h.update(chunk),
            RunningHash::Sha256(h) => h.update(chunk),
            RunningHash::Sha512(h) => h.update(chunk),
        }
    }

    fn finish(self) -> String {
        match self {
            RunningHash::Md5(ctx) => hex::encode(ctx.compute().0),
            RunningHash::Sha1(h) => hex::encode(h.finalize()),
            RunningHash::Sha256(h) => hex::encode(h.finalize()),
            RunningHash::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Computes a fixed set of digests over whole files.
#[derive(Debug, Clone)]
pub struct DigestEngine {
    algorithms: Vec<Algorithm>,
    chunk_size: usize,
}

impl Default for DigestEngine {
    fn default() -> Self {
        Self {
            algorithms: Algorithm::ALL.to_vec(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl DigestEngine {
    /// Duplicate algorithms are collapsed. Every tracked file carries at least
    /// one digest, so an empty set is rejected, as is a zero chunk size.
    pub fn new(mut algorithms: Vec<Algorithm>, chunk_size: usize) -> Result<Self, ConfigError> {
        if algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }
        if chunk_size == 0 {
            return Err(ConfigError::Zero("chunk_size"));
        }
        algorithms.sort();
        algorithms.dedup();
        Ok(Self {
            algorithms,
            chunk_size,
        })
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    pub fn computes(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }

    /// Read `path` once and return one lowercase hex digest per algorithm.
    pub fn compute(&self, path: &Path) -> Result<DigestSet, DigestError> {
        let meta = std::fs::metadata(path).map_err(|e| DigestError::from_io(path, e))?;
        if !meta.is_file() {
            return Err(DigestError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut file = File::open(path).map_err(|e| DigestError::from_io(path, e))?;
        let mut hashers: Vec<(Algorithm, RunningHash)> = self
            .algorithms
            .iter()
            .map(|a| (*a, RunningHash::new(*a)))
            .collect();
        let mut buf = vec![0u8; self.chunk_size];
        let mut size_bytes = 0u64;
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DigestError::from_io(path, e)),
            };
            for (_, h) in hashers.iter_mut() {
                h.update(&buf[..n]);
            }
            size_bytes += n as u64;
        }

        let digests = hashers
            .into_iter()
            .map(|(a, h)| (a, h.finish()))
            .collect();
        Ok(DigestSet {
            size_bytes,
            digests,
        })
    }

    /// Digest `path` and wrap the result as the file to track.
    pub fn track(&self, path: &Path) -> Result<TrackedFile, DigestError> {
        let set = self.compute(path)?;
        let path = absolute(path);
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(TrackedFile {
            path,
            display_name,
            size_bytes: set.size_bytes,
            digests: set.digests,
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn empty_file_digests() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let set = DigestEngine::default().compute(f.path()).unwrap();
        assert_eq!(set.size_bytes, 0);
        assert_eq!(
            set.digests[&Algorithm::Sha256],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            set.digests[&Algorithm::Md5],
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            set.digests[&Algorithm::Sha1],
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(set.digests[&Algorithm::Sha512].len(), 128);
    }

    #[test]
    fn known_content_all_algorithms() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let set = DigestEngine::default().compute(f.path()).unwrap();
        assert_eq!(set.size_bytes, 6);
        assert_eq!(set.digests.len(), 4);
        assert_eq!(set.digests[&Algorithm::Sha256], HELLO_SHA256);
        assert_eq!(
            set.digests[&Algorithm::Md5],
            "b1946ac92492d2347c6235b4d2611184"
        );
        assert_eq!(
            set.digests[&Algorithm::Sha1],
            "f572d396fae9206628714fb2ce00f72e94f2258f"
        );
    }

    #[test]
    fn chunk_size_does_not_change_result() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let body: Vec<u8> = (0u8..=250).cycle().take(100_003).collect();
        f.write_all(&body).unwrap();
        f.flush().unwrap();
        let small = DigestEngine::new(Algorithm::ALL.to_vec(), 7)
            .unwrap()
            .compute(f.path())
            .unwrap();
        let large = DigestEngine::new(Algorithm::ALL.to_vec(), 1 << 20)
            .unwrap()
            .compute(f.path())
            .unwrap();
        assert_eq!(small, large);
        assert_eq!(small.size_bytes, 100_003);
    }

    #[test]
    fn repeated_reads_are_deterministic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"installer payload").unwrap();
        f.flush().unwrap();
        let engine = DigestEngine::default();
        assert_eq!(
            engine.compute(f.path()).unwrap(),
            engine.compute(f.path()).unwrap()
        );
    }

    #[test]
    fn only_configured_algorithms_are_returned() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let engine = DigestEngine::new(vec![Algorithm::Sha256, Algorithm::Sha256], 64).unwrap();
        assert_eq!(engine.algorithms(), &[Algorithm::Sha256]);
        assert!(engine.computes(Algorithm::Sha256));
        assert!(!engine.computes(Algorithm::Md5));
        let set = engine.compute(f.path()).unwrap();
        assert_eq!(set.digests.len(), 1);
        assert_eq!(set.digests[&Algorithm::Sha256], HELLO_SHA256);
    }

    #[test]
    fn empty_algorithm_set_is_rejected() {
        assert_eq!(
            DigestEngine::new(Vec::new(), DEFAULT_CHUNK_SIZE).unwrap_err(),
            ConfigError::NoAlgorithms
        );
        assert_eq!(
            DigestEngine::new(vec![Algorithm::Md5], 0).unwrap_err(),
            ConfigError::Zero("chunk_size")
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = DigestEngine::default()
            .compute(&dir.path().join("gone.iso"))
            .unwrap_err();
        assert!(matches!(err, DigestError::NotFound { .. }));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = DigestEngine::default().compute(dir.path()).unwrap_err();
        assert!(matches!(err, DigestError::NotFound { .. }));
        assert_eq!(err.path(), dir.path());
    }

    #[test]
    fn track_fills_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installer.exe");
        std::fs::write(&path, b"hello\n").unwrap();
        let file = DigestEngine::default().track(&path).unwrap();
        assert_eq!(file.display_name, "installer.exe");
        assert_eq!(file.size_bytes, 6);
        assert_eq!(file.path, path);
        assert_eq!(file.digest(Algorithm::Sha256), Some(HELLO_SHA256));
    }
}
