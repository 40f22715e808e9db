//! The single "current" downloaded file and its optional pending verification.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::digest::Algorithm;

/// A digested file. Immutable once built; shared by `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Absolute path.
    pub path: PathBuf,
    pub display_name: String,
    pub size_bytes: u64,
    /// Lowercase hex digest per algorithm, all from one read pass.
    pub digests: BTreeMap<Algorithm, String>,
}

impl TrackedFile {
    pub fn digest(&self, algorithm: Algorithm) -> Option<&str> {
        self.digests.get(&algorithm).map(String::as_str)
    }
}

/// Holds at most one current file. Owned by the state machine; no locking here.
#[derive(Debug, Default)]
pub struct TrackedFileRegistry {
    current: Option<Arc<TrackedFile>>,
    pending: Option<Arc<TrackedFile>>,
}

impl TrackedFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current file. Any pending verification is dropped with it.
    pub fn set_current(&mut self, file: TrackedFile) -> Arc<TrackedFile> {
        let file = Arc::new(file);
        self.current = Some(Arc::clone(&file));
        self.pending = None;
        file
    }

    pub fn current(&self) -> Option<&Arc<TrackedFile>> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.pending = None;
    }

    /// Mark the current file as awaiting a clipboard digest. Returns it, or
    /// `None` when nothing is tracked.
    pub fn begin_verification(&mut self) -> Option<Arc<TrackedFile>> {
        let current = Arc::clone(self.current.as_ref()?);
        self.pending = Some(Arc::clone(&current));
        Some(current)
    }

    pub fn pending(&self) -> Option<&Arc<TrackedFile>> {
        self.pending.as_ref()
    }

    pub fn clear_pending(&mut self) -> Option<Arc<TrackedFile>> {
        self.pending.take()
    }
}

#[cfg(test)]
pub(crate) fn sample_file(name: &str, sha256: &str) -> TrackedFile {
    let mut digests = BTreeMap::new();
    digests.insert(Algorithm::Sha256, sha256.to_string());
    TrackedFile {
        path: PathBuf::from("/downloads").join(name),
        display_name: name.to_string(),
        size_bytes: 32,
        digests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_current_replaces_and_clears_pending() {
        let mut reg = TrackedFileRegistry::new();
        reg.set_current(sample_file("a.iso", "aa"));
        let pending = reg.begin_verification().expect("current file");
        assert_eq!(pending.display_name, "a.iso");
        assert!(reg.pending().is_some());

        reg.set_current(sample_file("b.iso", "bb"));
        assert_eq!(reg.current().unwrap().display_name, "b.iso");
        assert!(reg.pending().is_none());
    }

    #[test]
    fn pending_shares_the_current_file() {
        let mut reg = TrackedFileRegistry::new();
        reg.set_current(sample_file("a.iso", "aa"));
        reg.begin_verification();
        assert!(Arc::ptr_eq(reg.current().unwrap(), reg.pending().unwrap()));
    }

    #[test]
    fn begin_verification_without_file_is_none() {
        let mut reg = TrackedFileRegistry::new();
        assert!(reg.begin_verification().is_none());
        assert!(reg.pending().is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let mut reg = TrackedFileRegistry::new();
        reg.set_current(sample_file("a.iso", "aa"));
        reg.begin_verification();
        reg.clear();
        assert!(reg.current().is_none());
        assert!(reg.pending().is_none());
    }

    #[test]
    fn digest_lookup() {
        let f = sample_file("a.iso", "aa");
        assert_eq!(f.digest(Algorithm::Sha256), Some("aa"));
        assert_eq!(f.digest(Algorithm::Md5), None);
    }
}
