//! Outbound interface: what the coordinator tells notification/tray collaborators.

use std::collections::BTreeMap;

use crate::digest::Algorithm;

/// Subscriber for coordinator outcomes. Called from the coordinator task, one
/// outcome at a time, in transition order. Implementations must not block.
pub trait VerificationObserver: Send + Sync {
    fn on_file_detected(&self, name: &str, size_bytes: u64, digests: &BTreeMap<Algorithm, String>);
    fn on_awaiting_verification(&self);
    fn on_verified(&self, name: &str);
    /// `expected` is the clipboard value, `actual` the file's digest.
    fn on_failed(&self, name: &str, expected: &str, actual: &str);
    fn on_reset(&self);
}

/// One outcome of a transition, in the order it should be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    FileDetected {
        name: String,
        size_bytes: u64,
        digests: BTreeMap<Algorithm, String>,
    },
    AwaitingVerification,
    Verified {
        name: String,
    },
    Failed {
        name: String,
        expected: String,
        actual: String,
    },
    Reset,
}

impl Notice {
    pub fn deliver(&self, observer: &dyn VerificationObserver) {
        match self {
            Notice::FileDetected {
                name,
                size_bytes,
                digests,
            } => observer.on_file_detected(name, *size_bytes, digests),
            Notice::AwaitingVerification => observer.on_awaiting_verification(),
            Notice::Verified { name } => observer.on_verified(name),
            Notice::Failed {
                name,
                expected,
                actual,
            } => observer.on_failed(name, expected, actual),
            Notice::Reset => observer.on_reset(),
        }
    }
}

/// Observer that only writes outcomes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl VerificationObserver for LogObserver {
    fn on_file_detected(&self, name: &str, size_bytes: u64, digests: &BTreeMap<Algorithm, String>) {
        let sha256 = digests.get(&Algorithm::Sha256).map(String::as_str).unwrap_or("-");
        tracing::info!(name, size_bytes, sha256, "file detected");
    }

    fn on_awaiting_verification(&self) {
        tracing::info!("awaiting digest on clipboard");
    }

    fn on_verified(&self, name: &str) {
        tracing::info!(name, "digest matches");
    }

    fn on_failed(&self, name: &str, expected: &str, actual: &str) {
        tracing::warn!(name, expected, actual, "digest mismatch");
    }

    fn on_reset(&self) {
        tracing::debug!("verification state reset");
    }
}
