//! Shared helpers: an observer that records coordinator outcomes into a channel.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use hashmatch_core::coordinator::{Coordinator, CoordinatorConfig, CoordinatorHandle};
use hashmatch_core::{Algorithm, Notice, VerificationObserver};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct RecordingObserver {
    tx: mpsc::UnboundedSender<Notice>,
}

impl VerificationObserver for RecordingObserver {
    fn on_file_detected(&self, name: &str, size_bytes: u64, digests: &BTreeMap<Algorithm, String>) {
        let _ = self.tx.send(Notice::FileDetected {
            name: name.to_string(),
            size_bytes,
            digests: digests.clone(),
        });
    }

    fn on_awaiting_verification(&self) {
        let _ = self.tx.send(Notice::AwaitingVerification);
    }

    fn on_verified(&self, name: &str) {
        let _ = self.tx.send(Notice::Verified {
            name: name.to_string(),
        });
    }

    fn on_failed(&self, name: &str, expected: &str, actual: &str) {
        let _ = self.tx.send(Notice::Failed {
            name: name.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    fn on_reset(&self) {
        let _ = self.tx.send(Notice::Reset);
    }
}

pub struct Harness {
    pub handle: CoordinatorHandle,
    pub task: JoinHandle<()>,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

impl Harness {
    pub fn start(reset_delay: Duration) -> Self {
        let (tx, notices) = mpsc::unbounded_channel();
        let config = CoordinatorConfig::default().with_reset_delay(reset_delay);
        let (handle, task) = Coordinator::spawn(config, Arc::new(RecordingObserver { tx }));
        Self {
            handle,
            task,
            notices,
        }
    }

    /// Next notice, failing the test if none arrives within `wait`.
    pub async fn next(&mut self, wait: Duration) -> Notice {
        tokio::time::timeout(wait, self.notices.recv())
            .await
            .expect("timed out waiting for a notice")
            .expect("observer channel closed")
    }

    /// Assert nothing is delivered for `wait`.
    pub async fn quiet_for(&mut self, wait: Duration) {
        if let Ok(Some(n)) = tokio::time::timeout(wait, self.notices.recv()).await {
            panic!("unexpected notice {:?}", n);
        }
    }
}

pub fn sha256_of(notice: &Notice) -> String {
    match notice {
        Notice::FileDetected { digests, .. } => digests[&Algorithm::Sha256].clone(),
        other => panic!("expected FileDetected, got {:?}", other),
    }
}
