//! Verification state machine.
//!
//! Pure and synchronous: the coordinator task feeds it one input at a time and
//! carries out the returned `Step` (deliver notices, arm or cancel the reset
//! timer). Keeping timers out of here lets every transition be tested without
//! a runtime.


use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::UserAction;
use crate::candidate::CandidateDetector;
use crate::digest::{Algorithm, DigestError};
use crate::observer::Notice;
use crate::registry::{TrackedFile, TrackedFileRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    FileDetected,
    AwaitingVerification,
    Verified,
    Failed,
}

impl CoordinatorState {
    /// `Verified` and `Failed` only last until the reset timer or the next event.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoordinatorState::Verified | CoordinatorState::Failed)
    }
}

/// Everything that can drive a transition.
#[derive(Debug)]
pub enum Input {
    /// Result of digesting a file the watcher reported as complete.
    FileReady(Result<TrackedFile, DigestError>),
    ClipboardChanged(String),
    /// The application is about to put this text on the clipboard itself.
    ClipboardWritten(String),
    UserAction(UserAction),
    /// The reset timer armed with this epoch fired.
    ResetElapsed(u64),
}

/// What the caller must do with the reset timer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetTimer {
    #[default]
    Unchanged,
    Cancel,
    /// Arm a new timer; when it fires, feed back `Input::ResetElapsed(epoch)`.
    Schedule(u64),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub notices: Vec<Notice>,
    pub timer: ResetTimer,
}

/// Point-in-time view for status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: CoordinatorState,
    pub current: Option<Arc<TrackedFile>>,
    pub pending: bool,
}

#[derive(Debug)]
pub struct VerificationMachine {
    state: CoordinatorState,
    registry: TrackedFileRegistry,
    compare: Algorithm,
    detector: CandidateDetector,
    reset_epoch: u64,
    /// Lowercased text of our own pending clipboard write.
    own_write: Option<String>,
}

impl Default for VerificationMachine {
    fn default() -> Self {
        Self::new(Algorithm::Sha256)
    }
}

impl VerificationMachine {
    /// `compare` selects which digest a clipboard value is checked against;
    /// the candidate length follows it.
    pub fn new(compare: Algorithm) -> Self {
        Self {
            state: CoordinatorState::Idle,
            registry: TrackedFileRegistry::new(),
            compare,
            detector: CandidateDetector::for_algorithm(compare),
            reset_epoch: 0,
            own_write: None,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn current(&self) -> Option<&Arc<TrackedFile>> {
        self.registry.current()
    }

    pub fn pending(&self) -> Option<&Arc<TrackedFile>> {
        self.registry.pending()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            current: self.registry.current().cloned(),
            pending: self.registry.pending().is_some(),
        }
    }

    pub fn apply(&mut self, input: Input) -> Step {
        let mut step = Step::default();
        match input {
            Input::ResetElapsed(epoch) => {
                if self.state.is_transient() && epoch == self.reset_epoch {
                    self.reset(&mut step);
                } else {
                    tracing::trace!(epoch, current = self.reset_epoch, "stale reset timer");
                }
            }
            Input::FileReady(Err(e)) => {
                // A file that cannot be read is never tracked; nothing else changes.
                tracing::warn!(path = %e.path().display(), "dropping file: {}", e);
            }
            Input::FileReady(Ok(file)) => {
                self.leave_transient(&mut step);
                self.file_ready(file, &mut step);
            }
            Input::ClipboardWritten(text) => {
                self.own_write = Some(text.trim().to_ascii_lowercase());
            }
            Input::ClipboardChanged(text) => {
                // Only the very next change can be the echo of our own write.
                let own = self.own_write.take();
                if own.as_deref() == Some(text.trim().to_ascii_lowercase().as_str()) {
                    tracing::debug!("clipboard echo of our own copy ignored");
                } else {
                    self.leave_transient(&mut step);
                    self.clipboard_changed(&text, &mut step);
                }
            }
            Input::UserAction(action) => {
                self.leave_transient(&mut step);
                self.user_action(action, &mut step);
            }
        }
        debug_assert!(self.invariants_hold(), "broken invariant in {:?}", self.state);
        step
    }

    fn leave_transient(&mut self, step: &mut Step) {
        if self.state.is_transient() {
            self.reset(step);
        }
    }

    fn reset(&mut self, step: &mut Step) {
        self.registry.clear_pending();
        self.state = self.resting_state();
        step.notices.push(Notice::Reset);
        step.timer = ResetTimer::Cancel;
    }

    fn resting_state(&self) -> CoordinatorState {
        if self.registry.current().is_some() {
            CoordinatorState::FileDetected
        } else {
            CoordinatorState::Idle
        }
    }

    fn file_ready(&mut self, file: TrackedFile, step: &mut Step) {
        if let Some(old) = self.registry.pending() {
            tracing::info!(
                superseded = %old.display_name,
                by = %file.display_name,
                "newer file cancels pending verification"
            );
        }
        let file = self.registry.set_current(file);
        self.state = CoordinatorState::FileDetected;
        step.notices.push(Notice::FileDetected {
            name: file.display_name.clone(),
            size_bytes: file.size_bytes,
            digests: file.digests.clone(),
        });
    }

    fn clipboard_changed(&mut self, text: &str, step: &mut Step) {
        if self.state != CoordinatorState::AwaitingVerification {
            tracing::trace!(state = ?self.state, "clipboard change ignored");
            return;
        }
        if !self.detector.is_candidate(text) {
            return;
        }
        let Some(pending) = self.registry.clear_pending() else {
            self.state = self.resting_state();
            return;
        };

        let expected = text.trim();
        let actual = pending.digest(self.compare).unwrap_or_default();
        if actual.eq_ignore_ascii_case(expected) {
            self.state = CoordinatorState::Verified;
            step.notices.push(Notice::Verified {
                name: pending.display_name.clone(),
            });
        } else {
            self.state = CoordinatorState::Failed;
            step.notices.push(Notice::Failed {
                name: pending.display_name.clone(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        self.reset_epoch += 1;
        step.timer = ResetTimer::Schedule(self.reset_epoch);
    }

    fn user_action(&mut self, action: UserAction, step: &mut Step) {
        use CoordinatorState::*;
        match (action, self.state) {
            (UserAction::RequestVerify, FileDetected) => {
                if self.registry.begin_verification().is_some() {
                    self.state = AwaitingVerification;
                    step.notices.push(Notice::AwaitingVerification);
                }
            }
            (UserAction::RequestVerify, AwaitingVerification) => {
                tracing::debug!("verification already pending");
            }
            (UserAction::RequestVerify, _) => {
                tracing::debug!(state = ?self.state, "no file to verify");
            }
            (UserAction::Ignore, FileDetected | AwaitingVerification) => {
                self.registry.clear();
                self.state = Idle;
                step.notices.push(Notice::Reset);
            }
            (UserAction::Dismiss, AwaitingVerification) => {
                self.registry.clear_pending();
                self.state = FileDetected;
                step.notices.push(Notice::Reset);
            }
            (UserAction::Ignore | UserAction::Dismiss, _) => {}
        }
    }

    fn invariants_hold(&self) -> bool {
        let pending_ok = match (self.state, self.registry.pending()) {
            (CoordinatorState::AwaitingVerification, Some(p)) => self
                .registry
                .current()
                .is_some_and(|c| Arc::ptr_eq(c, p)),
            (CoordinatorState::AwaitingVerification, None) => false,
            (_, pending) => pending.is_none(),
        };
        let current_ok = match self.state {
            CoordinatorState::Idle => self.registry.current().is_none(),
            CoordinatorState::FileDetected | CoordinatorState::AwaitingVerification => {
                self.registry.current().is_some()
            }
            CoordinatorState::Verified | CoordinatorState::Failed => true,
        };
        pending_ok && current_ok
    }
}
