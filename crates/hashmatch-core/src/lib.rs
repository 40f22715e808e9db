pub mod config;
pub mod logging;

pub mod action;
pub mod candidate;
pub mod control;
pub mod coordinator;
pub mod digest;
pub mod observer;
pub mod registry;
pub mod sources;
pub mod state;

pub use action::{ControlCommand, UserAction};
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorHandle};
pub use digest::{Algorithm, DigestEngine, DigestError};
pub use observer::{LogObserver, Notice, VerificationObserver};
pub use registry::TrackedFile;
pub use state::{CoordinatorState, StatusSnapshot};
