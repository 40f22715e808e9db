//! CLI command handlers, one per file.

mod action;
mod checksum;
mod copy;
mod open_folder;
mod status;
mod watch;

pub use action::run_action;
pub use checksum::run_checksum;
pub use copy::run_copy;
pub use open_folder::run_open_folder;
pub use status::run_status;
pub use watch::run_watch;
