//! Producers feeding the coordinator: download folder watcher and clipboard poller.

pub mod clipboard;
pub mod watcher;

pub use clipboard::{
    spawn_clipboard_poller, ClipboardReader, ClipboardSample, ClipboardWriter, CommandClipboard,
    CommandClipboardWriter,
};
pub use watcher::{DownloadFilter, DownloadWatcher, Settling};
