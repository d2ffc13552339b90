//! Change watcher: re-renders a mount point whenever its source text changes.

mod detector;
mod registry;
mod source;

pub use detector::ChangeDetector;
pub use registry::{ChangeWatcher, WatchError, WatchGuard, WatchMode, WatchStatus};
pub use source::{FnSource, TextBinding, TextSource, from_fn};
