use std::sync::Arc;

use tokio::sync::watch;

/// Something whose current text can be read on every poll tick.
pub trait TextSource: Send + Sync + 'static {
    /// Current text, or `None` when it cannot be read right now. A `None`
    /// tick is skipped; it does not count as a change.
    fn read(&self) -> Option<String>;
}

/// Adapts a closure into a [`TextSource`].
pub struct FnSource<F>(F);

/// Poll `read` on every tick.
pub fn from_fn<F>(read: F) -> FnSource<F>
where
    F: Fn() -> String + Send + Sync + 'static,
{
    FnSource(read)
}

impl<F> TextSource for FnSource<F>
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn read(&self) -> Option<String> {
        Some((self.0)())
    }
}

/// Observable text value, the push-based alternative to polling.
///
/// Clones share the same value. Watchers started with
/// [`ChangeWatcher::watch_binding`](super::ChangeWatcher::watch_binding) wake on
/// every [`set`](Self::set) instead of on a timer.
#[derive(Clone)]
pub struct TextBinding {
    sender: Arc<watch::Sender<String>>,
}

impl TextBinding {
    pub fn new(initial: impl Into<String>) -> Self {
        let (sender, _receiver) = watch::channel(initial.into());
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn set(&self, text: impl Into<String>) {
        self.sender.send_replace(text.into());
    }

    pub fn get(&self) -> String {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Default for TextBinding {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl TextSource for TextBinding {
    fn read(&self) -> Option<String> {
        Some(self.get())
    }
}
