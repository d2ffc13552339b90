/// Remembers the last text a watcher rendered.
///
/// Starts with nothing seen, so the first observation always counts as a
/// change. Empty text is a real value: going from content to empty is a change.
#[derive(Debug, Default, Clone)]
pub struct ChangeDetector {
    last_seen: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` and report whether it differs from the previous observation.
    pub fn observe(&mut self, text: &str) -> bool {
        if self.last_seen.as_deref() == Some(text) {
            return false;
        }
        self.last_seen = Some(text.to_owned());
        true
    }

    #[cfg(test)]
    fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }
}
