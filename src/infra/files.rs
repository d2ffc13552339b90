//! Filesystem adapters for the CLI: a polled markdown file and the preview
//! page it renders into.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::watch::TextSource;

use super::error::InfraError;

/// Markdown file read from disk on every poll tick.
///
/// Read failures (file briefly missing while an editor swaps it, permission
/// hiccups) skip the tick instead of rendering an empty document.
#[derive(Debug, Clone)]
pub struct FileTextSource {
    path: PathBuf,
}

impl FileTextSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSource for FileTextSource {
    fn read(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Some(text),
            Err(err) => {
                debug!(
                    target = "markpane::infra::files",
                    path = %self.path.display(),
                    error = %err,
                    "Source file unreadable; tick skipped"
                );
                None
            }
        }
    }
}

/// Replace `path` with `contents` via a sibling temp file and a rename, so a
/// browser reloading the page never sees a half-written file.
pub async fn write_page(path: &Path, contents: &str) -> Result<(), InfraError> {
    let staging = staging_path(path);
    tokio::fs::write(&staging, contents).await?;
    tokio::fs::rename(&staging, path).await?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Page title derived from the source file name.
pub fn title_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "markpane".to_string())
}
