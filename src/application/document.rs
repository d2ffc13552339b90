//! Host document contract.
//!
//! The render pipeline only needs to find an element by id, swap its inner
//! HTML, and manage `<style>` blocks in the document head. Hosts (a browser
//! bridge, the bundled [`InMemoryDocument`](crate::infra::document::InMemoryDocument),
//! a test double) implement [`Document`]. All calls are synchronous and are
//! expected to complete without suspending.

use thiserror::Error;

use crate::domain::mount::MountId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("mount point `{mount_id}` not found")]
    MountNotFound { mount_id: MountId },
}

pub trait Document: Send + Sync {
    /// Returns true when an element with `mount_id` currently exists.
    fn contains_mount(&self, mount_id: &MountId) -> bool;

    /// Replace the entire content of the mount point with `html`.
    fn replace_content(&self, mount_id: &MountId, html: &str) -> Result<(), DocumentError>;

    /// Returns true when a style block with `style_id` is present.
    fn has_style(&self, style_id: &str) -> bool;

    /// Append a style block. Implementations do not deduplicate; callers go
    /// through the style registrar.
    fn insert_style(&self, style_id: &str, css: &str);
}
