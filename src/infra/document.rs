//! In-process host document.
//!
//! Holds mount points and head style blocks in memory and can serialise the
//! whole thing into a standalone HTML page. Used by the command-line host and
//! throughout the test suite.

use std::sync::{
    RwLock,
    atomic::{AtomicU64, Ordering},
};

use crate::application::document::{Document, DocumentError};
use crate::domain::mount::MountId;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::document";
const PAGE_HEAD: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleNode {
    pub id: String,
    pub css: String,
}

#[derive(Debug, Clone)]
struct MountElement {
    id: MountId,
    class: Option<String>,
    inner_html: String,
}

#[derive(Debug, Default)]
struct DocumentTree {
    styles: Vec<StyleNode>,
    mounts: Vec<MountElement>,
}

impl DocumentTree {
    fn mount(&self, mount_id: &MountId) -> Option<&MountElement> {
        self.mounts.iter().find(|element| &element.id == mount_id)
    }

    fn mount_mut(&mut self, mount_id: &MountId) -> Option<&mut MountElement> {
        self.mounts
            .iter_mut()
            .find(|element| &element.id == mount_id)
    }
}

/// Document kept entirely in memory.
///
/// Every mutation bumps [`revision`](Self::revision) so observers can tell
/// when a re-serialisation is due.
pub struct InMemoryDocument {
    title: String,
    tree: RwLock<DocumentTree>,
    revision: AtomicU64,
}

impl InMemoryDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tree: RwLock::new(DocumentTree::default()),
            revision: AtomicU64::new(0),
        }
    }

    /// Create an empty mount point. Returns false when the id is already taken.
    pub fn mount(&self, mount_id: &MountId) -> bool {
        self.mount_with_class(mount_id, None::<String>)
    }

    pub fn mount_with_class(&self, mount_id: &MountId, class: Option<impl Into<String>>) -> bool {
        let mut tree = rw_write(&self.tree, SOURCE, "mount");
        if tree.mount(mount_id).is_some() {
            return false;
        }
        tree.mounts.push(MountElement {
            id: mount_id.clone(),
            class: class.map(Into::into),
            inner_html: String::new(),
        });
        self.bump();
        true
    }

    /// Remove a mount point. Returns false when it did not exist.
    pub fn unmount(&self, mount_id: &MountId) -> bool {
        let mut tree = rw_write(&self.tree, SOURCE, "unmount");
        let before = tree.mounts.len();
        tree.mounts.retain(|element| &element.id != mount_id);
        let removed = tree.mounts.len() != before;
        if removed {
            self.bump();
        }
        removed
    }

    pub fn inner_html(&self, mount_id: &MountId) -> Option<String> {
        rw_read(&self.tree, SOURCE, "inner_html")
            .mount(mount_id)
            .map(|element| element.inner_html.clone())
    }

    /// Number of style blocks carrying `style_id`.
    pub fn style_count(&self, style_id: &str) -> usize {
        rw_read(&self.tree, SOURCE, "style_count")
            .styles
            .iter()
            .filter(|node| node.id == style_id)
            .count()
    }

    pub fn styles(&self) -> Vec<StyleNode> {
        rw_read(&self.tree, SOURCE, "styles").styles.clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Serialise the document as a standalone HTML page.
    pub fn to_html_page(&self) -> String {
        let tree = rw_read(&self.tree, SOURCE, "to_html_page");
        let mut page = String::from(PAGE_HEAD);
        page.push_str(&format!(
            "<title>{}</title>\n",
            ammonia::clean_text(&self.title)
        ));
        for node in &tree.styles {
            page.push_str(&format!(
                "<style id=\"{}\">{}</style>\n",
                ammonia::clean_text(&node.id),
                node.css
            ));
        }
        page.push_str("</head>\n<body>\n");
        for element in &tree.mounts {
            let class_attr = element
                .class
                .as_deref()
                .map(|class| format!(" class=\"{}\"", ammonia::clean_text(class)))
                .unwrap_or_default();
            page.push_str(&format!(
                "<div id=\"{}\"{class_attr}>{}</div>\n",
                ammonia::clean_text(element.id.as_str()),
                element.inner_html
            ));
        }
        page.push_str("</body>\n</html>\n");
        page
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for InMemoryDocument {
    fn default() -> Self {
        Self::new("markpane")
    }
}

impl Document for InMemoryDocument {
    fn contains_mount(&self, mount_id: &MountId) -> bool {
        rw_read(&self.tree, SOURCE, "contains_mount")
            .mount(mount_id)
            .is_some()
    }

    fn replace_content(&self, mount_id: &MountId, html: &str) -> Result<(), DocumentError> {
        let mut tree = rw_write(&self.tree, SOURCE, "replace_content");
        let element = tree
            .mount_mut(mount_id)
            .ok_or_else(|| DocumentError::MountNotFound {
                mount_id: mount_id.clone(),
            })?;
        element.inner_html = html.to_string();
        self.bump();
        Ok(())
    }

    fn has_style(&self, style_id: &str) -> bool {
        rw_read(&self.tree, SOURCE, "has_style")
            .styles
            .iter()
            .any(|node| node.id == style_id)
    }

    fn insert_style(&self, style_id: &str, css: &str) {
        rw_write(&self.tree, SOURCE, "insert_style")
            .styles
            .push(StyleNode {
                id: style_id.to_string(),
                css: css.to_string(),
            });
        self.bump();
    }
}
