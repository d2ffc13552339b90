//! Style registrar: injects each stylesheet into the document at most once.

use std::collections::HashSet;
use std::sync::Mutex;

use metrics::counter;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::application::document::Document;
use crate::domain::mount::MountId;
use crate::infra::lock::mutex_lock;

pub(crate) const METRIC_STYLES_INJECTED_TOTAL: &str = "markpane_styles_injected_total";

const STYLE_ID_PREFIX: &str = "markdown-styles-";
const STYLE_ID_HASH_LEN: usize = 12;
const SCOPE_TOKEN: &str = "{scope}";
const REGISTRY_SOURCE: &str = "application::render::styles";

const MARKDOWN_CSS_TEMPLATE: &str = r#"{scope} {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    line-height: 1.6;
    color: var(--gray-12, #1a1a1a);
}
{scope} .loading {
    display: flex;
    align-items: center;
    justify-content: center;
    padding: 2rem;
    color: var(--gray-11, #666);
}
{scope} .empty {
    color: var(--gray-9, #999);
    font-style: italic;
}
{scope} .error {
    padding: 1rem;
    background-color: var(--red-3, #ffe6e6);
    border: 1px solid var(--red-6, #ff9999);
    border-radius: var(--radius-2, 4px);
    color: var(--red-11, #cc0000);
}
{scope} h1 {
    font-size: 2rem;
    font-weight: 700;
    margin: 1.5rem 0 1rem 0;
    border-bottom: 2px solid var(--gray-6, #e0e0e0);
    padding-bottom: 0.5rem;
}
{scope} h2 {
    font-size: 1.5rem;
    font-weight: 600;
    margin: 1.25rem 0 0.75rem 0;
}
{scope} h3 {
    font-size: 1.25rem;
    font-weight: 600;
    margin: 1rem 0 0.5rem 0;
}
{scope} h4 {
    font-size: 1.1rem;
    font-weight: 600;
    margin: 0.75rem 0 0.5rem 0;
}
{scope} p {
    margin: 0.75rem 0;
    line-height: 1.7;
}
{scope} ul, {scope} ol {
    margin: 0.75rem 0;
    padding-left: 2rem;
}
{scope} li {
    margin: 0.25rem 0;
}
{scope} pre {
    background-color: var(--gray-3, #f5f5f5);
    border: 1px solid var(--gray-6, #e0e0e0);
    border-radius: var(--radius-2, 4px);
    padding: 1rem;
    overflow-x: auto;
    margin: 1rem 0;
}
{scope} code {
    background-color: var(--gray-3, #f5f5f5);
    padding: 0.2rem 0.4rem;
    border-radius: var(--radius-1, 2px);
    font-family: 'Monaco', 'Menlo', 'Ubuntu Mono', monospace;
    font-size: 0.9em;
}
{scope} pre code {
    background-color: transparent;
    padding: 0;
}
{scope} blockquote {
    border-left: 4px solid var(--blue-6, #0066cc);
    margin: 1rem 0;
    padding: 0.5rem 1rem;
    background-color: var(--blue-2, #f0f8ff);
}
{scope} table {
    border-collapse: collapse;
    width: 100%;
    margin: 1rem 0;
}
{scope} th, {scope} td {
    border: 1px solid var(--gray-6, #e0e0e0);
    padding: 0.5rem;
    text-align: left;
}
{scope} th {
    background-color: var(--gray-3, #f5f5f5);
    font-weight: 600;
}
{scope} hr {
    border: none;
    height: 1px;
    background-color: var(--gray-6, #e0e0e0);
    margin: 2rem 0;
}
{scope} a {
    color: var(--blue-9, #0066cc);
    text-decoration: none;
}
{scope} a:hover {
    text-decoration: underline;
}
{scope} thinking {
    display: block;
    background-color: var(--yellow-3, #fff8e1);
    border: 1px solid var(--yellow-6, #ffcc02);
    border-radius: var(--radius-2, 4px);
    padding: 0.75rem;
    margin: 1rem 0;
    font-style: italic;
    opacity: 0.8;
}
"#;

/// Selector every markdown rule is nested under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StyleScope {
    /// `#<mount id>`; one stylesheet per mount point.
    Mount(MountId),
    /// `.<class>`; one stylesheet shared by every mount carrying the class.
    Class(String),
}

impl StyleScope {
    pub fn selector(&self) -> String {
        match self {
            Self::Mount(mount_id) => format!("#{mount_id}"),
            Self::Class(class) => format!(".{class}"),
        }
    }
}

/// A `<style>` block identified by a stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    id: String,
    css: String,
}

impl Stylesheet {
    /// Build a stylesheet whose id is derived from the CSS text, so identical
    /// CSS always maps to the same id.
    pub fn new(css: impl Into<String>) -> Self {
        let css = css.into();
        Self {
            id: derive_style_id(&css),
            css,
        }
    }

    /// Typography, code, table, blockquote, link and `<thinking>` rules for
    /// rendered markdown, scoped under `scope`.
    pub fn markdown(scope: &StyleScope) -> Self {
        let selector = scope.selector();
        Self::new(MARKDOWN_CSS_TEMPLATE.replace(SCOPE_TOKEN, &selector))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn css(&self) -> &str {
        &self.css
    }
}

fn derive_style_id(css: &str) -> String {
    let digest = hex::encode(Sha256::digest(css.as_bytes()));
    format!("{STYLE_ID_PREFIX}{}", &digest[..STYLE_ID_HASH_LEN])
}

/// Ids already known to be present in the document.
///
/// Both the registry and the document are consulted, so a style placed by
/// another party is never duplicated either.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    injected: Mutex<HashSet<String>>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `css` under `style_id` unless a style with that id already
    /// exists. Idempotent; concurrent callers inject at most one block.
    pub fn ensure_styles(&self, document: &dyn Document, style_id: &str, css: &str) {
        let mut injected = mutex_lock(&self.injected, REGISTRY_SOURCE, "ensure_styles");
        if injected.contains(style_id) {
            return;
        }

        if !document.has_style(style_id) {
            document.insert_style(style_id, css);
            counter!(METRIC_STYLES_INJECTED_TOTAL).increment(1);
            debug!(
                target = "markpane::render::styles",
                style_id, "Stylesheet injected"
            );
        }
        injected.insert(style_id.to_string());
    }

    pub fn ensure(&self, document: &dyn Document, stylesheet: &Stylesheet) {
        self.ensure_styles(document, stylesheet.id(), stylesheet.css());
    }

    pub fn contains(&self, style_id: &str) -> bool {
        mutex_lock(&self.injected, REGISTRY_SOURCE, "contains").contains(style_id)
    }
}
