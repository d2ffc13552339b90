use thiserror::Error;

use crate::domain::mount::MountId;

/// Rendering request built each time a render is triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Mount point that receives the output.
    pub mount_id: MountId,
    /// Raw markdown captured from the bound editor or a fixed string.
    pub source_text: String,
}

impl RenderRequest {
    pub fn new(mount_id: MountId, source_text: impl Into<String>) -> Self {
        Self {
            mount_id,
            source_text: source_text.into(),
        }
    }

    /// Empty and whitespace-only input renders the placeholder instead of markdown.
    pub fn is_blank(&self) -> bool {
        self.source_text.trim().is_empty()
    }
}

/// Options handed to the converter on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    /// Soft line breaks become `<br />`.
    pub breaks: bool,
    /// Tables, strikethrough, autolinks and task lists.
    pub gfm: bool,
    /// Run output through the sanitizer. Raw HTML passes through when false.
    pub sanitize: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            breaks: true,
            gfm: true,
            sanitize: false,
        }
    }
}

/// Failures scoped to a single render attempt. The pipeline turns these into
/// an error panel inside the mount point; they never reach the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("markdown converter unavailable: {message}")]
    ConverterLoad { message: String },
    #[error("markdown parsing failed: {message}")]
    Parse { message: String },
}

impl RenderError {
    pub fn converter_load(message: impl Into<String>) -> Self {
        Self::ConverterLoad {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConverterLoad { .. } => "converter_load",
            Self::Parse { .. } => "parse",
        }
    }
}

/// Markdown-to-HTML capability, treated as a black box by the pipeline.
pub trait Converter: Send + Sync {
    fn parse(&self, markdown: &str, options: &ConverterOptions) -> Result<String, RenderError>;
}

/// What a single `render` call did to its mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Converter output was written.
    Rendered,
    /// Input was blank; the "no content" placeholder was written.
    Placeholder,
    /// Conversion failed; the error panel was written.
    Failed,
    /// A newer render was issued for the mount before this one completed.
    Superseded,
    /// The mount point did not exist, or disappeared mid-render.
    MountMissing,
}

impl RenderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::Placeholder => "placeholder",
            Self::Failed => "failed",
            Self::Superseded => "superseded",
            Self::MountMissing => "mount_missing",
        }
    }

    /// True when this call's output is what the mount point now shows.
    pub fn wrote_output(&self) -> bool {
        matches!(self, Self::Rendered | Self::Placeholder | Self::Failed)
    }
}
