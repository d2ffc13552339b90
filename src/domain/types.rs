use std::fmt;

/// Lifecycle of a single mount point as seen by the render pipeline.
///
/// `Idle` until the first render, `Loading` while a render is in flight, and
/// either `Rendered` or `Error` once it completes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Loading,
    Rendered { html: String },
    Error { message: String },
}

impl RenderState {
    pub fn rendered(html: impl Into<String>) -> Self {
        Self::Rendered { html: html.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Rendered { .. } | Self::Error { .. })
    }

    /// HTML written by the last successful render, if any.
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Rendered { html } => Some(html.as_str()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Rendered { .. } => "rendered",
            Self::Error { .. } => "error",
        }
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
