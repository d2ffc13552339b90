//! Render pipeline: markdown in, mount point content out.
//!
//! A render shows a loading panel, makes sure the markdown stylesheet is in
//! the document, loads the converter on first use and writes the converted
//! HTML (or a placeholder, or an error panel) into the mount point. Failures
//! stay local to the mount; callers only observe a [`RenderOutcome`].

mod loader;
mod markup;
mod pipeline;
mod runtime;
mod service;
mod styles;
mod types;

pub use loader::{BuiltinConverterLoader, ConverterCell, ConverterLoader};
pub use pipeline::{RenderContext, RenderPipeline, RenderPipelineConfig, StyleMode};
pub use runtime::{CommitOutcome, MountSlots, RenderTicket};
pub use service::ComrakConverter;
pub use styles::{StyleRegistry, StyleScope, Stylesheet};
pub use types::{Converter, ConverterOptions, RenderError, RenderOutcome, RenderRequest};
