use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, instrument, warn};

use crate::application::document::{Document, DocumentError};
use crate::application::render::loader::{BuiltinConverterLoader, ConverterCell, ConverterLoader};
use crate::application::render::markup;
use crate::application::render::runtime::{CommitOutcome, MountSlots};
use crate::application::render::styles::{StyleRegistry, StyleScope, Stylesheet};
use crate::application::render::types::{
    ConverterOptions, RenderError, RenderOutcome, RenderRequest,
};
use crate::config::{
    DEFAULT_CONTAINER_CLASS, DEFAULT_EMPTY_TEXT, DEFAULT_ERROR_LABEL, DEFAULT_LOADING_TEXT,
    RenderSettings,
};
use crate::domain::{mount::MountId, types::RenderState};

pub(crate) const METRIC_RENDER_TOTAL: &str = "markpane_render_total";
pub(crate) const METRIC_RENDER_MS: &str = "markpane_render_ms";

/// How stylesheets are scoped when mounts are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleMode {
    /// One stylesheet under `.<class>`; mounts are expected to carry the class.
    SharedClass(String),
    /// One stylesheet per mount under `#<mount id>`.
    PerMount,
}

/// Runtime configuration for the render pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    pub converter: ConverterOptions,
    pub style_mode: StyleMode,
    pub loading_text: String,
    pub empty_text: String,
    pub error_label: String,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            converter: ConverterOptions::default(),
            style_mode: StyleMode::SharedClass(DEFAULT_CONTAINER_CLASS.to_string()),
            loading_text: DEFAULT_LOADING_TEXT.to_string(),
            empty_text: DEFAULT_EMPTY_TEXT.to_string(),
            error_label: DEFAULT_ERROR_LABEL.to_string(),
        }
    }
}

impl From<&RenderSettings> for RenderPipelineConfig {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            converter: ConverterOptions {
                breaks: settings.breaks,
                gfm: settings.gfm,
                sanitize: settings.sanitize,
            },
            style_mode: StyleMode::SharedClass(settings.container_class.clone()),
            loading_text: settings.loading_text.clone(),
            empty_text: settings.empty_text.clone(),
            error_label: settings.error_label.clone(),
        }
    }
}

/// Shared state for every render against one document: the document itself,
/// the styles already injected into it, and the lazily loaded converter.
pub struct RenderContext {
    document: Arc<dyn Document>,
    styles: StyleRegistry,
    converter: ConverterCell,
}

impl RenderContext {
    pub fn new(document: Arc<dyn Document>, loader: Arc<dyn ConverterLoader>) -> Self {
        Self {
            document,
            styles: StyleRegistry::new(),
            converter: ConverterCell::new(loader),
        }
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn converter(&self) -> &ConverterCell {
        &self.converter
    }

    /// Inject `stylesheet` into this context's document once.
    pub fn ensure_styles(&self, stylesheet: &Stylesheet) {
        self.styles.ensure(self.document.as_ref(), stylesheet);
    }
}

/// Renders markdown into mount points of a single document.
///
/// `render` never fails: every outcome is written into the mount point
/// (output, placeholder or error panel) and reported as a [`RenderOutcome`].
pub struct RenderPipeline {
    context: RenderContext,
    config: RenderPipelineConfig,
    shared_stylesheet: Option<Stylesheet>,
    slots: MountSlots,
}

impl RenderPipeline {
    /// Pipeline backed by the built-in converter.
    pub fn new(document: Arc<dyn Document>, config: RenderPipelineConfig) -> Self {
        Self::with_loader(document, Arc::new(BuiltinConverterLoader), config)
    }

    pub fn with_loader(
        document: Arc<dyn Document>,
        loader: Arc<dyn ConverterLoader>,
        config: RenderPipelineConfig,
    ) -> Self {
        let shared_stylesheet = match &config.style_mode {
            StyleMode::SharedClass(class) => {
                Some(Stylesheet::markdown(&StyleScope::Class(class.clone())))
            }
            StyleMode::PerMount => None,
        };

        Self {
            context: RenderContext::new(document, loader),
            config,
            shared_stylesheet,
            slots: MountSlots::new(),
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn config(&self) -> &RenderPipelineConfig {
        &self.config
    }

    /// Stylesheet applied to `mount_id` under the configured style mode.
    pub fn stylesheet_for(&self, mount_id: &MountId) -> Stylesheet {
        match &self.shared_stylesheet {
            Some(sheet) => sheet.clone(),
            None => Stylesheet::markdown(&StyleScope::Mount(mount_id.clone())),
        }
    }

    /// Render `source_text` into `mount_id`.
    ///
    /// The mount shows the loading panel until the render settles. When
    /// several renders for one mount overlap, only the most recently started
    /// one writes its result.
    #[instrument(
        skip_all,
        fields(mount_id = %mount_id, bytes = source_text.len())
    )]
    pub async fn render(&self, mount_id: &MountId, source_text: &str) -> RenderOutcome {
        let started_at = Instant::now();
        let outcome = self.run(mount_id, source_text).await;

        counter!(METRIC_RENDER_TOTAL, "outcome" => outcome.as_str()).increment(1);
        histogram!(METRIC_RENDER_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(outcome = outcome.as_str(), "Render finished");

        outcome
    }

    pub async fn render_request(&self, request: &RenderRequest) -> RenderOutcome {
        self.render(&request.mount_id, &request.source_text).await
    }

    /// Last settled (or in-flight) state of `mount_id`. Unknown mounts are idle.
    pub fn state(&self, mount_id: &MountId) -> RenderState {
        self.slots.state(mount_id)
    }

    /// Drop bookkeeping for a mount whose UI was torn down.
    pub fn release(&self, mount_id: &MountId) -> bool {
        self.slots.release(mount_id)
    }

    async fn run(&self, mount_id: &MountId, source_text: &str) -> RenderOutcome {
        let document = self.context.document();
        if !document.contains_mount(mount_id) {
            debug!("Mount point missing; render skipped");
            return RenderOutcome::MountMissing;
        }

        let loading = markup::loading_panel(&self.config.loading_text);
        let ticket = match self
            .slots
            .begin(mount_id, || document.replace_content(mount_id, &loading))
        {
            Ok(ticket) => ticket,
            Err(DocumentError::MountNotFound { .. }) => return RenderOutcome::MountMissing,
        };

        self.context.ensure_styles(&self.stylesheet_for(mount_id));

        let (state, html, outcome) = match self.convert(source_text).await {
            Ok(Some(html)) => (
                RenderState::rendered(html.clone()),
                html,
                RenderOutcome::Rendered,
            ),
            Ok(None) => {
                let html = markup::empty_placeholder(&self.config.empty_text);
                (
                    RenderState::rendered(html.clone()),
                    html,
                    RenderOutcome::Placeholder,
                )
            }
            Err(err) => {
                warn!(
                    sequence = ticket.sequence(),
                    error_kind = err.kind(),
                    error = %err,
                    "Markdown render failed"
                );
                let message = err.to_string();
                let html = markup::error_panel(&self.config.error_label, &message);
                (RenderState::error(message), html, RenderOutcome::Failed)
            }
        };

        let sequence = ticket.sequence();
        match self
            .slots
            .commit(ticket, state, || document.replace_content(mount_id, &html))
        {
            CommitOutcome::Applied => outcome,
            CommitOutcome::Superseded => {
                debug!(sequence, "Newer render issued; result discarded");
                RenderOutcome::Superseded
            }
            CommitOutcome::MountMissing => {
                debug!(sequence, "Mount point removed mid-render");
                RenderOutcome::MountMissing
            }
        }
    }

    /// `Ok(None)` for blank input. The converter is loaded first either way.
    async fn convert(&self, source_text: &str) -> Result<Option<String>, RenderError> {
        let converter = self.context.converter().get().await?;
        if source_text.trim().is_empty() {
            return Ok(None);
        }
        converter
            .parse(source_text, &self.config.converter)
            .map(Some)
    }
}
