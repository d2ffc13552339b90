use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ammonia::clean_text;
use async_trait::async_trait;
use markpane::application::document::Document;
use markpane::application::render::{
    ComrakConverter, Converter, ConverterLoader, ConverterOptions, RenderError, RenderOutcome,
    RenderPipeline, RenderPipelineConfig, RenderRequest, Stylesheet, StyleScope,
};
use markpane::domain::{mount::MountId, types::RenderState};
use markpane::infra::document::InMemoryDocument;
use tokio::sync::Semaphore;

const CONTAINER_CLASS: &str = "markdown-container";

fn mount_id(id: &str) -> MountId {
    MountId::new(id).expect("valid mount id")
}

fn document_with(mounts: &[&str]) -> Arc<InMemoryDocument> {
    let document = Arc::new(InMemoryDocument::new("test"));
    for id in mounts {
        document.mount_with_class(&mount_id(id), Some(CONTAINER_CLASS));
    }
    document
}

fn shared_stylesheet() -> Stylesheet {
    Stylesheet::markdown(&StyleScope::Class(CONTAINER_CLASS.to_string()))
}

/// Loader that counts attempts, optionally fails the first few, and can be
/// held open until the test releases it.
struct ScriptedLoader {
    attempts: AtomicUsize,
    failures: usize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedLoader {
    fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            failures: 0,
            gate: None,
        }
    }

    fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::new()
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConverterLoader for ScriptedLoader {
    async fn load(&self) -> Result<Arc<dyn Converter>, RenderError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate open");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(RenderError::converter_load("network down"));
        }
        Ok(Arc::new(ComrakConverter::new()))
    }
}

struct BrokenConverter;

impl Converter for BrokenConverter {
    fn parse(&self, _markdown: &str, _options: &ConverterOptions) -> Result<String, RenderError> {
        Err(RenderError::parse("unbalanced input"))
    }
}

struct BrokenLoader;

#[async_trait]
impl ConverterLoader for BrokenLoader {
    async fn load(&self) -> Result<Arc<dyn Converter>, RenderError> {
        Ok(Arc::new(BrokenConverter))
    }
}

#[tokio::test]
async fn renders_markdown_into_mount() {
    let document = document_with(&["preview"]);
    let pipeline = RenderPipeline::new(document.clone(), RenderPipelineConfig::default());
    let preview = mount_id("preview");

    let outcome = pipeline.render(&preview, "# Hi\n\n**bold**").await;

    assert_eq!(outcome, RenderOutcome::Rendered);
    let html = document.inner_html(&preview).expect("mount exists");
    insta::assert_snapshot!(html, @r"
    <h1>Hi</h1>
    <p><strong>bold</strong></p>
    ");
    assert_eq!(pipeline.state(&preview), RenderState::rendered(html));
    assert_eq!(document.style_count(shared_stylesheet().id()), 1);
}

#[tokio::test]
async fn style_block_is_injected_once_across_mounts_and_renders() {
    let document = document_with(&["left", "right"]);
    let pipeline = RenderPipeline::new(document.clone(), RenderPipelineConfig::default());

    pipeline.render(&mount_id("left"), "one").await;
    pipeline.render(&mount_id("right"), "two").await;
    pipeline.render(&mount_id("left"), "three").await;

    assert_eq!(document.styles().len(), 1);
    assert_eq!(document.style_count(shared_stylesheet().id()), 1);
    let registry = pipeline.context().styles();
    assert!(registry.contains(shared_stylesheet().id()));
}

#[tokio::test]
async fn blank_input_renders_placeholder() {
    let document = document_with(&["preview"]);
    let pipeline = RenderPipeline::new(document.clone(), RenderPipelineConfig::default());
    let preview = mount_id("preview");

    for blank in ["", "   ", "\n\t\n"] {
        let outcome = pipeline.render(&preview, blank).await;
        assert_eq!(outcome, RenderOutcome::Placeholder);

        let html = document.inner_html(&preview).expect("mount exists");
        assert_eq!(
            html,
            format!("<p class=\"empty\">{}</p>", clean_text("No content"))
        );
        assert!(pipeline.state(&preview).is_settled());
    }
}

#[tokio::test]
async fn configured_placeholder_text_is_used() {
    let document = document_with(&["preview"]);
    let config = RenderPipelineConfig {
        empty_text: "Nothing".to_string(),
        ..RenderPipelineConfig::default()
    };
    let pipeline = RenderPipeline::new(document.clone(), config);

    pipeline.render(&mount_id("preview"), "").await;

    assert_eq!(
        document.inner_html(&mount_id("preview")).as_deref(),
        Some("<p class=\"empty\">Nothing</p>")
    );
}

#[tokio::test]
async fn missing_mount_is_a_silent_no_op() {
    let document = document_with(&["preview"]);
    let pipeline = RenderPipeline::new(document.clone(), RenderPipelineConfig::default());
    let revision = document.revision();

    let outcome = pipeline.render(&mount_id("elsewhere"), "# Hi").await;

    assert_eq!(outcome, RenderOutcome::MountMissing);
    assert_eq!(document.revision(), revision, "document untouched");
    assert!(document.styles().is_empty());
}

#[tokio::test]
async fn converter_load_failure_shows_error_panel_then_recovers() {
    let document = document_with(&["preview"]);
    let loader = Arc::new(ScriptedLoader::failing(1));
    let pipeline = RenderPipeline::with_loader(
        document.clone(),
        loader.clone(),
        RenderPipelineConfig::default(),
    );
    let preview = mount_id("preview");

    let outcome = pipeline.render(&preview, "# Hi").await;
    assert_eq!(outcome, RenderOutcome::Failed);

    let html = document.inner_html(&preview).expect("mount exists");
    assert!(html.starts_with("<div class=\"error\">"));
    assert!(html.contains(&clean_text("Render error:")));
    assert!(html.contains(&clean_text("network down")));
    match pipeline.state(&preview) {
        RenderState::Error { message } => assert!(message.contains("network down")),
        other => panic!("expected error state, got {other:?}"),
    }
    assert_eq!(document.style_count(shared_stylesheet().id()), 1);

    let retry = pipeline.render(&preview, "# Hi").await;
    assert_eq!(retry, RenderOutcome::Rendered);
    assert!(
        document
            .inner_html(&preview)
            .expect("mount exists")
            .contains("<h1>Hi</h1>")
    );
    assert_eq!(loader.attempts(), 2);
}

#[tokio::test]
async fn converter_load_failure_applies_to_blank_input_too() {
    let document = document_with(&["preview"]);
    let pipeline = RenderPipeline::with_loader(
        document.clone(),
        Arc::new(ScriptedLoader::failing(1)),
        RenderPipelineConfig::default(),
    );

    let outcome = pipeline.render(&mount_id("preview"), "").await;

    assert_eq!(outcome, RenderOutcome::Failed);
}

#[tokio::test]
async fn parse_failure_is_contained_in_mount() {
    let document = document_with(&["left", "right"]);
    let pipeline = RenderPipeline::with_loader(
        document.clone(),
        Arc::new(BrokenLoader),
        RenderPipelineConfig::default(),
    );

    let outcome = pipeline.render(&mount_id("left"), "# Hi").await;

    assert_eq!(outcome, RenderOutcome::Failed);
    assert!(
        document
            .inner_html(&mount_id("left"))
            .expect("mount exists")
            .contains(&clean_text("unbalanced input"))
    );
    assert_eq!(document.inner_html(&mount_id("right")).as_deref(), Some(""));
}

#[tokio::test]
async fn concurrent_first_renders_load_converter_once() {
    let document = document_with(&["a", "b", "c", "d"]);
    let loader = Arc::new(ScriptedLoader::new());
    let pipeline = RenderPipeline::with_loader(
        document.clone(),
        loader.clone(),
        RenderPipelineConfig::default(),
    );
    let (a, b, c, d) = (mount_id("a"), mount_id("b"), mount_id("c"), mount_id("d"));

    let outcomes = tokio::join!(
        pipeline.render(&a, "one"),
        pipeline.render(&b, "two"),
        pipeline.render(&c, "three"),
        pipeline.render(&d, "four"),
    );

    assert_eq!(
        outcomes,
        (
            RenderOutcome::Rendered,
            RenderOutcome::Rendered,
            RenderOutcome::Rendered,
            RenderOutcome::Rendered
        )
    );
    assert_eq!(loader.attempts(), 1);
}

#[tokio::test]
async fn latest_render_wins_when_calls_overlap() {
    let document = document_with(&["preview"]);
    let gate = Arc::new(Semaphore::new(0));
    let pipeline = RenderPipeline::with_loader(
        document.clone(),
        Arc::new(ScriptedLoader::gated(gate.clone())),
        RenderPipelineConfig::default(),
    );
    let preview = mount_id("preview");

    let (first, second, ()) = tokio::join!(
        pipeline.render(&preview, "# First"),
        async {
            tokio::task::yield_now().await;
            pipeline.render(&preview, "# Second").await
        },
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            gate.add_permits(1);
        },
    );

    assert_eq!(first, RenderOutcome::Superseded);
    assert_eq!(second, RenderOutcome::Rendered);
    let html = document.inner_html(&preview).expect("mount exists");
    assert!(html.contains("<h1>Second</h1>"));
    assert!(!html.contains("First"));
}

#[tokio::test]
async fn loading_panel_is_visible_while_render_is_pending() {
    let document = document_with(&["preview"]);
    let gate = Arc::new(Semaphore::new(0));
    let pipeline = RenderPipeline::with_loader(
        document.clone(),
        Arc::new(ScriptedLoader::gated(gate.clone())),
        RenderPipelineConfig::default(),
    );
    let preview = mount_id("preview");

    let (outcome, ()) = tokio::join!(pipeline.render(&preview, "# Hi"), async {
        tokio::task::yield_now().await;
        let pending = document.inner_html(&preview).expect("mount exists");
        let loading = clean_text("Loading Markdown...");
        assert_eq!(pending, format!("<div class=\"loading\">{loading}</div>"));
        assert_eq!(pipeline.state(&preview), RenderState::Loading);
        gate.add_permits(1);
    });

    assert_eq!(outcome, RenderOutcome::Rendered);
    assert!(pipeline.state(&preview).is_settled());
}

#[tokio::test]
async fn mount_removed_mid_render_discards_result() {
    let document = document_with(&["preview"]);
    let gate = Arc::new(Semaphore::new(0));
    let pipeline = RenderPipeline::with_loader(
        document.clone(),
        Arc::new(ScriptedLoader::gated(gate.clone())),
        RenderPipelineConfig::default(),
    );
    let preview = mount_id("preview");

    let (outcome, ()) = tokio::join!(pipeline.render(&preview, "# Hi"), async {
        tokio::task::yield_now().await;
        assert!(document.unmount(&preview));
        gate.add_permits(1);
    });

    assert_eq!(outcome, RenderOutcome::MountMissing);
    assert_eq!(pipeline.state(&preview), RenderState::Idle);
}

#[tokio::test]
async fn released_mount_forgets_state() {
    let document = document_with(&["preview"]);
    let pipeline = RenderPipeline::new(document, RenderPipelineConfig::default());
    let preview = mount_id("preview");

    pipeline.render(&preview, "text").await;
    assert!(pipeline.release(&preview));

    assert_eq!(pipeline.state(&preview), RenderState::Idle);
    assert!(!pipeline.release(&preview));
}

#[tokio::test]
async fn rendering_is_deterministic() {
    let document = document_with(&["preview"]);
    let pipeline = RenderPipeline::new(document.clone(), RenderPipelineConfig::default());
    let request = RenderRequest::new(mount_id("preview"), include_str!("fixtures/showcase.md"));

    pipeline.render_request(&request).await;
    let first = document.inner_html(&request.mount_id);
    pipeline.render_request(&request).await;
    let second = document.inner_html(&request.mount_id);

    assert_eq!(first, second);
    assert_eq!(document.styles().len(), 1);
}

#[tokio::test]
async fn showcase_fixture_exercises_gfm_and_raw_html() {
    let document = document_with(&["preview"]);
    let pipeline = RenderPipeline::new(document.clone(), RenderPipelineConfig::default());
    let preview = mount_id("preview");

    let outcome = pipeline
        .render(&preview, include_str!("fixtures/showcase.md"))
        .await;
    assert_eq!(outcome, RenderOutcome::Rendered);

    let html = document.inner_html(&preview).expect("mount exists");
    assert!(html.contains("<h1>Release notes</h1>"));
    assert!(html.contains("Soft line one<br />"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<del>planned</del>"));
    assert!(html.contains("type=\"checkbox\""));
    assert!(html.contains("<a href=\"https://example.com\">"));
    assert!(html.contains("<pre lang=\"rust\"><code>"));
    assert!(html.contains("<thinking>"));
    assert!(html.contains("<hr />"));
}

#[tokio::test]
async fn sanitize_mode_strips_active_content() {
    let document = document_with(&["preview"]);
    let config = RenderPipelineConfig {
        converter: ConverterOptions {
            sanitize: true,
            ..ConverterOptions::default()
        },
        ..RenderPipelineConfig::default()
    };
    let pipeline = RenderPipeline::new(document.clone(), config);
    let preview = mount_id("preview");

    pipeline
        .render(
            &preview,
            "<script>alert(1)</script>\n\n<thinking>\nkept\n</thinking>\n\nbody",
        )
        .await;

    let html = document.inner_html(&preview).expect("mount exists");
    assert!(!html.contains("<script>"));
    assert!(html.contains("<thinking>"));
    assert!(html.contains("<p>body</p>"));
}

#[tokio::test]
async fn pre_existing_style_in_document_is_respected() {
    let document = document_with(&["preview"]);
    let sheet = shared_stylesheet();
    document.insert_style(sheet.id(), sheet.css());
    let pipeline = RenderPipeline::new(document.clone(), RenderPipelineConfig::default());

    pipeline.render(&mount_id("preview"), "text").await;

    assert_eq!(document.style_count(sheet.id()), 1);
}
