use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use markpane::application::render::{RenderPipeline, RenderPipelineConfig};
use markpane::application::watch::{ChangeWatcher, from_fn};
use markpane::domain::mount::MountId;
use markpane::infra::document::InMemoryDocument;
use markpane::infra::telemetry;
use metrics_util::debugging::DebuggingRecorder;

const RENDER_TOTAL: &str = "markpane_render_total";

#[tokio::test]
async fn render_and_watch_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let document = Arc::new(InMemoryDocument::new("metrics"));
    let preview = MountId::new("preview").expect("valid mount id");
    document.mount_with_class(&preview, Some("markdown-container"));
    let pipeline = Arc::new(RenderPipeline::new(
        document.clone(),
        RenderPipelineConfig::default(),
    ));

    // Rendered, placeholder and missing-mount outcomes
    pipeline.render(&preview, "# Metrics").await;
    pipeline.render(&preview, "").await;
    pipeline
        .render(&MountId::new("absent").expect("valid mount id"), "text")
        .await;

    // Watcher ticks and the active gauge
    let watcher = ChangeWatcher::new(Arc::clone(&pipeline));
    watcher
        .watch(
            preview.clone(),
            from_fn(|| "watched".to_string()),
            Duration::from_millis(10),
        )
        .expect("watch starts");
    tokio::time::sleep(Duration::from_millis(50)).await;
    watcher.shutdown();

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(key, _, _, _)| key.key().name().to_string())
        .collect();

    let expected = [
        RENDER_TOTAL,
        "markpane_render_ms",
        "markpane_converter_load_total",
        "markpane_styles_injected_total",
        "markpane_watch_ticks_total",
        "markpane_watchers_active",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let outcomes: HashSet<String> = snapshot
        .iter()
        .filter(|(key, _, _, _)| key.key().name() == RENDER_TOTAL)
        .flat_map(|(key, _, _, _)| {
            key.key()
                .labels()
                .filter(|label| label.key() == "outcome")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    for outcome in ["rendered", "placeholder", "mount_missing"] {
        assert!(outcomes.contains(outcome), "missing outcome: {outcome}");
    }
}
