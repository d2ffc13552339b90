use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    // Logs go to stderr so `render` output on stdout stays clean.
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions with the installed recorder. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "markpane_render_total",
            Unit::Count,
            "Total number of render calls, labelled by outcome."
        );
        describe_histogram!(
            "markpane_render_ms",
            Unit::Milliseconds,
            "Render latency from trigger to settled mount content."
        );
        describe_counter!(
            "markpane_converter_load_total",
            Unit::Count,
            "Markdown converter load attempts, labelled by result."
        );
        describe_counter!(
            "markpane_styles_injected_total",
            Unit::Count,
            "Style blocks inserted into the host document."
        );
        describe_counter!(
            "markpane_watch_ticks_total",
            Unit::Count,
            "Change watcher observations, labelled by whether the text changed."
        );
        describe_gauge!(
            "markpane_watchers_active",
            Unit::Count,
            "Number of change watchers currently running."
        );
    });
}
