use std::{process, sync::Arc};

use markpane::{
    application::{
        error::AppError,
        render::{RenderOutcome, RenderPipeline, RenderPipelineConfig},
        watch::ChangeWatcher,
    },
    config,
    domain::{mount::MountId, types::RenderState},
    infra::{
        document::InMemoryDocument,
        files::{self, FileTextSource},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        let exit_code = error.exit_code();
        report_application_error(&error);
        process::exit(exit_code);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Watch(args) => run_watch(settings, args).await,
    }
}

/// Mount a fresh document for `mount`, tagged with the configured container class.
fn prepare_document(
    settings: &config::Settings,
    title: String,
    mount: &str,
) -> Result<(Arc<InMemoryDocument>, MountId), AppError> {
    let mount_id = MountId::new(mount)?;
    let document = Arc::new(InMemoryDocument::new(title));
    document.mount_with_class(&mount_id, Some(settings.render.container_class.clone()));
    Ok((document, mount_id))
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(markpane::infra::error::InfraError::from)?;
    let (document, mount_id) =
        prepare_document(&settings, files::title_for(&args.file), &args.mount)?;

    let pipeline = RenderPipeline::new(
        document.clone(),
        RenderPipelineConfig::from(&settings.render),
    );
    let outcome = pipeline.render(&mount_id, &markdown).await;

    info!(
        target = "markpane::render",
        file = %args.file.display(),
        mount_id = %mount_id,
        outcome = outcome.as_str(),
        "Render complete"
    );

    let output = if args.fragment {
        document.inner_html(&mount_id).unwrap_or_default()
    } else {
        document.to_html_page()
    };
    println!("{output}");

    match (outcome, pipeline.state(&mount_id)) {
        (RenderOutcome::Failed, RenderState::Error { message }) => Err(AppError::render(message)),
        _ => Ok(()),
    }
}

async fn run_watch(settings: config::Settings, args: config::WatchArgs) -> Result<(), AppError> {
    let (document, mount_id) =
        prepare_document(&settings, files::title_for(&args.file), &args.mount)?;
    let poll_interval = settings.watch.poll_interval;

    let pipeline = Arc::new(RenderPipeline::new(
        document.clone(),
        RenderPipelineConfig::from(&settings.render),
    ));
    let watcher = ChangeWatcher::new(Arc::clone(&pipeline));
    watcher.watch(
        mount_id.clone(),
        FileTextSource::new(&args.file),
        poll_interval,
    )?;

    info!(
        target = "markpane::watch",
        file = %args.file.display(),
        output = %args.output.display(),
        poll_interval_ms = poll_interval.as_millis() as u64,
        "Watching for changes"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut written_revision = None;

    let result = loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(err) = signal {
                    warn!(target = "markpane::watch", error = %err, "Signal handler failed");
                }
                break Ok(());
            }
            _ = ticker.tick() => {
                let revision = document.revision();
                if written_revision == Some(revision) || !pipeline.state(&mount_id).is_settled() {
                    continue;
                }
                if let Err(err) = files::write_page(&args.output, &document.to_html_page()).await {
                    break Err(AppError::from(err));
                }
                written_revision = Some(revision);
                info!(
                    target = "markpane::watch",
                    output = %args.output.display(),
                    revision,
                    "Preview updated"
                );
            }
        }
    };

    watcher.shutdown();
    result
}
