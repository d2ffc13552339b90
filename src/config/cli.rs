use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use super::DEFAULT_MOUNT_ID;

/// Command-line arguments for the markpane binary.
#[derive(Debug, Parser)]
#[command(name = "markpane", version, about = "Markdown preview renderer")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "MARKPANE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a markdown file once and print the resulting HTML.
    Render(RenderArgs),
    /// Watch a markdown file and keep an HTML preview page up to date.
    Watch(WatchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Treat single newlines as hard line breaks.
    #[arg(
        long = "render-breaks",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub breaks: Option<bool>,

    /// Enable GitHub-flavoured extensions (tables, strikethrough, autolinks, task lists).
    #[arg(
        long = "render-gfm",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub gfm: Option<bool>,

    /// Run converter output through the HTML sanitizer.
    #[arg(
        long = "render-sanitize",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub sanitize: Option<bool>,

    /// Override the placeholder shown for empty input.
    #[arg(long = "render-empty-text", value_name = "TEXT")]
    pub empty_text: Option<String>,

    /// Override the message shown while a render is in flight.
    #[arg(long = "render-loading-text", value_name = "TEXT")]
    pub loading_text: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Mount point id that receives the rendered HTML.
    #[arg(long, value_name = "ID", default_value = DEFAULT_MOUNT_ID)]
    pub mount: String,

    /// Print only the mount point content instead of a full HTML page.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub fragment: bool,

    /// Markdown file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Override the polling interval in milliseconds.
    #[arg(long = "poll-interval-ms", value_name = "MILLIS")]
    pub poll_interval_ms: Option<u64>,

    /// Mount point id that receives the rendered HTML.
    #[arg(long, value_name = "ID", default_value = DEFAULT_MOUNT_ID)]
    pub mount: String,

    /// HTML page rewritten whenever the preview changes.
    #[arg(
        long,
        short = 'o',
        value_name = "HTML",
        value_hint = ValueHint::FilePath
    )]
    pub output: PathBuf,

    /// Markdown file to watch.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
