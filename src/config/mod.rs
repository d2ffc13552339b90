//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{CliArgs, Command, LoggingOverrides, RenderArgs, RenderOverrides, WatchArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "markpane";
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;
pub(crate) const DEFAULT_MOUNT_ID: &str = "markdown-preview";
pub(crate) const DEFAULT_CONTAINER_CLASS: &str = "markdown-container";
pub(crate) const DEFAULT_LOADING_TEXT: &str = "Loading Markdown...";
pub(crate) const DEFAULT_EMPTY_TEXT: &str = "No content";
pub(crate) const DEFAULT_ERROR_LABEL: &str = "Render error:";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub watch: WatchSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub breaks: bool,
    pub gfm: bool,
    pub sanitize: bool,
    pub container_class: String,
    pub loading_text: String,
    pub empty_text: String,
    pub error_label: String,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub poll_interval: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MARKPANE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_logging_overrides(&cli.logging);
    match &cli.command {
        Command::Render(args) => raw.apply_render_overrides(&args.render),
        Command::Watch(args) => {
            raw.apply_render_overrides(&args.render);
            if let Some(interval) = args.poll_interval_ms {
                raw.watch.poll_interval_ms = Some(interval);
            }
        }
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            render: RenderSettings::default(),
            watch: WatchSettings::default(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            breaks: true,
            gfm: true,
            sanitize: false,
            container_class: DEFAULT_CONTAINER_CLASS.to_string(),
            loading_text: DEFAULT_LOADING_TEXT.to_string(),
            empty_text: DEFAULT_EMPTY_TEXT.to_string(),
            error_label: DEFAULT_ERROR_LABEL.to_string(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    watch: RawWatchSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(breaks) = overrides.breaks {
            self.render.breaks = Some(breaks);
        }
        if let Some(gfm) = overrides.gfm {
            self.render.gfm = Some(gfm);
        }
        if let Some(sanitize) = overrides.sanitize {
            self.render.sanitize = Some(sanitize);
        }
        if let Some(text) = overrides.empty_text.as_ref() {
            self.render.empty_text = Some(text.clone());
        }
        if let Some(text) = overrides.loading_text.as_ref() {
            self.render.loading_text = Some(text.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            render,
            watch,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            render: build_render_settings(render)?,
            watch: build_watch_settings(watch)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let defaults = RenderSettings::default();

    let container_class = non_blank(
        render.container_class,
        defaults.container_class,
        "render.container_class",
    )?;
    if container_class.chars().any(char::is_whitespace) {
        return Err(LoadError::invalid(
            "render.container_class",
            "class name must not contain whitespace",
        ));
    }

    Ok(RenderSettings {
        breaks: render.breaks.unwrap_or(defaults.breaks),
        gfm: render.gfm.unwrap_or(defaults.gfm),
        sanitize: render.sanitize.unwrap_or(defaults.sanitize),
        container_class,
        loading_text: non_blank(
            render.loading_text,
            defaults.loading_text,
            "render.loading_text",
        )?,
        empty_text: non_blank(render.empty_text, defaults.empty_text, "render.empty_text")?,
        error_label: non_blank(
            render.error_label,
            defaults.error_label,
            "render.error_label",
        )?,
    })
}

fn build_watch_settings(watch: RawWatchSettings) -> Result<WatchSettings, LoadError> {
    let interval_ms = watch.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    if interval_ms == 0 {
        return Err(LoadError::invalid(
            "watch.poll_interval_ms",
            "must be greater than zero",
        ));
    }
    if interval_ms > MAX_POLL_INTERVAL_MS {
        return Err(LoadError::invalid(
            "watch.poll_interval_ms",
            format!("must not exceed {MAX_POLL_INTERVAL_MS}"),
        ));
    }

    Ok(WatchSettings {
        poll_interval: Duration::from_millis(interval_ms),
    })
}

fn non_blank(
    value: Option<String>,
    default: String,
    key: &'static str,
) -> Result<String, LoadError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(LoadError::invalid(key, "must not be blank")),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    breaks: Option<bool>,
    gfm: Option<bool>,
    sanitize: Option<bool>,
    container_class: Option<String>,
    loading_text: Option<String>,
    empty_text: Option<String>,
    error_label: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWatchSettings {
    poll_interval_ms: Option<u64>,
}
