//! Tracing subscriber setup
//!
//! `json` output is meant for log shippers, anything else gets the
//! human-readable pretty format. `RUST_LOG` overrides the configured level.

use std::fs::{File, OpenOptions};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

/// Dependencies that are chatty at debug level
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=info", "tungstenite=info", "redis=info"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber; fails if one is already set
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(level)))?;

    let file = config.file_path.as_deref().map(open_log_file).transpose()?;
    let output = if config.format.eq_ignore_ascii_case("json") {
        json_layer(file)
    } else {
        pretty_layer(file)
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()?;
    Ok(())
}

fn json_layer(file: Option<Arc<File>>) -> BoxedLayer {
    let layer = fmt::layer()
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_target(true)
        .with_line_number(true);

    match file {
        Some(file) => layer.with_writer(file).boxed(),
        None => layer.boxed(),
    }
}

fn pretty_layer(file: Option<Arc<File>>) -> BoxedLayer {
    let layer = fmt::layer().pretty().with_target(true).with_file(false);

    match file {
        // no color codes in files
        Some(file) => layer.with_ansi(false).with_writer(file).boxed(),
        None => layer.boxed(),
    }
}

fn open_log_file(path: &str) -> anyhow::Result<Arc<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {path}: {e}"))?;
    Ok(Arc::new(file))
}

fn default_directives(level: Level) -> String {
    let level = level.to_string().to_lowercase();
    std::iter::once(level.as_str())
        .chain(QUIET_TARGETS.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
