//! tracing-subscriber initialization.
//!
//! Installs a JSON `fmt` subscriber whose level comes from `LOG_LEVEL` and
//! whose output goes to every destination in `LOG_OUTPUT_PATHS`.

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt as _};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::LogConfig;

/// Parse a configured log level.
///
/// Accepts the usual `trace`..`error` names; `fatal`, `panic` and `dpanic` are
/// treated as `error`. Anything else is a startup error.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    let filter = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" | "" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" | "dpanic" | "panic" | "fatal" => LevelFilter::ERROR,
        other => bail!("invalid LOG_LEVEL '{other}'"),
    };
    Ok(filter)
}

/// Build a writer that tees log lines to every configured destination.
///
/// `stdout` and `stderr` are the process streams; anything else is a file
/// path opened for append.
pub fn make_writer(paths: &[String]) -> Result<BoxMakeWriter> {
    let mut writer: Option<BoxMakeWriter> = None;

    for path in paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        let next = match path {
            "stdout" => BoxMakeWriter::new(std::io::stdout),
            "stderr" => BoxMakeWriter::new(std::io::stderr),
            file => BoxMakeWriter::new(Mutex::new(open_log_file(file)?)),
        };
        writer = Some(match writer {
            Some(current) => BoxMakeWriter::new(current.and(next)),
            None => next,
        });
    }

    Ok(writer.unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout)))
}

fn open_log_file(path: &str) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log output '{path}'"))
}

/// Install the global subscriber. `RUST_LOG`, when set, refines the filter.
pub fn init(config: &LogConfig) -> Result<()> {
    let level = parse_level(&config.level)?;
    let writer = make_writer(&config.output_paths)?;

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}
