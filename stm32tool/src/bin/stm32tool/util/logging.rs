use std::fs::File;
use std::path::Path;

use anyhow::Context;
use tracing::level_filters::LevelFilter as TracingLevel;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Keeps the JSON log writer alive, flushing it on drop.
pub struct FileLoggerGuard<'a> {
    _append_guard: WorkerGuard,
    log_path: &'a Path,
}

impl Drop for FileLoggerGuard<'_> {
    fn drop(&mut self) {
        tracing::debug!("Wrote log to {}", self.log_path.display());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum LevelFilter {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LevelFilter> for TracingLevel {
    fn from(level: LevelFilter) -> Self {
        match level {
            LevelFilter::Off => TracingLevel::OFF,
            LevelFilter::Error => TracingLevel::ERROR,
            LevelFilter::Warn => TracingLevel::WARN,
            LevelFilter::Info => TracingLevel::INFO,
            LevelFilter::Debug => TracingLevel::DEBUG,
            LevelFilter::Trace => TracingLevel::TRACE,
        }
    }
}

/// The console filter: `--log-level` if given, otherwise `RUST_LOG`, otherwise warnings.
fn console_filter(level: Option<LevelFilter>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::builder()
            .with_default_directive(TracingLevel::from(level).into())
            .parse_lossy(""),
        None => EnvFilter::builder()
            .with_default_directive(TracingLevel::WARN.into())
            .from_env_lossy(),
    }
}

/// Logs to stderr and, if `log_path` is given, everything down to debug level
/// as JSON to that file, including when the resolve, acquire, refresh and
/// create spans open and close.
pub fn setup_logging(
    log_path: Option<&Path>,
    level: Option<LevelFilter>,
) -> anyhow::Result<Option<FileLoggerGuard<'_>>> {
    let console = tracing_subscriber::fmt::layer()
        .compact()
        .without_time()
        .with_writer(std::io::stderr)
        .with_filter(console_filter(level));

    let Some(log_path) = log_path else {
        tracing_subscriber::registry().with(console).init();
        return Ok(None);
    };

    let log_file = File::create(log_path)
        .with_context(|| format!("Failed to create the log file {}.", log_path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(log_file);

    let file = tracing_subscriber::fmt::layer()
        .json()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(writer)
        .with_filter(TracingLevel::DEBUG);

    tracing_subscriber::registry().with(console).with(file).init();
    tracing::debug!("Writing log to {}", log_path.display());

    Ok(Some(FileLoggerGuard {
        _append_guard: guard,
        log_path,
    }))
}
