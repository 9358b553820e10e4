use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use disk_cleaner_core::{LOG_FILE_PREFIX, LOG_FILE_SUFFIX};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, format::Writer, time::FormatTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Console output plus a daily file in `log_dir`. When the file writer cannot
/// be created the console layer is still installed and the error is returned
/// alongside so it can be logged once tracing is up.
pub fn init_tracing(log_dir: &Path) -> (Option<WorkerGuard>, Option<anyhow::Error>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer()
        .with_timer(LocalTimer)
        .with_target(false)
        .with_writer(std::io::stdout);

    let (file_layer, guard, error) = match file_writer(log_dir) {
        Ok((writer, guard)) => {
            let layer = fmt::layer()
                .with_timer(LocalTimer)
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            (Some(layer), Some(guard), None)
        }
        Err(err) => (None, None, Some(err)),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
    {
        eprintln!("failed to install tracing subscriber: {err}");
    }
    (guard, error)
}

fn file_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(log_dir)
        .with_context(|| format!("failed to open log file in {}", log_dir.display()))?;
    Ok(tracing_appender::non_blocking(rolling))
}
