use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CleanerError;
use crate::events::{CleanupEvent, EventKind, EventSink};
use crate::fs::FileSystem;

pub const LOG_FILE_PREFIX: &str = "disk_cleaner";
pub const LOG_FILE_SUFFIX: &str = "log";

pub fn log_file_name(date: NaiveDate) -> String {
    format!("{LOG_FILE_PREFIX}.{}.{LOG_FILE_SUFFIX}", date.format("%Y-%m-%d"))
}

pub fn parse_log_date(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name
        .strip_prefix(LOG_FILE_PREFIX)?
        .strip_suffix(LOG_FILE_SUFFIX)?
        .strip_suffix('.')?;
    if let Some(date) = stem.strip_prefix('.') {
        return NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
    }
    if let Some(date) = stem.strip_prefix('_') {
        return NaiveDate::parse_from_str(date, "%Y%m%d").ok();
    }
    None
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogFile {
    pub path: PathBuf,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogSummary {
    pub directory: PathBuf,
    pub current_file: String,
    pub total_files: usize,
    pub oldest: Option<LogFile>,
    pub newest: Option<LogFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogSweep {
    pub deleted: Vec<PathBuf>,
    pub kept: usize,
    pub failed: usize,
}

pub struct LogHousekeeper<'a> {
    fs: &'a dyn FileSystem,
    sink: &'a dyn EventSink,
    log_dir: PathBuf,
}

impl<'a> LogHousekeeper<'a> {
    pub fn new(fs: &'a dyn FileSystem, sink: &'a dyn EventSink, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            sink,
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log_files(&self) -> Result<Vec<LogFile>, CleanerError> {
        let files = self
            .fs
            .list_files(&self.log_dir)
            .map_err(|err| CleanerError::folder_access(&self.log_dir, err))?;
        let mut logs = files
            .into_iter()
            .filter_map(|file| {
                let date = file
                    .path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(parse_log_date)?;
                Some(LogFile {
                    path: file.path,
                    date,
                })
            })
            .collect::<Vec<_>>();
        logs.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
        Ok(logs)
    }

    pub fn summarize(&self, today: NaiveDate) -> Option<LogSummary> {
        if !self.fs.is_dir(&self.log_dir) {
            self.sink.info(&format!(
                "Log directory {} does not exist",
                self.log_dir.display()
            ));
            return None;
        }
        let logs = match self.log_files() {
            Ok(logs) => logs,
            Err(err) => {
                self.sink.report(&err);
                return None;
            }
        };

        let summary = LogSummary {
            directory: self.log_dir.clone(),
            current_file: log_file_name(today),
            total_files: logs.len(),
            oldest: logs.first().cloned(),
            newest: logs.last().cloned(),
        };
        self.sink
            .info(&format!("Log directory: {}", summary.directory.display()));
        self.sink
            .info(&format!("Current log file: {}", summary.current_file));
        self.sink
            .info(&format!("Log files on disk: {}", summary.total_files));
        if let (Some(oldest), Some(newest)) = (&summary.oldest, &summary.newest) {
            self.sink.info(&format!(
                "Oldest log: {} ({}), newest log: {} ({})",
                display_name(&oldest.path),
                oldest.date,
                display_name(&newest.path),
                newest.date
            ));
        }
        Some(summary)
    }

    /// Deletes logs dated `today - retention_days` or earlier. Today's file is
    /// always kept.
    pub fn sweep(&self, retention_days: u32, today: NaiveDate) -> LogSweep {
        let mut sweep = LogSweep::default();
        if !self.fs.is_dir(&self.log_dir) {
            self.sink
                .info("Log directory does not exist, nothing to clean up");
            return sweep;
        }
        let logs = match self.log_files() {
            Ok(logs) => logs,
            Err(err) => {
                self.sink.report(&err);
                return sweep;
            }
        };

        // A window reaching past the calendar's start keeps everything.
        let boundary = today.checked_sub_days(Days::new(u64::from(retention_days)));
        for log in logs {
            let expired = boundary.is_some_and(|boundary| log.date <= boundary);
            if log.date == today || !expired {
                sweep.kept += 1;
                continue;
            }
            match self.fs.remove_file(&log.path) {
                Ok(()) => {
                    self.sink.record(CleanupEvent::new(
                        EventKind::Cleanup,
                        format!("Deleted old log {}", display_name(&log.path)),
                    ));
                    sweep.deleted.push(log.path);
                }
                Err(err) => {
                    self.sink
                        .report(&CleanerError::candidate_io(&log.path, err));
                    sweep.failed += 1;
                }
            }
        }

        if sweep.deleted.is_empty() {
            self.sink.info("No expired log files found");
        } else {
            self.sink.info(&format!(
                "Log cleanup finished, {} file(s) deleted",
                sweep.deleted.len()
            ));
        }
        sweep
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
