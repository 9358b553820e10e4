use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info_span;
use uuid::Uuid;

use crate::config::{CleanerConfig, CleanupMode};
use crate::events::EventSink;
use crate::fs::FileSystem;
use crate::logs::LogHousekeeper;
use crate::model::{human_bytes, RunSummary};
use crate::probe::DriveUsageProbe;
use crate::reclaim::{CandidateSource, FixedDelay, ReclaimLoop, DEFAULT_PACING};
use crate::relocate::RelocationStage;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub log_dir: Option<PathBuf>,
    pub pacing: Duration,
    pub cancel_flag: Option<Arc<AtomicBool>>,
    pub now: Option<DateTime<Utc>>,
    pub run_id: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            log_dir: None,
            pacing: DEFAULT_PACING,
            cancel_flag: None,
            now: None,
            run_id: None,
        }
    }
}

pub fn run_cleanup(
    config: &CleanerConfig,
    fs: &dyn FileSystem,
    sink: &dyn EventSink,
    options: &RunOptions,
) -> RunSummary {
    let run_id = options
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = info_span!("cleanup", run_id = %run_id);
    let _entered = span.enter();

    let now = options.now.unwrap_or_else(Utc::now);
    let threshold = config.threshold_percent();
    let mut summary = RunSummary {
        run_id,
        ..RunSummary::default()
    };

    sink.info("=== Disk cleanup started ===");
    sink.info(&format!(
        "Folders configured: {}",
        config.folders_paths.len()
    ));
    sink.info(&format!("Disk usage threshold: {threshold}%"));
    sink.info(&format!(
        "Log retention: {} day(s)",
        config.log_retention_days
    ));
    if let Some(reserve) = &config.reserve_folder {
        sink.info(&format!(
            "Reserve folder: {} (files older than {} minute(s) are relocated)",
            reserve.display(),
            config.min_file_age_minutes
        ));
    }

    if let Some(log_dir) = &options.log_dir {
        let housekeeper = LogHousekeeper::new(fs, sink, log_dir.clone());
        let today = now.date_naive();
        housekeeper.summarize(today);
        sink.info(&format!(
            "Removing logs older than {} day(s)",
            config.log_retention_days
        ));
        housekeeper.sweep(config.log_retention_days, today);
    }

    if config.folders_paths.is_empty() {
        sink.error("No folders are configured for cleanup");
        return summary;
    }

    let existing = config
        .folders_paths
        .iter()
        .filter(|folder| {
            let present = fs.is_dir(folder);
            if !present {
                sink.error(&format!("Folder does not exist: {}", folder.display()));
            }
            present
        })
        .cloned()
        .collect::<Vec<_>>();
    if existing.is_empty() {
        sink.error("None of the configured folders exist");
        return summary;
    }

    let source = match (config.mode(), &config.reserve_folder) {
        (CleanupMode::Reserve, Some(reserve)) => {
            let relocation = RelocationStage::new(fs, sink, config.min_file_age_minutes)
                .relocate_at(&existing, reserve, now);
            sink.info(&format!(
                "Relocation finished: {} file(s) moved ({}), {} failed, {} folder(s) skipped",
                relocation.moved_files,
                human_bytes(relocation.moved_bytes),
                relocation.failed_files,
                relocation.skipped_folders
            ));
            summary.relocation = Some(relocation);
            CandidateSource::Reserve(reserve.clone())
        }
        _ => CandidateSource::Folders(existing),
    };

    let probe = DriveUsageProbe::new(fs, sink, config.probe_folder());
    let usage = probe.usage_percent();
    summary.initial_usage_percent = Some(usage);
    sink.info(&format!(
        "Disk usage: {usage:.2}% (threshold: {threshold}%)"
    ));
    if usage <= threshold {
        sink.info("Disk usage is within the threshold, no cleanup needed");
        return summary;
    }

    sink.info("Disk usage exceeds the threshold, starting cleanup");
    let pacer = FixedDelay(options.pacing);
    let mut reclaim = ReclaimLoop::new(fs, sink, config.probe_folder(), &pacer);
    if let Some(flag) = &options.cancel_flag {
        reclaim = reclaim.with_cancel_flag(Arc::clone(flag));
    }
    let outcome = reclaim.run(&source, threshold);
    sink.info(&format!(
        "Cleanup finished after {} iteration(s): {} file(s) deleted, {} freed, final usage {:.2}% ({})",
        outcome.iterations,
        outcome.removed_files.len(),
        human_bytes(outcome.freed_bytes),
        outcome.final_usage_percent,
        outcome.reason.describe()
    ));
    summary.reclaim = Some(outcome);
    summary
}
