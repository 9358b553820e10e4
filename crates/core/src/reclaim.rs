use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::CleanerError;
use crate::events::{CleanupEvent, EventKind, EventSink};
use crate::fs::FileSystem;
use crate::model::{human_bytes, FileCandidate, ReclaimOutcome, TerminalReason};
use crate::probe::DriveUsageProbe;
use crate::select::VictimSelector;

pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    Folders(Vec<PathBuf>),
    Reserve(PathBuf),
}

pub trait Pacer {
    fn pause(&self);
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(DEFAULT_PACING)
    }
}

impl Pacer for FixedDelay {
    fn pause(&self) {
        if !self.0.is_zero() {
            thread::sleep(self.0);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&self) {}
}

pub struct ReclaimLoop<'a> {
    fs: &'a dyn FileSystem,
    sink: &'a dyn EventSink,
    probe: DriveUsageProbe<'a>,
    pacer: &'a dyn Pacer,
    cancel_flag: Option<Arc<AtomicBool>>,
}

enum BatchResult {
    ThresholdReached,
    Progress,
    NoProgress,
}

impl<'a> ReclaimLoop<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        sink: &'a dyn EventSink,
        probe_folder: Option<&Path>,
        pacer: &'a dyn Pacer,
    ) -> Self {
        Self {
            fs,
            sink,
            probe: DriveUsageProbe::new(fs, sink, probe_folder),
            pacer,
            cancel_flag: None,
        }
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn run(&self, source: &CandidateSource, threshold_percent: f64) -> ReclaimOutcome {
        let selector = VictimSelector::new(self.fs, self.sink);
        let mut outcome = ReclaimOutcome {
            freed_bytes: 0,
            iterations: 0,
            removed_files: Vec::new(),
            final_usage_percent: 0.0,
            reason: TerminalReason::Exhausted,
        };

        loop {
            outcome.iterations += 1;
            self.sink
                .info(&format!("Cleanup iteration #{}", outcome.iterations));

            outcome.final_usage_percent = self.probe.usage_percent();
            if outcome.final_usage_percent <= threshold_percent {
                self.sink.info(&format!(
                    "Target reached: disk usage {:.2}% (threshold {threshold_percent}%)",
                    outcome.final_usage_percent
                ));
                outcome.reason = TerminalReason::ThresholdReached;
                break;
            }

            if self.is_cancelled() {
                self.sink.info("Cleanup cancelled");
                outcome.reason = TerminalReason::Cancelled;
                break;
            }

            let batch = match source {
                CandidateSource::Folders(folders) => selector.oldest_per_folder(folders),
                CandidateSource::Reserve(root) => {
                    selector.oldest_in_reserve(root).into_iter().collect()
                }
            };
            if batch.is_empty() {
                self.sink.info("No more files to delete");
                outcome.reason = TerminalReason::Exhausted;
                break;
            }

            let stop_on_failure = matches!(source, CandidateSource::Reserve(_));
            match self.delete_batch(batch, threshold_percent, stop_on_failure, &mut outcome) {
                BatchResult::ThresholdReached => {
                    self.sink.info(&format!(
                        "Target reached after deletion: disk usage {:.2}%",
                        outcome.final_usage_percent
                    ));
                    outcome.reason = TerminalReason::ThresholdReached;
                    break;
                }
                BatchResult::NoProgress => {
                    self.sink.info("No file could be deleted in this iteration");
                    outcome.reason = TerminalReason::NoProgress;
                    break;
                }
                BatchResult::Progress => {}
            }

            self.pacer.pause();
        }

        outcome
    }

    fn delete_batch(
        &self,
        batch: Vec<FileCandidate>,
        threshold_percent: f64,
        stop_on_failure: bool,
        outcome: &mut ReclaimOutcome,
    ) -> BatchResult {
        let mut deleted_any = false;

        for candidate in batch {
            if !self.fs.exists(&candidate.path) {
                continue;
            }

            match self.fs.remove_file(&candidate.path) {
                Ok(()) => {
                    self.sink.record(CleanupEvent::new(
                        EventKind::Deleted,
                        format!(
                            "Deleted {} ({})",
                            candidate.path.display(),
                            human_bytes(candidate.size_bytes)
                        ),
                    ));
                    outcome.freed_bytes = outcome.freed_bytes.saturating_add(candidate.size_bytes);
                    outcome.removed_files.push(candidate.path);
                    deleted_any = true;

                    outcome.final_usage_percent = self.probe.usage_percent();
                    if outcome.final_usage_percent <= threshold_percent {
                        return BatchResult::ThresholdReached;
                    }
                }
                Err(err) => {
                    self.sink
                        .report(&CleanerError::candidate_io(&candidate.path, err));
                    if stop_on_failure {
                        break;
                    }
                }
            }
        }

        if deleted_any {
            BatchResult::Progress
        } else {
            BatchResult::NoProgress
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{CandidateSource, NoDelay, ReclaimLoop};
    use crate::events::{EventKind, MemorySink};
    use crate::memory::MemoryFileSystem;
    use crate::model::TerminalReason;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn folders(names: &[&str]) -> CandidateSource {
        CandidateSource::Folders(names.iter().map(PathBuf::from).collect())
    }

    #[test]
    fn already_under_threshold_touches_nothing() {
        let fs = MemoryFileSystem::new(100, 40);
        fs.add_file("/a/old.bin", 10, at(0));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/a"]), 50.0);
        assert_eq!(outcome.reason, TerminalReason::ThresholdReached);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.removed_files.is_empty());
        assert!(fs.contains_file("/a/old.bin"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let fs = MemoryFileSystem::new(100, 50);
        fs.add_file("/a/old.bin", 10, at(0));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/a"]), 50.0);
        assert_eq!(outcome.reason, TerminalReason::ThresholdReached);
        assert!(outcome.removed_files.is_empty());
    }

    #[test]
    fn stops_mid_batch_once_threshold_is_met() {
        let fs = MemoryFileSystem::new(100, 75);
        fs.add_file("/a/a1.bin", 20, at(1));
        fs.add_file("/b/b1.bin", 20, at(2));
        fs.add_file("/c/c1.bin", 20, at(3));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/c", "/b", "/a"]), 40.0);
        assert_eq!(outcome.reason, TerminalReason::ThresholdReached);
        assert_eq!(
            outcome.removed_files,
            vec![PathBuf::from("/a/a1.bin"), PathBuf::from("/b/b1.bin")]
        );
        assert_eq!(outcome.freed_bytes, 40);
        assert_eq!(outcome.iterations, 1);
        assert!(fs.contains_file("/c/c1.bin"));
        assert!(outcome.final_usage_percent <= 40.0);
    }

    #[test]
    fn exhausts_when_files_run_out() {
        let fs = MemoryFileSystem::new(100, 95);
        fs.add_file("/a/one.bin", 5, at(0));
        fs.add_file("/a/two.bin", 5, at(1));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/a"]), 50.0);
        assert_eq!(outcome.reason, TerminalReason::Exhausted);
        assert_eq!(outcome.removed_files.len(), 2);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(sink.count(EventKind::Deleted), 2);
    }

    #[test]
    fn locked_files_end_the_loop_without_spinning() {
        let fs = MemoryFileSystem::new(100, 90);
        fs.add_file("/a/locked.bin", 10, at(0));
        fs.lock_file("/a/locked.bin");
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/a"]), 50.0);
        assert_eq!(outcome.reason, TerminalReason::NoProgress);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(sink.count(EventKind::Error), 1);
    }

    #[test]
    fn failed_delete_in_folder_mode_moves_on_to_next_candidate() {
        let fs = MemoryFileSystem::new(100, 90);
        fs.add_file("/a/locked.bin", 10, at(0));
        fs.lock_file("/a/locked.bin");
        fs.add_file("/b/free.bin", 50, at(5));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/a", "/b"]), 50.0);
        assert_eq!(outcome.reason, TerminalReason::ThresholdReached);
        assert_eq!(outcome.removed_files, vec![PathBuf::from("/b/free.bin")]);
    }

    #[test]
    fn failed_delete_in_reserve_mode_ends_the_loop() {
        let fs = MemoryFileSystem::new(100, 90);
        fs.add_file("/reserve/a/locked.bin", 10, at(0));
        fs.lock_file("/reserve/a/locked.bin");
        fs.add_file("/reserve/b/free.bin", 50, at(5));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/reserve")), &NoDelay);

        let outcome = reclaim.run(&CandidateSource::Reserve(PathBuf::from("/reserve")), 50.0);
        assert_eq!(outcome.reason, TerminalReason::NoProgress);
        assert!(outcome.removed_files.is_empty());
        assert!(fs.contains_file("/reserve/b/free.bin"));
    }

    #[test]
    fn reserve_mode_deletes_one_oldest_file_per_iteration() {
        let fs = MemoryFileSystem::new(100, 80);
        fs.add_file("/reserve/a/a1.bin", 10, at(3));
        fs.add_file("/reserve/a/a2.bin", 10, at(4));
        fs.add_file("/reserve/b/b1.bin", 10, at(1));
        fs.add_file("/reserve/b/b2.bin", 10, at(9));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/reserve")), &NoDelay);

        let outcome = reclaim.run(&CandidateSource::Reserve(PathBuf::from("/reserve")), 50.0);
        assert_eq!(outcome.reason, TerminalReason::ThresholdReached);
        assert_eq!(
            outcome.removed_files,
            vec![
                PathBuf::from("/reserve/b/b1.bin"),
                PathBuf::from("/reserve/a/a1.bin"),
                PathBuf::from("/reserve/a/a2.bin"),
            ]
        );
        assert_eq!(outcome.iterations, 3);
    }

    #[test]
    fn unmeasurable_drive_is_treated_as_full() {
        let fs = MemoryFileSystem::new(100, 0);
        fs.set_capacity_unavailable(true);
        fs.add_file("/a/one.bin", 1, at(0));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/a"]), 80.0);
        assert_eq!(outcome.reason, TerminalReason::Exhausted);
        assert_eq!(outcome.removed_files.len(), 1);
        assert_eq!(outcome.final_usage_percent, 100.0);
    }

    #[test]
    fn cancellation_is_honoured_at_iteration_boundary() {
        let fs = MemoryFileSystem::new(100, 90);
        fs.add_file("/a/one.bin", 1, at(0));
        let sink = MemorySink::new();
        let flag = Arc::new(AtomicBool::new(true));
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay)
            .with_cancel_flag(Arc::clone(&flag));

        let outcome = reclaim.run(&folders(&["/a"]), 50.0);
        assert_eq!(outcome.reason, TerminalReason::Cancelled);
        assert!(fs.contains_file("/a/one.bin"));
    }

    #[test]
    fn threshold_is_checked_before_cancellation() {
        let fs = MemoryFileSystem::new(100, 40);
        fs.add_file("/a/one.bin", 1, at(0));
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay)
            .with_cancel_flag(Arc::new(AtomicBool::new(true)));

        let outcome = reclaim.run(&folders(&["/a"]), 50.0);
        assert_eq!(outcome.reason, TerminalReason::ThresholdReached);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn deleted_files_are_never_selected_twice() {
        let fs = MemoryFileSystem::new(1_000, 990);
        for minute in 0..6 {
            fs.add_file(format!("/a/{minute}.bin"), 1, at(minute));
            fs.add_file(format!("/b/{minute}.bin"), 1, at(minute + 100));
        }
        let sink = MemorySink::new();
        let reclaim = ReclaimLoop::new(&fs, &sink, Some(Path::new("/a")), &NoDelay);

        let outcome = reclaim.run(&folders(&["/a", "/b"]), 10.0);
        assert_eq!(outcome.reason, TerminalReason::Exhausted);
        let mut removed = outcome.removed_files.clone();
        removed.sort();
        removed.dedup();
        assert_eq!(removed.len(), 12);
        assert_eq!(outcome.removed_files.len(), 12);
        assert!(fs.file_paths().is_empty());
    }
}
