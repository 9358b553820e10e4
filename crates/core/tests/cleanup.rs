use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Duration as TimeDelta, TimeZone, Utc};
use disk_cleaner_core::{
    load_or_create, log_file_name, run_cleanup, CleanerConfig, EventKind, LocalFileSystem,
    MemoryFileSystem, MemorySink, RunOptions, TerminalReason,
};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap()
}

fn quiet_options(now: DateTime<Utc>) -> RunOptions {
    RunOptions {
        pacing: Duration::ZERO,
        now: Some(now),
        ..RunOptions::default()
    }
}

#[test]
fn three_folders_converge_with_four_oldest_deletions() {
    let fs = MemoryFileSystem::new(100, 90);
    let mut folders = Vec::new();
    for folder in 0..3 {
        let dir = PathBuf::from(format!("/data/site{folder}"));
        for file in 0..5 {
            let minutes = file * 3 + folder;
            fs.add_file(
                dir.join(format!("file{file}.bin")),
                10,
                base_time() + TimeDelta::minutes(minutes),
            );
        }
        folders.push(dir);
    }
    let config = CleanerConfig {
        folders_paths: folders,
        disk_usage_threshold: 50,
        ..CleanerConfig::default()
    };
    let sink = MemorySink::new();

    let summary = run_cleanup(&config, &fs, &sink, &quiet_options(base_time()));

    assert_eq!(summary.initial_usage_percent, Some(90.0));
    let outcome = summary.reclaim.expect("reclaim ran");
    assert_eq!(outcome.reason, TerminalReason::ThresholdReached);
    assert_eq!(
        outcome.removed_files,
        vec![
            PathBuf::from("/data/site0/file0.bin"),
            PathBuf::from("/data/site1/file0.bin"),
            PathBuf::from("/data/site2/file0.bin"),
            PathBuf::from("/data/site0/file1.bin"),
        ]
    );
    assert_eq!(outcome.freed_bytes, 40);
    assert!(outcome.final_usage_percent <= 50.0);
    assert_eq!(fs.file_paths().len(), 11);
    assert_eq!(sink.count(EventKind::Deleted), 4);
    assert_eq!(sink.count(EventKind::Error), 0);
}

#[test]
fn unreachable_threshold_ends_when_files_run_out() {
    let fs = MemoryFileSystem::new(1_000, 990);
    fs.add_file("/data/a.bin", 10, base_time());
    fs.add_file("/data/b.bin", 10, base_time() + TimeDelta::minutes(1));
    let config = CleanerConfig {
        folders_paths: vec![PathBuf::from("/data")],
        disk_usage_threshold: 10,
        ..CleanerConfig::default()
    };
    let sink = MemorySink::new();

    let summary = run_cleanup(&config, &fs, &sink, &quiet_options(base_time()));

    let outcome = summary.reclaim.expect("reclaim ran");
    assert_eq!(outcome.reason, TerminalReason::Exhausted);
    assert_eq!(outcome.removed_files.len(), 2);
    assert!(fs.file_paths().is_empty());
}

#[test]
fn malformed_config_runs_with_defaults_and_stops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("disk_cleaner_config.json");
    fs::write(&path, "{ not json").expect("write config");
    let sink = MemorySink::new();

    let config = load_or_create(&path, &sink);
    assert!(config.folders_paths.is_empty());
    assert_eq!(config.disk_usage_threshold, 80);

    let memory = MemoryFileSystem::new(100, 99);
    let summary = run_cleanup(&config, &memory, &sink, &quiet_options(base_time()));
    assert!(summary.reclaim.is_none());
    assert_eq!(sink.count(EventKind::Error), 2);
}

#[test]
fn reserve_mode_on_real_files_mirrors_folders_and_sweeps_logs() {
    let root = tempfile::tempdir().expect("tempdir");
    let watch = root.path().join("incoming");
    let reserve = root.path().join("reserve");
    let logs = root.path().join("logs");
    fs::create_dir_all(&watch).expect("watch dir");
    fs::create_dir_all(&logs).expect("log dir");
    fs::write(watch.join("a.dat"), b"aaaa").expect("a");
    fs::write(watch.join("b.dat"), b"bb").expect("b");

    let now = Utc::now() + TimeDelta::minutes(1);
    let stale_log = logs.join(log_file_name(now.date_naive() - TimeDelta::days(40)));
    let current_log = logs.join(log_file_name(now.date_naive()));
    fs::write(&stale_log, b"old").expect("stale log");
    fs::write(&current_log, b"new").expect("current log");

    let config = CleanerConfig {
        folders_paths: vec![watch.clone()],
        disk_usage_threshold: 100,
        reserve_folder: Some(reserve.clone()),
        min_file_age_minutes: 0,
        ..CleanerConfig::default()
    };
    let sink = MemorySink::new();
    let options = RunOptions {
        log_dir: Some(logs.clone()),
        ..quiet_options(now)
    };

    let summary = run_cleanup(&config, &LocalFileSystem::new(), &sink, &options);

    let relocation = summary.relocation.expect("relocation ran");
    assert_eq!(relocation.moved_files, 2);
    assert_eq!(relocation.moved_bytes, 6);
    assert!(reserve.join("incoming").join("a.dat").is_file());
    assert!(reserve.join("incoming").join("b.dat").is_file());
    assert!(!watch.join("a.dat").exists());
    assert!(summary.reclaim.is_none());

    assert!(!stale_log.exists());
    assert!(current_log.exists());
    assert_eq!(sink.count(EventKind::Cleanup), 1);
}
