use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::error::CleanerError;
use crate::events::{CleanupEvent, EventKind, EventSink};
use crate::fs::FileSystem;
use crate::model::{FileCandidate, RelocationSummary};

const MAX_AGE_MINUTES: u64 = 100 * 365 * 24 * 60;

pub struct RelocationStage<'a> {
    fs: &'a dyn FileSystem,
    sink: &'a dyn EventSink,
    min_age: Duration,
}

impl<'a> RelocationStage<'a> {
    pub fn new(fs: &'a dyn FileSystem, sink: &'a dyn EventSink, min_age_minutes: u64) -> Self {
        let minutes = min_age_minutes.min(MAX_AGE_MINUTES) as i64;
        Self {
            fs,
            sink,
            min_age: Duration::minutes(minutes),
        }
    }

    pub fn relocate(&self, monitor_folders: &[PathBuf], reserve_root: &Path) -> RelocationSummary {
        self.relocate_at(monitor_folders, reserve_root, Utc::now())
    }

    pub fn relocate_at(
        &self,
        monitor_folders: &[PathBuf],
        reserve_root: &Path,
        now: DateTime<Utc>,
    ) -> RelocationSummary {
        let mut summary = RelocationSummary::default();
        let cutoff = now - self.min_age;

        for folder in monitor_folders {
            let mut eligible = match self.fs.list_files(folder) {
                Ok(files) => files
                    .into_iter()
                    .filter(|file| file.created <= cutoff)
                    .collect::<Vec<_>>(),
                Err(err) => {
                    self.sink.report(&CleanerError::folder_access(folder, err));
                    summary.skipped_folders += 1;
                    continue;
                }
            };
            eligible.sort_by(FileCandidate::age_order);

            let mirror = match self.prepare_mirror(folder, reserve_root) {
                Ok(mirror) => mirror,
                Err(err) => {
                    self.sink.report(&err);
                    summary.skipped_folders += 1;
                    continue;
                }
            };

            if !eligible.is_empty() {
                self.sink.info(&format!(
                    "Relocating {} file(s) from {} to {}",
                    eligible.len(),
                    folder.display(),
                    mirror.display()
                ));
            }

            for file in eligible {
                match self.move_into(&file, &mirror) {
                    Ok(destination) => {
                        self.sink.record(CleanupEvent::new(
                            EventKind::Moved,
                            format!(
                                "Moved {} -> {}",
                                file.path.display(),
                                destination.display()
                            ),
                        ));
                        summary.moved_files += 1;
                        summary.moved_bytes = summary.moved_bytes.saturating_add(file.size_bytes);
                    }
                    Err(err) => {
                        self.sink.report(&err);
                        summary.failed_files += 1;
                    }
                }
            }
        }

        summary
    }

    fn prepare_mirror(&self, folder: &Path, reserve_root: &Path) -> Result<PathBuf, CleanerError> {
        let name = folder.file_name().ok_or_else(|| {
            CleanerError::folder_access(
                folder,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "folder has no name to mirror in the reserve",
                ),
            )
        })?;
        let mirror = reserve_root.join(name);
        if !self.fs.is_dir(&mirror) {
            self.fs
                .create_dir_all(&mirror)
                .map_err(|err| CleanerError::folder_access(&mirror, err))?;
        }
        Ok(mirror)
    }

    fn move_into(&self, file: &FileCandidate, mirror: &Path) -> Result<PathBuf, CleanerError> {
        let name = file.path.file_name().ok_or_else(|| {
            CleanerError::candidate_io(
                &file.path,
                io::Error::new(io::ErrorKind::InvalidInput, "file has no name"),
            )
        })?;
        let destination = unique_destination(self.fs, mirror, name);
        self.fs
            .rename(&file.path, &destination)
            .map_err(|err| CleanerError::candidate_io(&file.path, err))?;
        Ok(destination)
    }
}

/// `dir/name`, or the first free `dir/stem_N.ext` for N = 1, 2, ...
pub fn unique_destination(fs: &dyn FileSystem, dir: &Path, name: &OsStr) -> PathBuf {
    let candidate = dir.join(name);
    if !fs.exists(&candidate) {
        return candidate;
    }

    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| name.to_os_string());
    let extension = as_path.extension();

    let mut counter = 1_u64;
    loop {
        let mut file_name = OsString::from(&stem);
        file_name.push(format!("_{counter}"));
        if let Some(extension) = extension {
            file_name.push(".");
            file_name.push(extension);
        }
        let candidate = dir.join(&file_name);
        if !fs.exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
