use std::path::{Path, PathBuf};

use crate::error::CleanerError;
use crate::events::EventSink;
use crate::fs::FileSystem;
use crate::model::DriveUsageSample;

pub const FAIL_SAFE_USAGE_PERCENT: f64 = 100.0;

pub struct DriveUsageProbe<'a> {
    fs: &'a dyn FileSystem,
    sink: &'a dyn EventSink,
    folder: Option<PathBuf>,
}

impl<'a> DriveUsageProbe<'a> {
    pub fn new(fs: &'a dyn FileSystem, sink: &'a dyn EventSink, folder: Option<&Path>) -> Self {
        Self {
            fs,
            sink,
            folder: folder.map(Path::to_path_buf),
        }
    }

    pub fn sample(&self) -> Result<DriveUsageSample, CleanerError> {
        let folder = self
            .folder
            .as_deref()
            .ok_or_else(|| CleanerError::drive_query("", "no folder configured"))?;
        let root = self
            .fs
            .drive_root(folder)
            .map_err(|err| CleanerError::drive_query(folder, err.to_string()))?;
        let sample = self
            .fs
            .capacity(&root)
            .map_err(|err| CleanerError::drive_query(&root, err.to_string()))?;
        if sample.total_bytes == 0 {
            return Err(CleanerError::drive_query(&root, "drive reports zero capacity"));
        }
        Ok(sample)
    }

    pub fn usage_percent(&self) -> f64 {
        match self.sample() {
            Ok(sample) => sample.used_percent(),
            Err(err) => {
                self.sink.report(&err);
                FAIL_SAFE_USAGE_PERCENT
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{DriveUsageProbe, FAIL_SAFE_USAGE_PERCENT};
    use crate::events::{EventKind, MemorySink};
    use crate::memory::MemoryFileSystem;

    #[test]
    fn measures_drive_of_folder() {
        let fs = MemoryFileSystem::new(200, 150);
        fs.add_dir("/data");
        let sink = MemorySink::new();
        let probe = DriveUsageProbe::new(&fs, &sink, Some(Path::new("/data")));

        let sample = probe.sample().expect("sample");
        assert_eq!(sample.total_bytes, 200);
        assert_eq!(sample.free_bytes, 50);
        assert_eq!(probe.usage_percent(), 75.0);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn unavailable_capacity_reads_as_full() {
        let fs = MemoryFileSystem::new(200, 10);
        fs.set_capacity_unavailable(true);
        let sink = MemorySink::new();
        let probe = DriveUsageProbe::new(&fs, &sink, Some(Path::new("/data")));

        assert_eq!(probe.usage_percent(), FAIL_SAFE_USAGE_PERCENT);
        let errors = sink.of_kind(EventKind::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_kind.as_deref(), Some("drive_query"));
    }

    #[test]
    fn missing_folder_reads_as_full() {
        let fs = MemoryFileSystem::new(200, 10);
        let sink = MemorySink::new();
        let probe = DriveUsageProbe::new(&fs, &sink, None);

        assert!(probe.sample().is_err());
        assert_eq!(probe.usage_percent(), FAIL_SAFE_USAGE_PERCENT);
    }

    #[test]
    fn zero_capacity_is_an_error() {
        let fs = MemoryFileSystem::new(0, 0);
        let sink = MemorySink::new();
        let probe = DriveUsageProbe::new(&fs, &sink, Some(Path::new("/data")));
        assert!(probe.sample().is_err());
    }
}
