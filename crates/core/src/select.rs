use std::path::{Path, PathBuf};

use crate::error::CleanerError;
use crate::events::EventSink;
use crate::fs::FileSystem;
use crate::model::FileCandidate;

pub struct VictimSelector<'a> {
    fs: &'a dyn FileSystem,
    sink: &'a dyn EventSink,
}

impl<'a> VictimSelector<'a> {
    pub fn new(fs: &'a dyn FileSystem, sink: &'a dyn EventSink) -> Self {
        Self { fs, sink }
    }

    pub fn oldest_per_folder(&self, folders: &[PathBuf]) -> Vec<FileCandidate> {
        let mut batch = folders
            .iter()
            .filter_map(|folder| self.oldest_in_folder(folder))
            .collect::<Vec<_>>();
        batch.sort_by(FileCandidate::age_order);
        batch
    }

    pub fn oldest_across_folders(&self, folders: &[PathBuf]) -> Option<FileCandidate> {
        self.oldest_per_folder(folders).into_iter().next()
    }

    /// Oldest file across the immediate subfolders of the reserve root.
    /// Files lying directly in the root are not candidates.
    pub fn oldest_in_reserve(&self, reserve_root: &Path) -> Option<FileCandidate> {
        let subdirs = match self.fs.list_subdirs(reserve_root) {
            Ok(subdirs) => subdirs,
            Err(err) => {
                self.sink
                    .report(&CleanerError::folder_access(reserve_root, err));
                return None;
            }
        };
        self.oldest_across_folders(&subdirs)
    }

    fn oldest_in_folder(&self, folder: &Path) -> Option<FileCandidate> {
        match self.fs.list_files(folder) {
            Ok(files) => files.into_iter().min_by(FileCandidate::age_order),
            Err(err) => {
                self.sink.report(&CleanerError::folder_access(folder, err));
                None
            }
        }
    }
}
