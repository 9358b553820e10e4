use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::fs::FileSystem;
use crate::model::{DriveUsageSample, FileCandidate};

#[derive(Debug, Clone)]
struct MemoryFile {
    size_bytes: u64,
    created: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, MemoryFile>,
    dirs: BTreeSet<PathBuf>,
    total_bytes: u64,
    used_bytes: u64,
    locked_files: BTreeSet<PathBuf>,
    unreadable_dirs: BTreeSet<PathBuf>,
    capacity_unavailable: bool,
    capacity_queries: u64,
}

#[derive(Debug)]
pub struct MemoryFileSystem {
    root: PathBuf,
    state: Mutex<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new(total_bytes: u64, used_bytes: u64) -> Self {
        let root = PathBuf::from("/");
        let mut dirs = BTreeSet::new();
        dirs.insert(root.clone());
        Self {
            root,
            state: Mutex::new(MemoryState {
                dirs,
                total_bytes,
                used_bytes,
                ..MemoryState::default()
            }),
        }
    }

    pub fn add_dir(&self, dir: impl AsRef<Path>) {
        let mut state = self.lock();
        insert_dir_all(&mut state, dir.as_ref());
    }

    pub fn add_file(&self, path: impl AsRef<Path>, size_bytes: u64, created: DateTime<Utc>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            insert_dir_all(&mut state, parent);
        }
        state.files.insert(
            path.to_path_buf(),
            MemoryFile {
                size_bytes,
                created,
            },
        );
    }

    pub fn lock_file(&self, path: impl AsRef<Path>) {
        self.lock().locked_files.insert(path.as_ref().to_path_buf());
    }

    pub fn deny_listing(&self, dir: impl AsRef<Path>) {
        self.lock()
            .unreadable_dirs
            .insert(dir.as_ref().to_path_buf());
    }

    pub fn set_capacity_unavailable(&self, unavailable: bool) {
        self.lock().capacity_unavailable = unavailable;
    }

    pub fn set_used_bytes(&self, used_bytes: u64) {
        self.lock().used_bytes = used_bytes;
    }

    pub fn used_percent(&self) -> f64 {
        let state = self.lock();
        DriveUsageSample {
            total_bytes: state.total_bytes,
            free_bytes: state.total_bytes.saturating_sub(state.used_bytes),
        }
        .used_percent()
    }

    pub fn capacity_queries(&self) -> u64 {
        self.lock().capacity_queries
    }

    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn contains_file(&self, path: impl AsRef<Path>) -> bool {
        self.lock().files.contains_key(path.as_ref())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // Test-only state; a poisoned lock still holds consistent data.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn insert_dir_all(state: &mut MemoryState, dir: &Path) {
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        state.dirs.insert(ancestor.to_path_buf());
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

fn readable_dir(state: &MemoryState, dir: &Path) -> io::Result<()> {
    if !state.dirs.contains(dir) {
        return Err(not_found(dir));
    }
    if state.unreadable_dirs.contains(dir) {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("access to {} denied", dir.display()),
        ));
    }
    Ok(())
}

impl FileSystem for MemoryFileSystem {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<FileCandidate>> {
        let state = self.lock();
        readable_dir(&state, dir)?;
        Ok(state
            .files
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, file)| FileCandidate {
                path: path.clone(),
                size_bytes: file.size_bytes,
                created: file.created,
            })
            .collect())
    }

    fn list_subdirs(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.lock();
        readable_dir(&state, dir)?;
        Ok(state
            .dirs
            .iter()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.files.contains_key(dir) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", dir.display()),
            ));
        }
        insert_dir_all(&mut state, dir);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.locked_files.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is locked", path.display()),
            ));
        }
        let file = state.files.remove(path).ok_or_else(|| not_found(path))?;
        state.used_bytes = state.used_bytes.saturating_sub(file.size_bytes);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.locked_files.contains(from) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is locked", from.display()),
            ));
        }
        let parent_exists = to.parent().is_some_and(|parent| state.dirs.contains(parent));
        if !parent_exists {
            return Err(not_found(to));
        }
        let file = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn drive_root(&self, path: &Path) -> io::Result<PathBuf> {
        if path.starts_with(&self.root) {
            Ok(self.root.clone())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not on the simulated drive", path.display()),
            ))
        }
    }

    fn capacity(&self, root: &Path) -> io::Result<DriveUsageSample> {
        let mut state = self.lock();
        state.capacity_queries += 1;
        if state.capacity_unavailable || root != self.root {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "drive metadata unavailable",
            ));
        }
        Ok(DriveUsageSample {
            total_bytes: state.total_bytes,
            free_bytes: state.total_bytes.saturating_sub(state.used_bytes),
        })
    }
}
