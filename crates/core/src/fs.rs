use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sysinfo::Disks;
use walkdir::WalkDir;

use crate::model::{DriveUsageSample, FileCandidate};

pub trait FileSystem {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<FileCandidate>>;

    fn list_subdirs(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn drive_root(&self, path: &Path) -> io::Result<PathBuf>;

    fn capacity(&self, root: &Path) -> io::Result<DriveUsageSample>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<FileCandidate>> {
        ensure_directory(dir)?;

        let mut files = Vec::new();
        for item in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => return Err(err.into()),
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            // Birth time is not recorded by every filesystem.
            let Ok(created) = metadata.created().or_else(|_| metadata.modified()) else {
                continue;
            };
            files.push(FileCandidate {
                path: entry.into_path(),
                size_bytes: metadata.len(),
                created: DateTime::<Utc>::from(created),
            });
        }
        Ok(files)
    }

    fn list_subdirs(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        ensure_directory(dir)?;

        let mut dirs = Vec::new();
        for item in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            match item {
                Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
                Ok(_) => {}
                Err(err) if err.depth() == 0 => return Err(err.into()),
                Err(_) => {}
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if is_cross_device(&err) => copy_then_remove(from, to),
            Err(err) => Err(err),
        }
    }

    fn drive_root(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = absolute_path(path)?;
        let disks = Disks::new_with_refreshed_list();
        match_mount_point(
            &absolute,
            disks.list().iter().map(|disk| disk.mount_point()),
        )
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no mounted drive contains {}", absolute.display()),
            )
        })
    }

    fn capacity(&self, root: &Path) -> io::Result<DriveUsageSample> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == root)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("drive {} is not mounted", root.display()),
                )
            })?;
        Ok(DriveUsageSample {
            total_bytes: disk.total_space(),
            free_bytes: disk.available_space(),
        })
    }
}

#[cfg(windows)]
const CROSS_DEVICE_ERROR: i32 = 17; // ERROR_NOT_SAME_DEVICE

#[cfg(not(windows))]
const CROSS_DEVICE_ERROR: i32 = 18; // EXDEV

fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(CROSS_DEVICE_ERROR)
}

/// Move between drives. The destination never outlives a failed move, so a
/// file exists in exactly one place afterwards.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let result = fs::copy(from, to).and_then(|_| fs::remove_file(from));
    if result.is_err() {
        let _ = fs::remove_file(to);
    }
    result
}

fn ensure_directory(dir: &Path) -> io::Result<()> {
    let metadata = fs::metadata(dir)?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", dir.display()),
        ))
    }
}

fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(canonical) => Ok(canonical),
        Err(_) if path.is_absolute() => Ok(path.to_path_buf()),
        Err(_) => Ok(std::env::current_dir()?.join(path)),
    }
}

fn match_mount_point<'a>(
    path: &Path,
    mounts: impl Iterator<Item = &'a Path>,
) -> Option<PathBuf> {
    let mut best: Option<(&Path, usize)> = None;
    for mount in mounts {
        if !path.starts_with(mount) {
            continue;
        }
        let score = mount.as_os_str().len();
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((mount, score)),
        }
    }
    best.map(|(mount, _)| mount.to_path_buf())
}
