use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("drive query failed for {path}: {reason}")]
    DriveQuery { path: PathBuf, reason: String },

    #[error("file operation failed for {path}: {source}")]
    CandidateIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("folder access failed for {path}: {source}")]
    FolderAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CleanerError {
    pub fn drive_query(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DriveQuery {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn candidate_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CandidateIo {
            path: path.into(),
            source,
        }
    }

    pub fn folder_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FolderAccess {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::DriveQuery { .. } => "drive_query",
            Self::CandidateIo { .. } => "candidate_io",
            Self::FolderAccess { .. } => "folder_access",
        }
    }
}
