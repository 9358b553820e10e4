use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created: DateTime<Utc>,
}

impl FileCandidate {
    /// Oldest first; equal creation times fall back to lexical path order.
    pub fn age_order(&self, other: &Self) -> Ordering {
        self.created
            .cmp(&other.created)
            .then_with(|| self.path.cmp(&other.path))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriveUsageSample {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

impl DriveUsageSample {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }

    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    ThresholdReached,
    Exhausted,
    NoProgress,
    Cancelled,
}

impl TerminalReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::ThresholdReached => "usage is at or below the threshold",
            Self::Exhausted => "no more files to delete",
            Self::NoProgress => "no file could be removed in the last iteration",
            Self::Cancelled => "cancelled by caller",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReclaimOutcome {
    pub freed_bytes: u64,
    pub iterations: u64,
    pub removed_files: Vec<PathBuf>,
    pub final_usage_percent: f64,
    pub reason: TerminalReason,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelocationSummary {
    pub moved_files: u64,
    pub moved_bytes: u64,
    pub failed_files: u64,
    pub skipped_folders: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub initial_usage_percent: Option<f64>,
    pub relocation: Option<RelocationSummary>,
    pub reclaim: Option<ReclaimOutcome>,
}

pub fn human_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if value == 0 {
        return "0 B".to_string();
    }
    let mut size = value as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2} {}", UNITS[unit])
}
