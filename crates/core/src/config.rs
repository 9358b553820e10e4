use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CleanerError;
use crate::events::EventSink;

pub const CONFIG_FILE_NAME: &str = "disk_cleaner_config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanerConfig {
    #[serde(alias = "FoldersPaths")]
    pub folders_paths: Vec<PathBuf>,
    #[serde(alias = "DiskUsageThreshold")]
    pub disk_usage_threshold: u8,
    #[serde(alias = "LogRetentionDays")]
    pub log_retention_days: u32,
    #[serde(alias = "ReserveFolderPath", skip_serializing_if = "Option::is_none")]
    pub reserve_folder: Option<PathBuf>,
    #[serde(alias = "MinFileAgeMinutes")]
    pub min_file_age_minutes: u64,
}

fn default_disk_usage_threshold() -> u8 {
    80
}

fn default_log_retention_days() -> u32 {
    10
}

fn default_min_file_age_minutes() -> u64 {
    60
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            folders_paths: Vec::new(),
            disk_usage_threshold: default_disk_usage_threshold(),
            log_retention_days: default_log_retention_days(),
            reserve_folder: None,
            min_file_age_minutes: default_min_file_age_minutes(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    Direct,
    Reserve,
}

impl CleanerConfig {
    pub fn example() -> Self {
        Self {
            folders_paths: example_folders(),
            ..Self::default()
        }
    }

    pub fn mode(&self) -> CleanupMode {
        if self.reserve_folder.is_some() {
            CleanupMode::Reserve
        } else {
            CleanupMode::Direct
        }
    }

    pub fn threshold_percent(&self) -> f64 {
        f64::from(self.disk_usage_threshold.min(100))
    }

    pub fn probe_folder(&self) -> Option<&Path> {
        match &self.reserve_folder {
            Some(reserve) => Some(reserve.as_path()),
            None => self.folders_paths.first().map(PathBuf::as_path),
        }
    }

    fn normalized(mut self) -> Self {
        self.disk_usage_threshold = self.disk_usage_threshold.min(100);
        self
    }
}

#[cfg(windows)]
fn example_folders() -> Vec<PathBuf> {
    vec![PathBuf::from(r"C:\Temp"), PathBuf::from(r"C:\Logs")]
}

#[cfg(not(windows))]
fn example_folders() -> Vec<PathBuf> {
    vec![PathBuf::from("/var/tmp"), PathBuf::from("/var/log/archive")]
}

pub fn read_config(path: &Path) -> Result<CleanerConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: CleanerConfig = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config.normalized())
}

pub fn write_config(config: &CleanerConfig, path: &Path) -> Result<()> {
    let payload =
        serde_json::to_string_pretty(config).context("failed to serialize configuration")?;
    fs::write(path, payload)
        .with_context(|| format!("failed to write configuration to {}", path.display()))?;
    Ok(())
}

pub fn load_or_create(path: &Path, sink: &dyn EventSink) -> CleanerConfig {
    if !path.exists() {
        let config = CleanerConfig::example();
        match write_config(&config, path) {
            Ok(()) => sink.info(&format!(
                "Created default configuration at {}",
                path.display()
            )),
            Err(err) => sink.report(&CleanerError::Config(format!("{err:#}"))),
        }
        return config;
    }

    match read_config(path) {
        Ok(config) => config,
        Err(err) => {
            sink.report(&CleanerError::Config(format!("{err:#}")));
            CleanerConfig::default()
        }
    }
}
