pub mod config;
pub mod error;
pub mod events;
pub mod fs;
pub mod logs;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod probe;
pub mod reclaim;
pub mod relocate;
pub mod select;

pub use config::{load_or_create, read_config, write_config, CleanerConfig, CleanupMode, CONFIG_FILE_NAME};
pub use error::CleanerError;
pub use events::{CleanupEvent, EventKind, EventSink, MemorySink, TracingSink};
pub use fs::{FileSystem, LocalFileSystem};
pub use logs::{
    log_file_name, parse_log_date, LogFile, LogHousekeeper, LogSummary, LogSweep, LOG_FILE_PREFIX,
    LOG_FILE_SUFFIX,
};
pub use memory::MemoryFileSystem;
pub use model::{
    human_bytes, DriveUsageSample, FileCandidate, ReclaimOutcome, RelocationSummary, RunSummary,
    TerminalReason,
};
pub use orchestrator::{run_cleanup, RunOptions};
pub use probe::{DriveUsageProbe, FAIL_SAFE_USAGE_PERCENT};
pub use reclaim::{CandidateSource, FixedDelay, NoDelay, Pacer, ReclaimLoop, DEFAULT_PACING};
pub use relocate::{unique_destination, RelocationStage};
pub use select::VictimSelector;
