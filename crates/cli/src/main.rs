use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use disk_cleaner_core::{
    load_or_create, run_cleanup, LocalFileSystem, RunOptions, TracingSink, CONFIG_FILE_NAME,
    DEFAULT_PACING,
};

mod logging;

#[derive(Debug, Parser)]
#[command(
    name = "disk-cleaner",
    version,
    about = "Delete the oldest files in configured folders until disk usage drops below a threshold."
)]
struct Cli {
    /// Configuration file. Defaults to disk_cleaner_config.json next to the executable.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for the cleaner's own log files. Defaults to logs/ next to the executable.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Seconds to wait before the process exits.
    #[arg(long, default_value_t = 5)]
    exit_delay_secs: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let exe_dir = executable_dir();
    let base_dir = exe_dir
        .as_ref()
        .map(PathBuf::clone)
        .unwrap_or_else(|_| PathBuf::from("."));
    let log_dir = cli.log_dir.clone().unwrap_or_else(|| base_dir.join("logs"));

    let (_guard, logging_error) = logging::init_tracing(&log_dir);
    if let Some(err) = logging_error {
        tracing::error!(kind = "ERROR", "File logging unavailable: {err:#}");
    }
    if let Err(err) = &exe_dir {
        tracing::error!(
            kind = "ERROR",
            "Critical error: {err:#}; using the working directory instead"
        );
    }

    let sink = TracingSink;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| base_dir.join(CONFIG_FILE_NAME));
    let config = load_or_create(&config_path, &sink);

    let options = RunOptions {
        log_dir: Some(log_dir),
        pacing: DEFAULT_PACING,
        ..RunOptions::default()
    };
    let summary = run_cleanup(&config, &LocalFileSystem::new(), &sink, &options);
    tracing::debug!(run_id = %summary.run_id, "run finished");

    println!(
        "Disk cleanup done. Exiting in {} second(s)...",
        cli.exit_delay_secs
    );
    thread::sleep(Duration::from_secs(cli.exit_delay_secs));
    Ok(())
}

fn executable_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("failed to locate the running executable")?;
    exe.parent()
        .map(PathBuf::from)
        .context("executable path has no parent directory")
}
