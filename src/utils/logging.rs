/// Tracing subscriber setup
///
/// CLI and server modes log to stderr. The TUI owns the terminal, so in that
/// mode events go to a log file next to the config instead.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Log to stderr, honoring RUST_LOG
pub fn init_stderr(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log file used while the TUI is running
pub fn log_file_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("vps-panel");
    std::fs::create_dir_all(&dir).context("Failed to create log directory")?;
    Ok(dir.join("vps-panel.log"))
}

/// Log to a file so the alternate screen stays clean
pub fn init_file(default_directive: &str) -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();

    Ok(path)
}
