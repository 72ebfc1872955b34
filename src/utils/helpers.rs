/// Helper utilities for display formatting

use chrono::{DateTime, Local, Utc};

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Bytes expressed in gibibytes (disk metrics, displayed with two decimals)
pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

/// Bytes expressed in mebibytes, rounded to two decimals (container memory)
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Format an elapsed time as `H:MM:SS`, with a `N day(s), ` prefix past 24 hours
pub fn format_elapsed(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let clock = format!("{}:{:02}:{:02}", hours, minutes, secs);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

/// Format a UTC timestamp as `YYYY-MM-DD HH:MM:SS`
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a unix timestamp in local time
pub fn format_timestamp(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => {
            let local: DateTime<Local> = dt.into();
            local.format("%Y-%m-%d %H:%M:%S").to_string()
        }
        None => "-".to_string(),
    }
}

/// Truncate string with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Join a list for a table cell, falling back to a placeholder when empty
pub fn join_or(items: &[String], placeholder: &str) -> String {
    if items.is_empty() {
        placeholder.to_string()
    } else {
        items.join(", ")
    }
}

/// Container status as reported by the runtime, simplified for coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Stopped,
    Paused,
    Restarting,
    Dead,
    Created,
    Unknown,
}

impl From<&str> for ContainerState {
    fn from(status: &str) -> Self {
        let status_lower = status.to_lowercase();
        if status_lower.contains("running") || status_lower.starts_with("up") {
            ContainerState::Running
        } else if status_lower.contains("paused") {
            ContainerState::Paused
        } else if status_lower.contains("restarting") {
            ContainerState::Restarting
        } else if status_lower.contains("dead") || status_lower.contains("removing") {
            ContainerState::Dead
        } else if status_lower.contains("exited") || status_lower.contains("stopped") {
            ContainerState::Stopped
        } else if status_lower.contains("created") {
            ContainerState::Created
        } else {
            ContainerState::Unknown
        }
    }
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }

    /// Color name for CLI output
    pub fn color(&self) -> &'static str {
        match self {
            ContainerState::Running => "green",
            ContainerState::Stopped => "red",
            ContainerState::Paused => "yellow",
            ContainerState::Restarting => "cyan",
            ContainerState::Dead => "red",
            ContainerState::Created => "white",
            ContainerState::Unknown => "white",
        }
    }
}
