/// Host inspection: disk usage, listening sockets and their owning processes
///
/// The socket table comes from `ss`, the process table from sysinfo. The two
/// are read one after the other, so a process may exit in between; such
/// sockets are reported as omitted instead of failing the whole listing.

use async_trait::async_trait;
use nix::sys::statvfs::statvfs;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use sysinfo::{Disks, Pid, System};
use tokio::process::Command;

#[cfg(test)]
use mockall::automock;

use crate::core::error::{PanelError, PanelResult};

/// Usage of the filesystem containing a given path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    /// Computed once here; every surface displays this value as-is
    pub percent: f64,
}

impl DiskUsage {
    /// Build from statvfs-style figures: `free` counts reserved blocks, `available` does not
    ///
    /// Used space is `total - free`, and the percentage is taken over
    /// `used + available`, matching what `df` prints.
    pub fn from_space(
        mount_point: impl Into<String>,
        total_bytes: u64,
        free_bytes: u64,
        available_bytes: u64,
    ) -> Self {
        let free_bytes = free_bytes.min(total_bytes);
        let available_bytes = available_bytes.min(free_bytes);
        let used_bytes = total_bytes - free_bytes;
        let denominator = used_bytes + available_bytes;

        let percent = if denominator > 0 {
            (used_bytes as f64 / denominator as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            mount_point: mount_point.into(),
            total_bytes,
            used_bytes,
            available_bytes,
            percent,
        }
    }
}

/// A TCP socket in LISTEN state with its owning process resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListeningSocket {
    pub port: u16,
    pub pid: u32,
    pub process_name: String,
    pub command_line: String,
}

/// Why a socket was left out of the resolved listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OmitReason {
    /// The socket table did not expose an owner (usually missing privileges)
    NoOwner,
    /// The owner was gone by the time the process table was read
    ProcessExited { pid: u32 },
}

/// Outcome of a best-effort lookup: a populated record or an explicit omission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    Omitted { port: u16, reason: OmitReason },
}

impl<T> Lookup<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Omitted { .. } => None,
        }
    }

    pub fn is_omitted(&self) -> bool {
        matches!(self, Lookup::Omitted { .. })
    }
}

/// One row of the socket table before process resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketOwner {
    pub port: u16,
    pub pid: Option<u32>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn disk_usage(&self, path: &Path) -> PanelResult<DiskUsage>;
    async fn listening_sockets(&self) -> PanelResult<Vec<Lookup<ListeningSocket>>>;
}

/// Reads the live operating system state
#[derive(Debug, Default, Clone)]
pub struct HostInspector;

impl HostInspector {
    pub fn new() -> Self {
        Self
    }

    async fn read_socket_table(&self) -> PanelResult<String> {
        let output = Command::new("ss")
            .args(["-H", "-l", "-t", "-n", "-p"])
            .output()
            .await
            .map_err(|e| PanelError::SocketTable(format!("failed to run ss: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PanelError::SocketTable(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl HostProbe for HostInspector {
    async fn disk_usage(&self, path: &Path) -> PanelResult<DiskUsage> {
        let target = std::fs::canonicalize(path).map_err(|e| PanelError::io(path, e))?;

        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<PathBuf> = disks
            .list()
            .iter()
            .map(|d| d.mount_point().to_path_buf())
            .collect();

        let index = longest_mount_prefix(&mounts, &target)
            .ok_or_else(|| PanelError::MountNotFound(target.clone()))?;
        let disk = &disks.list()[index];

        let stat = statvfs(&target).map_err(|e| PanelError::io(&target, e.into()))?;
        let fragment = stat.fragment_size() as u64;

        let usage = DiskUsage::from_space(
            disk.mount_point().display().to_string(),
            stat.blocks() as u64 * fragment,
            stat.blocks_free() as u64 * fragment,
            stat.blocks_available() as u64 * fragment,
        );
        tracing::debug!(mount = %usage.mount_point, percent = usage.percent, "disk usage read");

        Ok(usage)
    }

    async fn listening_sockets(&self) -> PanelResult<Vec<Lookup<ListeningSocket>>> {
        let table = self.read_socket_table().await?;
        let owners = parse_ss_listeners(&table);

        // Process table is read after the socket table
        let mut system = System::new();
        let sockets = owners
            .into_iter()
            .map(|owner| resolve_owner(&mut system, owner))
            .collect::<Vec<_>>();

        let omitted = sockets.iter().filter(|s| s.is_omitted()).count();
        tracing::debug!(total = sockets.len(), omitted, "listening sockets read");

        Ok(sockets)
    }
}

fn resolve_owner(system: &mut System, owner: SocketOwner) -> Lookup<ListeningSocket> {
    let Some(pid) = owner.pid else {
        return Lookup::Omitted {
            port: owner.port,
            reason: OmitReason::NoOwner,
        };
    };

    let sys_pid = Pid::from_u32(pid);
    if !system.refresh_process(sys_pid) {
        return Lookup::Omitted {
            port: owner.port,
            reason: OmitReason::ProcessExited { pid },
        };
    }

    match system.process(sys_pid) {
        Some(process) => Lookup::Found(ListeningSocket {
            port: owner.port,
            pid,
            process_name: process.name().to_string(),
            command_line: process.cmd().join(" "),
        }),
        None => Lookup::Omitted {
            port: owner.port,
            reason: OmitReason::ProcessExited { pid },
        },
    }
}

/// Index of the mount point that is the longest prefix of `target`
pub fn longest_mount_prefix(mounts: &[PathBuf], target: &Path) -> Option<usize> {
    mounts
        .iter()
        .enumerate()
        .filter(|(_, mount)| target.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(index, _)| index)
}

fn pid_pattern() -> &'static Regex {
    static PID_RE: OnceLock<Regex> = OnceLock::new();
    PID_RE.get_or_init(|| Regex::new(r"pid=(\d+)").expect("pid pattern is valid"))
}

/// Parse `ss -H -l -t -n -p` output into (port, pid) rows
///
/// Lines look like:
/// `LISTEN 0 4096 0.0.0.0:22 0.0.0.0:* users:(("sshd",pid=812,fd=3))`
/// A socket shared by several processes yields one row per pid.
pub fn parse_ss_listeners(output: &str) -> Vec<SocketOwner> {
    let mut owners = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 || parts[0] != "LISTEN" {
            continue;
        }

        let port = match parts[3].rsplit(':').next().and_then(|p| p.parse::<u16>().ok()) {
            Some(port) => port,
            None => continue,
        };

        let pids: Vec<u32> = pid_pattern()
            .captures_iter(line)
            .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
            .collect();

        if pids.is_empty() {
            owners.push(SocketOwner { port, pid: None });
        } else {
            owners.extend(pids.into_iter().map(|pid| SocketOwner { port, pid: Some(pid) }));
        }
    }

    owners
}
