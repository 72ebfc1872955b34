/// Docker engine integration
///
/// Lists containers and images through the engine API, reads one-shot stats,
/// and performs stop/remove/rmi. Attribute blobs are projected into flat
/// records by the pure functions at the bottom of this file.

use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, RemoveContainerOptions, StatsOptions,
    StopContainerOptions,
};
use bollard::image::{ListImagesOptions, RemoveImageOptions};
use bollard::models::{ContainerSummary, EndpointSettings, ImageSummary, MountPoint, PortMap};
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

#[cfg(test)]
use mockall::automock;

use crate::core::error::PanelResult;
use crate::utils::{format_elapsed, ContainerState, DOCKER_ZERO_TIME, UNTAGGED};

/// How long a container has been running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Uptime {
    Elapsed(u64),
    /// Never started, or the start time could not be read
    Unavailable,
}

impl Uptime {
    pub fn from_started_at(started_at: Option<&str>, now: DateTime<Utc>) -> Self {
        let Some(raw) = started_at.map(str::trim).filter(|s| !s.is_empty()) else {
            return Uptime::Unavailable;
        };
        if raw == DOCKER_ZERO_TIME {
            return Uptime::Unavailable;
        }

        match DateTime::parse_from_rfc3339(raw) {
            Ok(started) if started.timestamp() > 0 => {
                let seconds = (now - started.with_timezone(&Utc)).num_seconds().max(0);
                Uptime::Elapsed(seconds as u64)
            }
            _ => Uptime::Unavailable,
        }
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uptime::Elapsed(seconds) => write!(f, "{}", format_elapsed(*seconds)),
            Uptime::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A published port of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    pub container: String,
    pub host_ip: Option<String>,
    /// `None` when the engine has not assigned a host port yet
    pub host_port: Option<u16>,
    /// Port and protocol as the engine reports it, e.g. `80/tcp`
    pub container_port: String,
    pub status: String,
}

impl PortBinding {
    pub fn host_port_label(&self) -> String {
        self.host_port.map_or_else(|| "-".to_string(), |port| port.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    /// Image reference the container was created from
    pub image: String,
    pub image_id: String,
    pub status: String,
    pub state: ContainerState,
    pub memory_usage: u64,
    pub ports: Vec<PortBinding>,
    pub mounts: Vec<String>,
    pub networks: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub started_at: Option<String>,
    pub uptime: Uptime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub id: String,
    pub short_id: String,
    pub tags: Vec<String>,
    pub size: u64,
    pub created: i64,
    pub dangling: bool,
}

impl ImageRecord {
    pub fn first_tag(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or(UNTAGGED)
    }
}

impl From<ImageSummary> for ImageRecord {
    fn from(summary: ImageSummary) -> Self {
        let tags: Vec<String> = summary
            .repo_tags
            .into_iter()
            .filter(|tag| tag != "<none>:<none>")
            .collect();

        Self {
            short_id: short_id(&summary.id),
            dangling: tags.is_empty(),
            id: summary.id,
            tags,
            size: summary.size.max(0) as u64,
            created: summary.created,
        }
    }
}

/// Twelve-character id as shown by the docker CLI
pub fn short_id(id: &str) -> String {
    id.trim_start_matches("sha256:").chars().take(12).collect()
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_containers(&self, include_stopped: bool) -> PanelResult<Vec<ContainerRecord>>;
    async fn stop(&self, name: &str) -> PanelResult<()>;
    async fn remove(&self, name: &str, force: bool) -> PanelResult<()>;
    async fn list_images(&self) -> PanelResult<Vec<ImageRecord>>;
    async fn dangling_images(&self) -> PanelResult<Vec<ImageRecord>>;
    async fn remove_image(&self, id: &str) -> PanelResult<()>;
}

#[derive(Clone)]
pub struct DockerManager {
    docker: Docker,
}

impl DockerManager {
    /// Connect to the local engine socket
    pub fn connect() -> PanelResult<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    /// Check that the engine answers
    pub async fn ping(&self) -> PanelResult<()> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn memory_usage(&self, id: &str) -> PanelResult<u64> {
        let mut stream = self.docker.stats(
            id,
            Some(StatsOptions {
                stream: false,
                one_shot: true,
            }),
        );

        match stream.next().await {
            Some(stats) => Ok(stats?.memory_stats.usage.unwrap_or(0)),
            None => Ok(0),
        }
    }

    async fn build_record(&self, summary: ContainerSummary) -> PanelResult<ContainerRecord> {
        let id = summary.id.clone().unwrap_or_default();
        let name = container_name(&summary);
        let status = summary.status.clone().unwrap_or_default();
        let state = ContainerState::from(summary.state.as_deref().unwrap_or("unknown"));

        let inspect = self
            .docker
            .inspect_container(&id, None::<InspectContainerOptions>)
            .await?;
        let memory_usage = self.memory_usage(&id).await?;

        let network_settings = inspect.network_settings.as_ref();
        let started_at = inspect.state.as_ref().and_then(|s| s.started_at.clone());
        let created = inspect
            .created
            .as_deref()
            .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
            .map(|c| c.with_timezone(&Utc));

        Ok(ContainerRecord {
            ports: exposed_ports(&name, &status, network_settings.and_then(|n| n.ports.as_ref())),
            mounts: mount_destinations(inspect.mounts.as_deref()),
            networks: network_names(network_settings.and_then(|n| n.networks.as_ref())),
            uptime: Uptime::from_started_at(started_at.as_deref(), Utc::now()),
            image: summary.image.clone().unwrap_or_default(),
            image_id: summary.image_id.clone().unwrap_or_default(),
            id,
            name,
            status,
            state,
            memory_usage,
            created,
            started_at,
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerManager {
    async fn list_containers(&self, include_stopped: bool) -> PanelResult<Vec<ContainerRecord>> {
        let options = Some(ListContainersOptions::<String> {
            all: include_stopped,
            ..Default::default()
        });

        let summaries = self.docker.list_containers(options).await?;
        tracing::debug!(count = summaries.len(), include_stopped, "containers listed");

        // Inspect and stats are read one container at a time
        let mut records = Vec::with_capacity(summaries.len());
        for summary in summaries {
            records.push(self.build_record(summary).await?);
        }

        Ok(records)
    }

    async fn stop(&self, name: &str) -> PanelResult<()> {
        tracing::info!(container = name, "stopping container");
        self.docker
            .stop_container(name, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    async fn remove(&self, name: &str, force: bool) -> PanelResult<()> {
        tracing::info!(container = name, force, "removing container");
        let options = Some(RemoveContainerOptions {
            force,
            ..Default::default()
        });
        self.docker.remove_container(name, options).await?;
        Ok(())
    }

    async fn list_images(&self) -> PanelResult<Vec<ImageRecord>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await?;
        tracing::debug!(count = images.len(), "images listed");

        Ok(images.into_iter().map(ImageRecord::from).collect())
    }

    async fn dangling_images(&self) -> PanelResult<Vec<ImageRecord>> {
        let mut filters = HashMap::new();
        filters.insert("dangling".to_string(), vec!["true".to_string()]);

        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                filters,
                ..Default::default()
            }))
            .await?;
        tracing::debug!(count = images.len(), "dangling images listed");

        Ok(images
            .into_iter()
            .map(|summary| ImageRecord {
                dangling: true,
                ..ImageRecord::from(summary)
            })
            .collect())
    }

    async fn remove_image(&self, id: &str) -> PanelResult<()> {
        tracing::info!(image = id, "removing image");
        self.docker
            .remove_image(id, None::<RemoveImageOptions>, None)
            .await?;
        Ok(())
    }
}

fn container_name(summary: &ContainerSummary) -> String {
    summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .or_else(|| summary.id.as_deref().map(short_id))
        .unwrap_or_default()
}

/// Leading number of `80/tcp`
fn port_number(container_port: &str) -> u16 {
    container_port
        .split('/')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0)
}

/// One binding per distinct (host port, container port), ordered by container
/// port then host port
///
/// A binding whose host port is empty or not a number is kept with no host
/// port, so the published container port still shows up.
pub fn exposed_ports(container: &str, status: &str, ports: Option<&PortMap>) -> Vec<PortBinding> {
    let Some(ports) = ports else {
        return Vec::new();
    };

    let mut seen: HashSet<(Option<u16>, String)> = HashSet::new();
    let mut bindings = Vec::new();

    for (container_port, host_bindings) in ports {
        let Some(host_bindings) = host_bindings else {
            continue;
        };

        for binding in host_bindings {
            let raw = binding.host_port.as_deref().unwrap_or_default().trim();
            let host_port = raw.parse::<u16>().ok();
            if host_port.is_none() {
                tracing::debug!(container, container_port = %container_port, host_port = raw, "binding has no usable host port");
            }

            if !seen.insert((host_port, container_port.clone())) {
                continue;
            }

            bindings.push(PortBinding {
                container: container.to_string(),
                host_ip: binding.host_ip.clone().filter(|ip| !ip.is_empty()),
                host_port,
                container_port: container_port.clone(),
                status: status.to_string(),
            });
        }
    }

    bindings.sort_by(|a, b| {
        (port_number(&a.container_port), &a.container_port, a.host_port).cmp(&(
            port_number(&b.container_port),
            &b.container_port,
            b.host_port,
        ))
    });
    bindings
}

pub fn mount_destinations(mounts: Option<&[MountPoint]>) -> Vec<String> {
    mounts
        .unwrap_or_default()
        .iter()
        .filter_map(|m| m.destination.clone())
        .collect()
}

pub fn network_names(networks: Option<&HashMap<String, EndpointSettings>>) -> Vec<String> {
    let mut names: Vec<String> = networks
        .map(|nets| nets.keys().cloned().collect())
        .unwrap_or_default();
    names.sort();
    names
}
