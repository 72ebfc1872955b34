/// Inspection pass and operator actions
///
/// `Controller::inspect` reads every component in a fixed order and returns
/// a `Snapshot`. Mutations call their component once per distinct target,
/// collect failures, then run a fresh pass. Nothing is cached in between.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::compose::{ApplyOutcome, ComposeManager, DescriptorState, ProcessOrchestrator};
use crate::core::database::{DatabaseInspector, DatabasePanel, DatabaseProbe};
use crate::core::docker::{ContainerRecord, ContainerRuntime, ImageRecord, PortBinding, Uptime};
use crate::core::docs::read_docs;
use crate::core::error::PanelResult;
use crate::core::host::{DiskUsage, HostInspector, HostProbe, ListeningSocket, Lookup};
use crate::utils::{Settings, UNTAGGED};

/// Everything one inspection pass produced
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub disk: DiskUsage,
    pub containers: Vec<ContainerRecord>,
    pub sockets: Vec<Lookup<ListeningSocket>>,
    pub databases: DatabasePanel,
    pub images: Vec<ImageRecord>,
    pub dangling: Vec<ImageRecord>,
}

/// A published container port and whether the host shows it listening
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRow {
    #[serde(flatten)]
    pub binding: PortBinding,
    pub host_listening: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeRow {
    pub container: String,
    pub mounts: Vec<String>,
    pub networks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UptimeRow {
    pub container: String,
    pub created: Option<DateTime<Utc>>,
    pub uptime: Uptime,
}

impl Snapshot {
    /// Sockets whose owning process was resolved
    pub fn listening(&self) -> Vec<&ListeningSocket> {
        self.sockets.iter().filter_map(Lookup::found).collect()
    }

    pub fn omitted_sockets(&self) -> usize {
        self.sockets.iter().filter(|s| s.is_omitted()).count()
    }

    fn listening_ports(&self) -> HashSet<u16> {
        self.sockets
            .iter()
            .map(|s| match s {
                Lookup::Found(socket) => socket.port,
                Lookup::Omitted { port, .. } => *port,
            })
            .collect()
    }

    /// Exposed container ports cross-referenced with host LISTEN sockets
    pub fn port_rows(&self) -> Vec<PortRow> {
        let listening = self.listening_ports();
        self.containers
            .iter()
            .flat_map(|c| c.ports.iter())
            .map(|binding| PortRow {
                host_listening: binding.host_port.is_some_and(|port| listening.contains(&port)),
                binding: binding.clone(),
            })
            .collect()
    }

    pub fn volume_rows(&self) -> Vec<VolumeRow> {
        self.containers
            .iter()
            .map(|c| VolumeRow {
                container: c.name.clone(),
                mounts: c.mounts.clone(),
                networks: c.networks.clone(),
            })
            .collect()
    }

    pub fn uptime_rows(&self) -> Vec<UptimeRow> {
        self.containers
            .iter()
            .map(|c| UptimeRow {
                container: c.name.clone(),
                created: c.created,
                uptime: c.uptime,
            })
            .collect()
    }

    fn images_by_id(&self) -> HashMap<&str, &ImageRecord> {
        self.images.iter().map(|i| (i.id.as_str(), i)).collect()
    }

    /// Tags of the image a container runs
    pub fn container_tags(&self, container: &ContainerRecord) -> Vec<String> {
        self.images_by_id()
            .get(container.image_id.as_str())
            .map(|image| image.tags.clone())
            .unwrap_or_default()
    }

    /// First tag of each container's image, sorted and deduplicated
    pub fn images_in_use(&self) -> Vec<String> {
        let images = self.images_by_id();
        self.containers
            .iter()
            .map(|c| {
                images
                    .get(c.image_id.as_str())
                    .map(|image| image.first_tag().to_string())
                    .unwrap_or_else(|| UNTAGGED.to_string())
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn container(&self, name: &str) -> Option<&ContainerRecord> {
        self.containers.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFailure {
    pub target: String,
    pub error: String,
}

/// Per-target outcome of one operator action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub action: String,
    pub succeeded: Vec<String>,
    pub failed: Vec<ActionFailure>,
    pub apply: Option<ApplyOutcome>,
}

impl ActionReport {
    fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            ..Default::default()
        }
    }

    fn fail(&mut self, target: &str, error: impl ToString) {
        self.failed.push(ActionFailure {
            target: target.to_string(),
            error: error.to_string(),
        });
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        if let Some(failure) = self.failed.first() {
            let more = if self.failed.len() > 1 {
                format!(" (+{} more)", self.failed.len() - 1)
            } else {
                String::new()
            };
            return format!("{} failed for {}: {}{}", self.action, failure.target, failure.error, more);
        }

        match self.succeeded.len() {
            0 => format!("{}: nothing to do", self.action),
            1 => format!("{}: {}", self.action, self.succeeded[0]),
            n => format!("{}: {} targets", self.action, n),
        }
    }
}

/// Action report plus the refresh that followed it
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub report: ActionReport,
    pub snapshot: Option<Snapshot>,
    pub refresh_error: Option<String>,
}

/// Runs inspection passes and operator actions against injected components
pub struct Controller {
    runtime: Arc<dyn ContainerRuntime>,
    host: Arc<dyn HostProbe>,
    databases: Arc<dyn DatabaseProbe>,
    compose: ComposeManager,
    disk_path: PathBuf,
    docs_path: PathBuf,
}

impl Controller {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        host: Arc<dyn HostProbe>,
        databases: Arc<dyn DatabaseProbe>,
        compose: ComposeManager,
        disk_path: PathBuf,
        docs_path: PathBuf,
    ) -> Self {
        Self {
            runtime,
            host,
            databases,
            compose,
            disk_path,
            docs_path,
        }
    }

    /// Wire the live host, database and orchestration components
    pub fn from_settings(settings: &Settings, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let orchestrator = Arc::new(ProcessOrchestrator::new(settings.compose_command.clone()));
        let compose = ComposeManager::new(
            settings.apps_dir.clone(),
            settings.compose_file_name.clone(),
            orchestrator,
        );

        Self::new(
            runtime,
            Arc::new(HostInspector::new()),
            Arc::new(DatabaseInspector::new(settings.postgres.clone())),
            compose,
            settings.disk_path.clone(),
            settings.docs_path.clone(),
        )
    }

    pub fn compose(&self) -> &ComposeManager {
        &self.compose
    }

    pub fn docs(&self) -> PanelResult<String> {
        read_docs(&self.docs_path)
    }

    pub fn read_descriptor(&self, app: &str) -> PanelResult<DescriptorState> {
        self.compose.read(app)
    }

    /// Candidate applications: directories under apps_dir plus container names
    pub fn app_candidates(&self, snapshot: Option<&Snapshot>) -> PanelResult<Vec<String>> {
        let mut apps: BTreeSet<String> = self.compose.list_apps()?.into_iter().collect();
        if let Some(snapshot) = snapshot {
            apps.extend(snapshot.containers.iter().map(|c| c.name.clone()));
        }
        Ok(apps.into_iter().collect())
    }

    pub async fn disk_usage(&self) -> PanelResult<DiskUsage> {
        self.host.disk_usage(&self.disk_path).await
    }

    /// SQL failures become a displayable warning
    pub async fn database_panel(&self) -> DatabasePanel {
        DatabasePanel::from_result(self.databases.list_databases().await)
    }

    /// One full pass: disk, containers, sockets and processes, SQL, images
    pub async fn inspect(&self) -> PanelResult<Snapshot> {
        let disk = self.disk_usage().await?;
        let containers = self.runtime.list_containers(true).await?;
        let sockets = self.host.listening_sockets().await?;
        let databases = self.database_panel().await;
        let images = self.runtime.list_images().await?;
        let dangling = self.runtime.dangling_images().await?;

        tracing::debug!(
            containers = containers.len(),
            sockets = sockets.len(),
            images = images.len(),
            dangling = dangling.len(),
            "inspection pass complete"
        );

        Ok(Snapshot {
            taken_at: Utc::now(),
            disk,
            containers,
            sockets,
            databases,
            images,
            dangling,
        })
    }

    async fn finish(&self, report: ActionReport) -> ActionResult {
        if report.is_success() {
            tracing::info!(action = %report.action, targets = report.succeeded.len(), "action complete");
        } else {
            tracing::warn!(action = %report.action, failed = report.failed.len(), "action had failures");
        }

        match self.inspect().await {
            Ok(snapshot) => ActionResult {
                report,
                snapshot: Some(snapshot),
                refresh_error: None,
            },
            Err(e) => ActionResult {
                report,
                snapshot: None,
                refresh_error: Some(e.to_string()),
            },
        }
    }

    async fn for_each_target<F, Fut>(&self, action: &str, targets: &[String], op: F) -> ActionResult
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = PanelResult<()>>,
    {
        let mut report = ActionReport::new(action);

        for target in distinct(targets) {
            match op(target.clone()).await {
                Ok(()) => report.succeeded.push(target),
                Err(e) => report.fail(&target, e),
            }
        }

        self.finish(report).await
    }

    pub async fn stop_selected(&self, names: &[String]) -> ActionResult {
        self.for_each_target("stop", names, |name| async move {
            self.runtime.stop(&name).await
        })
        .await
    }

    /// Force-remove the selected containers
    pub async fn remove_selected(&self, names: &[String]) -> ActionResult {
        self.remove_containers(names, true).await
    }

    pub async fn remove_containers(&self, names: &[String], force: bool) -> ActionResult {
        self.for_each_target("remove", names, |name| async move {
            self.runtime.remove(&name, force).await
        })
        .await
    }

    pub async fn remove_image(&self, id: &str) -> ActionResult {
        self.for_each_target("rmi", &[id.to_string()], |id| async move {
            self.runtime.remove_image(&id).await
        })
        .await
    }

    pub async fn save_descriptor(&self, app: &str, content: &str) -> ActionResult {
        let outcome = self.compose.write(app, content).await;
        self.finish(apply_report("save", app, outcome)).await
    }

    pub async fn create_app(&self, app: &str, content: &str) -> ActionResult {
        let outcome = self.compose.create(app, content).await;
        self.finish(apply_report("create", app, outcome)).await
    }
}

fn apply_report(action: &str, app: &str, outcome: PanelResult<ApplyOutcome>) -> ActionReport {
    let mut report = ActionReport::new(action);

    match outcome {
        Ok(outcome) if outcome.success => {
            report.succeeded.push(app.to_string());
            report.apply = Some(outcome);
        }
        Ok(outcome) => {
            report.fail(app, outcome.summary());
            report.apply = Some(outcome);
        }
        Err(e) => report.fail(app, e),
    }

    report
}

/// Trimmed, non-empty targets in first-seen order
fn distinct(targets: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compose::MockOrchestrator;
    use crate::core::database::MockDatabaseProbe;
    use crate::core::docker::MockContainerRuntime;
    use crate::core::error::PanelError;
    use crate::core::host::{MockHostProbe, OmitReason};
    use crate::utils::ContainerState;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use tempfile::TempDir;

    const GB: u64 = 1024 * 1024 * 1024;

    fn container(name: &str, image_id: &str, ports: &[(u16, &str)]) -> ContainerRecord {
        ContainerRecord {
            id: format!("{}-id", name),
            name: name.to_string(),
            image: format!("{}:latest", name),
            image_id: image_id.to_string(),
            status: "Up 3 hours".to_string(),
            state: ContainerState::Running,
            memory_usage: 64 * 1024 * 1024,
            ports: ports
                .iter()
                .map(|(host, inner)| PortBinding {
                    container: name.to_string(),
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(*host),
                    container_port: inner.to_string(),
                    status: "Up 3 hours".to_string(),
                })
                .collect(),
            mounts: vec![format!("/data/{}", name)],
            networks: vec!["bridge".to_string()],
            created: None,
            started_at: None,
            uptime: Uptime::Elapsed(3 * 3600),
        }
    }

    fn image(id: &str, tags: &[&str]) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            short_id: id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            size: 100,
            created: 0,
            dangling: tags.is_empty(),
        }
    }

    fn socket(port: u16, pid: u32, name: &str) -> Lookup<ListeningSocket> {
        Lookup::Found(ListeningSocket {
            port,
            pid,
            process_name: name.to_string(),
            command_line: format!("/usr/bin/{}", name),
        })
    }

    /// Host, database and runtime reads for `passes` inspection passes
    struct Fixture {
        runtime: MockContainerRuntime,
        host: MockHostProbe,
        databases: MockDatabaseProbe,
    }

    impl Fixture {
        fn new(passes: usize) -> Self {
            let mut databases = MockDatabaseProbe::new();
            databases
                .expect_list_databases()
                .times(passes)
                .returning(|| Ok(vec!["app".to_string(), "postgres".to_string()]));

            Self::with_databases(passes, databases)
        }

        fn with_databases(passes: usize, databases: MockDatabaseProbe) -> Self {
            let mut runtime = MockContainerRuntime::new();
            runtime.expect_list_containers().with(eq(true)).times(passes).returning(|_| {
                Ok(vec![
                    container("web", "sha256:nginx", &[(8080, "80/tcp")]),
                    container("db", "sha256:pg", &[(5432, "5432/tcp")]),
                    container("worker", "sha256:gone", &[]),
                ])
            });
            runtime
                .expect_list_images()
                .times(passes)
                .returning(|| Ok(vec![image("sha256:nginx", &["nginx:1.25"]), image("sha256:pg", &["postgres:16", "postgres:latest"])]));
            runtime
                .expect_dangling_images()
                .times(passes)
                .returning(|| Ok(vec![image("sha256:old", &[])]));

            let mut host = MockHostProbe::new();
            host.expect_disk_usage()
                .times(passes)
                .returning(|_| Ok(DiskUsage::from_space("/", 100 * GB, 58 * GB, 58 * GB)));
            host.expect_listening_sockets().times(passes).returning(|| {
                Ok(vec![
                    socket(8080, 900, "docker-proxy"),
                    Lookup::Omitted {
                        port: 22,
                        reason: OmitReason::NoOwner,
                    },
                ])
            });

            Self {
                runtime,
                host,
                databases,
            }
        }

        fn controller(self, dir: &TempDir, orchestrator: MockOrchestrator) -> Controller {
            Controller::new(
                Arc::new(self.runtime),
                Arc::new(self.host),
                Arc::new(self.databases),
                ComposeManager::new(dir.path(), "docker-compose.yml", Arc::new(orchestrator)),
                PathBuf::from("/"),
                dir.path().join("readme.md"),
            )
        }
    }

    fn engine_error(status_code: u16, message: &str) -> PanelError {
        PanelError::Docker(bollard::errors::Error::DockerResponseServerError {
            status_code,
            message: message.to_string(),
        })
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_stop_selected_calls_each_once_then_refreshes() {
        let dir = TempDir::new().unwrap();
        let mut fixture = Fixture::new(1);
        fixture.runtime.expect_stop().with(eq("web")).times(1).returning(|_| Ok(()));
        fixture.runtime.expect_stop().with(eq("db")).times(1).returning(|_| Ok(()));
        fixture.runtime.expect_remove().never();
        fixture.runtime.expect_remove_image().never();
        let controller = fixture.controller(&dir, MockOrchestrator::new());

        let result = controller.stop_selected(&names(&["web", "db", "web", " "])).await;

        assert!(result.report.is_success());
        assert_eq!(result.report.succeeded, names(&["web", "db"]));
        assert!(result.snapshot.is_some());
        assert!(result.refresh_error.is_none());
    }

    #[tokio::test]
    async fn test_remove_selected_forces_and_records_failures() {
        let dir = TempDir::new().unwrap();
        let mut fixture = Fixture::new(1);
        fixture
            .runtime
            .expect_remove()
            .with(eq("web"), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));
        fixture
            .runtime
            .expect_remove()
            .with(eq("ghost"), eq(true))
            .times(1)
            .returning(|_, _| Err(engine_error(404, "No such container: ghost")));
        let controller = fixture.controller(&dir, MockOrchestrator::new());

        let result = controller.remove_selected(&names(&["web", "ghost"])).await;

        assert_eq!(result.report.succeeded, names(&["web"]));
        assert_eq!(result.report.failed.len(), 1);
        assert_eq!(result.report.failed[0].target, "ghost");
        assert!(result.report.summary().starts_with("remove failed for ghost"));
        assert!(result.report.failed[0].error.contains("No such container"));
        assert!(result.snapshot.is_some());
    }

    #[tokio::test]
    async fn test_inspection_order() {
        let mut seq = Sequence::new();
        let mut runtime = MockContainerRuntime::new();
        let mut host = MockHostProbe::new();
        let mut databases = MockDatabaseProbe::new();

        host.expect_disk_usage()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(DiskUsage::from_space("/", 10, 5, 5)));
        runtime
            .expect_list_containers()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));
        host.expect_listening_sockets()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Vec::new()));
        databases
            .expect_list_databases()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Vec::new()));
        runtime
            .expect_list_images()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Vec::new()));
        runtime
            .expect_dangling_images()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Vec::new()));

        let dir = TempDir::new().unwrap();
        let controller = Fixture {
            runtime,
            host,
            databases,
        }
        .controller(&dir, MockOrchestrator::new());

        controller.inspect().await.unwrap();
    }

    #[tokio::test]
    async fn test_sql_failure_is_a_warning_and_other_panels_render() {
        let dir = TempDir::new().unwrap();
        let mut databases = MockDatabaseProbe::new();
        databases.expect_list_databases().times(1).returning(|| {
            Err(PanelError::Database(sqlx::Error::Protocol(
                "password authentication failed for user \"collos\"".to_string(),
            )))
        });
        let controller = Fixture::with_databases(1, databases).controller(&dir, MockOrchestrator::new());

        let snapshot = controller.inspect().await.unwrap();

        let warning = snapshot.databases.warning().unwrap();
        assert!(warning.starts_with("Failed to connect to PostgreSQL"));
        assert!(warning.contains("password authentication failed"));
        assert_eq!(snapshot.containers.len(), 3);
        assert_eq!(snapshot.port_rows().len(), 2);
        assert_eq!(snapshot.dangling.len(), 1);
    }

    #[tokio::test]
    async fn test_disk_percent_comes_from_host_probe() {
        let dir = TempDir::new().unwrap();
        let controller = Fixture::new(1).controller(&dir, MockOrchestrator::new());

        let snapshot = controller.inspect().await.unwrap();
        assert_eq!(snapshot.disk.percent, 42.0);
        assert_eq!(snapshot.disk, DiskUsage::from_space("/", 100 * GB, 58 * GB, 58 * GB));
    }

    #[tokio::test]
    async fn test_runtime_failure_fails_the_pass() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_list_containers()
            .returning(|_| Err(engine_error(500, "engine unreachable")));
        let mut host = MockHostProbe::new();
        host.expect_disk_usage()
            .returning(|_| Ok(DiskUsage::from_space("/", 10, 5, 5)));

        let dir = TempDir::new().unwrap();
        let controller = Fixture {
            runtime,
            host,
            databases: MockDatabaseProbe::new(),
        }
        .controller(&dir, MockOrchestrator::new());

        let err = controller.inspect().await.unwrap_err();
        assert!(matches!(err, PanelError::Docker(_)));
    }

    #[tokio::test]
    async fn test_derived_tables() {
        let dir = TempDir::new().unwrap();
        let controller = Fixture::new(1).controller(&dir, MockOrchestrator::new());
        let snapshot = controller.inspect().await.unwrap();

        let rows = snapshot.port_rows();
        let web = rows.iter().find(|r| r.binding.container == "web").unwrap();
        let db = rows.iter().find(|r| r.binding.container == "db").unwrap();
        assert!(web.host_listening);
        assert!(!db.host_listening);

        assert_eq!(snapshot.images_in_use(), vec!["nginx:1.25", "postgres:16", "untagged"]);
        assert_eq!(snapshot.listening().len(), 1);
        assert_eq!(snapshot.omitted_sockets(), 1);

        let web = snapshot.container("web").unwrap();
        assert_eq!(snapshot.container_tags(web), vec!["nginx:1.25"]);

        let volumes = snapshot.volume_rows();
        assert_eq!(volumes[1].container, "db");
        assert_eq!(volumes[1].mounts, vec!["/data/db"]);

        let uptimes = snapshot.uptime_rows();
        assert_eq!(uptimes[0].uptime.to_string(), "3:00:00");
    }

    #[tokio::test]
    async fn test_create_app_applies_and_refreshes() {
        let dir = TempDir::new().unwrap();
        let expected = dir.path().join("foo").join("docker-compose.yml");
        let content = "services:\n  foo:\n    image: busybox\n";

        let mut orchestrator = MockOrchestrator::new();
        let expected_path = expected.clone();
        orchestrator
            .expect_up()
            .withf(move |path| path == expected_path.as_path())
            .times(1)
            .returning(|path| {
                Ok(ApplyOutcome {
                    command: format!("docker-compose -f {} up -d --build", path.display()),
                    exit_code: Some(0),
                    success: true,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            });
        let controller = Fixture::new(1).controller(&dir, orchestrator);

        let result = controller.create_app("foo", content).await;

        assert!(result.report.is_success());
        assert!(result.report.apply.as_ref().unwrap().success);
        assert_eq!(std::fs::read_to_string(&expected).unwrap(), content);
        assert!(result.snapshot.is_some());
    }

    #[tokio::test]
    async fn test_failed_apply_keeps_written_descriptor() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("web")).unwrap();

        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_up().times(1).returning(|_| {
            Ok(ApplyOutcome {
                command: "docker-compose up".to_string(),
                exit_code: Some(1),
                success: false,
                stdout: String::new(),
                stderr: "yaml: line 2: mapping values are not allowed\n".to_string(),
            })
        });
        let controller = Fixture::new(1).controller(&dir, orchestrator);

        let result = controller.save_descriptor("web", "services: : :").await;

        assert!(!result.report.is_success());
        assert!(result.report.failed[0].error.contains("exit 1"));
        let state = controller.read_descriptor("web").unwrap();
        assert_eq!(state.content(), Some("services: : :"));
    }

    #[tokio::test]
    async fn test_remove_image_once() {
        let dir = TempDir::new().unwrap();
        let mut fixture = Fixture::new(1);
        fixture
            .runtime
            .expect_remove_image()
            .with(eq("sha256:old"))
            .times(1)
            .returning(|_| Ok(()));
        let controller = fixture.controller(&dir, MockOrchestrator::new());

        let result = controller.remove_image("sha256:old").await;
        assert_eq!(result.report.summary(), "rmi: sha256:old");
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_stop().times(1).returning(|_| Ok(()));
        let mut host = MockHostProbe::new();
        host.expect_disk_usage()
            .returning(|path| Err(PanelError::MountNotFound(path.to_path_buf())));

        let controller = Fixture {
            runtime,
            host,
            databases: MockDatabaseProbe::new(),
        }
        .controller(&dir, MockOrchestrator::new());

        let result = controller.stop_selected(&names(&["web"])).await;
        assert!(result.report.is_success());
        assert!(result.snapshot.is_none());
        assert!(result.refresh_error.unwrap().contains("No mounted filesystem"));
    }

    #[test]
    fn test_app_candidates_merge_dirs_and_containers() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("blog")).unwrap();
        std::fs::create_dir(dir.path().join("web")).unwrap();
        let controller = Fixture::new(0).controller(&dir, MockOrchestrator::new());

        assert_eq!(controller.app_candidates(None).unwrap(), names(&["blog", "web"]));
    }
}
