/// API Request Handlers
/// Thin wrappers over the controller; every read runs a fresh inspection

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::inspection::{PortRow, UptimeRow};
use crate::core::{
    compose, ActionResult, ContainerRecord, Controller, DatabasePanel, DescriptorState, DiskUsage,
    ImageRecord, ListeningSocket, Lookup, PanelError, Snapshot,
};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<ActionResult> {
    /// Mutations always return their report; `success` reflects the targets
    fn from_action(result: ActionResult) -> Self {
        let error = if result.report.is_success() {
            result.refresh_error.clone()
        } else {
            Some(result.report.summary())
        };

        Self {
            success: error.is_none(),
            data: Some(result),
            error,
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, StatusCode>;

fn status_for(error: &PanelError) -> StatusCode {
    match error {
        PanelError::InvalidAppName(_) => StatusCode::BAD_REQUEST,
        PanelError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fail(error: PanelError) -> StatusCode {
    tracing::error!(error = %error, "request failed");
    status_for(&error)
}

async fn snapshot(controller: &Controller) -> Result<Snapshot, StatusCode> {
    controller.inspect().await.map_err(fail)
}

#[derive(Serialize)]
pub struct ContainerView {
    #[serde(flatten)]
    record: ContainerRecord,
    tags: Vec<String>,
}

#[derive(Serialize)]
pub struct PortsView {
    listening: Vec<ListeningSocket>,
    omitted: Vec<Lookup<ListeningSocket>>,
    exposed: Vec<PortRow>,
}

#[derive(Serialize)]
pub struct ImagesView {
    images: Vec<ImageRecord>,
    in_use: Vec<String>,
    uptime: Vec<UptimeRow>,
}

#[derive(Serialize)]
pub struct DescriptorView {
    #[serde(flatten)]
    state: DescriptorState,
    services: Vec<String>,
}

#[derive(Serialize)]
pub struct VersionInfo {
    version: String,
    build_timestamp: String,
}

#[derive(Deserialize)]
pub struct TargetsRequest {
    names: Vec<String>,
}

#[derive(Deserialize)]
pub struct DescriptorRequest {
    content: String,
}

#[derive(Deserialize)]
pub struct CreateAppRequest {
    name: String,
    content: String,
}

// ============================================================================
// Read Handlers
// ============================================================================

pub async fn get_snapshot(State(controller): State<Arc<Controller>>) -> ApiResult<Snapshot> {
    Ok(Json(ApiResponse::ok(snapshot(&controller).await?)))
}

pub async fn get_disk(State(controller): State<Arc<Controller>>) -> ApiResult<DiskUsage> {
    let disk = controller.disk_usage().await.map_err(fail)?;
    Ok(Json(ApiResponse::ok(disk)))
}

pub async fn get_containers(
    State(controller): State<Arc<Controller>>,
) -> ApiResult<Vec<ContainerView>> {
    let snapshot = snapshot(&controller).await?;

    let views = snapshot
        .containers
        .iter()
        .map(|record| ContainerView {
            tags: snapshot.container_tags(record),
            record: record.clone(),
        })
        .collect();

    Ok(Json(ApiResponse::ok(views)))
}

pub async fn get_ports(State(controller): State<Arc<Controller>>) -> ApiResult<PortsView> {
    let snapshot = snapshot(&controller).await?;

    Ok(Json(ApiResponse::ok(PortsView {
        listening: snapshot.listening().into_iter().cloned().collect(),
        omitted: snapshot
            .sockets
            .iter()
            .filter(|s| s.is_omitted())
            .cloned()
            .collect(),
        exposed: snapshot.port_rows(),
    })))
}

pub async fn get_databases(State(controller): State<Arc<Controller>>) -> ApiResult<DatabasePanel> {
    Ok(Json(ApiResponse::ok(controller.database_panel().await)))
}

pub async fn get_images(State(controller): State<Arc<Controller>>) -> ApiResult<ImagesView> {
    let snapshot = snapshot(&controller).await?;

    Ok(Json(ApiResponse::ok(ImagesView {
        in_use: snapshot.images_in_use(),
        uptime: snapshot.uptime_rows(),
        images: snapshot.images,
    })))
}

pub async fn get_dangling_images(
    State(controller): State<Arc<Controller>>,
) -> ApiResult<Vec<ImageRecord>> {
    let snapshot = snapshot(&controller).await?;
    Ok(Json(ApiResponse::ok(snapshot.dangling)))
}

pub async fn get_apps(State(controller): State<Arc<Controller>>) -> ApiResult<Vec<String>> {
    let apps = controller.compose().list_apps().map_err(fail)?;
    Ok(Json(ApiResponse::ok(apps)))
}

pub async fn get_compose(
    State(controller): State<Arc<Controller>>,
    Path(name): Path<String>,
) -> ApiResult<DescriptorView> {
    let state = controller.read_descriptor(&name).map_err(fail)?;
    let services = state.content().map(compose::services).unwrap_or_default();

    Ok(Json(ApiResponse::ok(DescriptorView { state, services })))
}

pub async fn get_readme(State(controller): State<Arc<Controller>>) -> ApiResult<String> {
    let text = controller.docs().map_err(fail)?;
    Ok(Json(ApiResponse::ok(text)))
}

pub async fn get_version_info() -> Json<ApiResponse<VersionInfo>> {
    Json(ApiResponse::ok(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_timestamp: crate::cli::BUILD_TIMESTAMP.to_string(),
    }))
}

// ============================================================================
// Mutation Handlers
// ============================================================================

pub async fn stop_containers(
    State(controller): State<Arc<Controller>>,
    Json(request): Json<TargetsRequest>,
) -> ApiResult<ActionResult> {
    let result = controller.stop_selected(&request.names).await;
    Ok(Json(ApiResponse::from_action(result)))
}

pub async fn remove_containers(
    State(controller): State<Arc<Controller>>,
    Json(request): Json<TargetsRequest>,
) -> ApiResult<ActionResult> {
    let result = controller.remove_selected(&request.names).await;
    Ok(Json(ApiResponse::from_action(result)))
}

pub async fn remove_image(
    State(controller): State<Arc<Controller>>,
    Path(id): Path<String>,
) -> ApiResult<ActionResult> {
    let result = controller.remove_image(&id).await;
    Ok(Json(ApiResponse::from_action(result)))
}

pub async fn save_compose(
    State(controller): State<Arc<Controller>>,
    Path(name): Path<String>,
    Json(request): Json<DescriptorRequest>,
) -> ApiResult<ActionResult> {
    // Reject bad names before anything touches the filesystem
    controller.compose().descriptor_path(&name).map_err(fail)?;

    let result = controller.save_descriptor(&name, &request.content).await;
    Ok(Json(ApiResponse::from_action(result)))
}

pub async fn create_app(
    State(controller): State<Arc<Controller>>,
    Json(request): Json<CreateAppRequest>,
) -> ApiResult<ActionResult> {
    controller.compose().descriptor_path(&request.name).map_err(fail)?;

    let result = controller.create_app(&request.name, &request.content).await;
    Ok(Json(ApiResponse::from_action(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compose::{ApplyOutcome, ComposeManager, MockOrchestrator};
    use crate::core::database::MockDatabaseProbe;
    use crate::core::docker::MockContainerRuntime;
    use crate::core::host::MockHostProbe;
    use crate::server::create_router;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mockall::predicate::eq;
    use serde_json::Value;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Mocks {
        runtime: MockContainerRuntime,
        host: MockHostProbe,
        databases: MockDatabaseProbe,
        orchestrator: MockOrchestrator,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                runtime: MockContainerRuntime::new(),
                host: MockHostProbe::new(),
                databases: MockDatabaseProbe::new(),
                orchestrator: MockOrchestrator::new(),
            }
        }

        /// Expect one full inspection pass over an empty host
        fn expect_pass(&mut self) {
            self.host
                .expect_disk_usage()
                .times(1)
                .returning(|_| Ok(DiskUsage::from_space("/", 1000, 250, 250)));
            self.runtime
                .expect_list_containers()
                .times(1)
                .returning(|_| Ok(Vec::new()));
            self.host
                .expect_listening_sockets()
                .times(1)
                .returning(|| Ok(Vec::new()));
            self.databases
                .expect_list_databases()
                .times(1)
                .returning(|| Ok(vec!["postgres".to_string()]));
            self.runtime.expect_list_images().times(1).returning(|| Ok(Vec::new()));
            self.runtime.expect_dangling_images().times(1).returning(|| Ok(Vec::new()));
        }

        fn router(self, dir: &TempDir) -> axum::Router {
            let controller = Controller::new(
                Arc::new(self.runtime),
                Arc::new(self.host),
                Arc::new(self.databases),
                ComposeManager::new(dir.path(), "docker-compose.yml", Arc::new(self.orchestrator)),
                PathBuf::from("/"),
                dir.path().join("readme.md"),
            );
            create_router(Arc::new(controller), false)
        }
    }

    async fn send(router: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_disk_endpoint_reports_probe_percent() {
        let dir = TempDir::new().unwrap();
        let mut mocks = Mocks::new();
        mocks
            .host
            .expect_disk_usage()
            .times(1)
            .returning(|_| Ok(DiskUsage::from_space("/", 100, 58, 58)));

        let (status, body) = send(mocks.router(&dir), get("/api/disk")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["percent"], 42.0);
    }

    #[tokio::test]
    async fn test_database_warning_is_success_payload() {
        let dir = TempDir::new().unwrap();
        let mut mocks = Mocks::new();
        mocks.databases.expect_list_databases().times(1).returning(|| {
            Err(PanelError::Database(sqlx::Error::Protocol(
                "password authentication failed".to_string(),
            )))
        });

        let (status, body) = send(mocks.router(&dir), get("/api/databases")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["kind"], "warning");
        assert!(body["data"]["value"]
            .as_str()
            .unwrap()
            .starts_with("Failed to connect to PostgreSQL"));
    }

    #[tokio::test]
    async fn test_stop_endpoint() {
        let dir = TempDir::new().unwrap();
        let mut mocks = Mocks::new();
        mocks.runtime.expect_stop().with(eq("web")).times(1).returning(|_| Ok(()));
        mocks.runtime.expect_stop().with(eq("db")).times(1).returning(|_| Ok(()));
        mocks.expect_pass();

        let request = json_request("POST", "/api/containers/stop", serde_json::json!({"names": ["web", "db"]}));
        let (status, body) = send(mocks.router(&dir), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["report"]["succeeded"], serde_json::json!(["web", "db"]));
        assert!(body["data"]["snapshot"].is_object());
    }

    #[tokio::test]
    async fn test_missing_descriptor_is_reported_as_state() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(Mocks::new().router(&dir), get("/api/apps/ghost/compose")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "not_found");
        assert_eq!(body["data"]["services"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_invalid_app_name_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let request = json_request("PUT", "/api/apps/..%2Fetc/compose", serde_json::json!({"content": "x"}));
        let (status, _) = send(Mocks::new().router(&dir), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_app_endpoint() {
        let dir = TempDir::new().unwrap();
        let mut mocks = Mocks::new();
        mocks.orchestrator.expect_up().times(1).returning(|path| {
            Ok(ApplyOutcome {
                command: format!("docker-compose -f {} up -d --build", path.display()),
                exit_code: Some(0),
                success: true,
                stdout: String::new(),
                stderr: String::new(),
            })
        });
        mocks.expect_pass();

        let content = "services:\n  foo:\n    image: busybox\n";
        let request = json_request("POST", "/api/apps", serde_json::json!({"name": "foo", "content": content}));
        let (status, body) = send(mocks.router(&dir), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let written = std::fs::read_to_string(dir.path().join("foo").join("docker-compose.yml")).unwrap();
        assert_eq!(written, content);
    }

    #[tokio::test]
    async fn test_readme_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (status, _) = send(Mocks::new().router(&dir), get("/api/readme")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_version() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(Mocks::new().router(&dir), get("/api/version")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }
}
