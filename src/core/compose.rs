/// Compose descriptors under the applications directory
///
/// Every application lives in `<apps_dir>/<name>/` with a single descriptor
/// file. Saving a descriptor always re-applies it with the orchestration
/// tool; the text is written exactly as given.

use async_trait::async_trait;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

#[cfg(test)]
use mockall::automock;

use crate::core::error::{PanelError, PanelResult};

/// Result of running the orchestration tool once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub command: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ApplyOutcome {
    /// One-line summary for status bars and CLI output
    pub fn summary(&self) -> String {
        if self.success {
            return format!("{} succeeded", self.command);
        }

        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let last_line = self.stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        format!("{} failed (exit {}): {}", self.command, code, last_line.trim())
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Bring the application described by `descriptor` up, rebuilding images
    async fn up(&self, descriptor: &Path) -> PanelResult<ApplyOutcome>;
}

/// Runs `<command> -f <descriptor> up -d --build`
pub struct ProcessOrchestrator {
    command: Vec<String>,
}

impl ProcessOrchestrator {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn args_for(&self, descriptor: &Path) -> Vec<String> {
        let mut args: Vec<String> = self.command.iter().skip(1).cloned().collect();
        args.push("-f".to_string());
        args.push(descriptor.display().to_string());
        args.extend(["up", "-d", "--build"].iter().map(|s| s.to_string()));
        args
    }
}

#[async_trait]
impl Orchestrator for ProcessOrchestrator {
    async fn up(&self, descriptor: &Path) -> PanelResult<ApplyOutcome> {
        let program = self
            .command
            .first()
            .cloned()
            .unwrap_or_else(|| "docker-compose".to_string());
        let args = self.args_for(descriptor);
        let rendered = format!("{} {}", program, args.join(" "));

        tracing::info!(command = %rendered, "applying descriptor");

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        if let Some(dir) = descriptor.parent().filter(|d| d.is_dir()) {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|source| PanelError::Spawn {
            program: program.clone(),
            source,
        })?;

        let outcome = ApplyOutcome {
            command: rendered,
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if outcome.success {
            tracing::info!(descriptor = %descriptor.display(), "descriptor applied");
        } else {
            tracing::warn!(
                descriptor = %descriptor.display(),
                exit_code = ?outcome.exit_code,
                "orchestration tool failed"
            );
        }

        Ok(outcome)
    }
}

/// Descriptor lookup result; a missing file is a normal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DescriptorState {
    Found { path: PathBuf, content: String },
    NotFound { path: PathBuf },
}

impl DescriptorState {
    pub fn path(&self) -> &Path {
        match self {
            DescriptorState::Found { path, .. } | DescriptorState::NotFound { path } => path,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            DescriptorState::Found { content, .. } => Some(content),
            DescriptorState::NotFound { .. } => None,
        }
    }
}

pub struct ComposeManager {
    apps_dir: PathBuf,
    file_name: String,
    orchestrator: Arc<dyn Orchestrator>,
}

impl ComposeManager {
    pub fn new(
        apps_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Self {
        Self {
            apps_dir: apps_dir.into(),
            file_name: file_name.into(),
            orchestrator,
        }
    }

    /// `<apps_dir>/<app>/<file_name>`
    pub fn descriptor_path(&self, app: &str) -> PanelResult<PathBuf> {
        validate_app_name(app)?;
        Ok(self.apps_dir.join(app).join(&self.file_name))
    }

    /// Application directories, sorted by name; a missing apps dir is empty
    pub fn list_apps(&self) -> PanelResult<Vec<String>> {
        let entries = match fs::read_dir(&self.apps_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PanelError::io(&self.apps_dir, e)),
        };

        let mut apps = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PanelError::io(&self.apps_dir, e))?;
            if entry.path().is_dir() {
                apps.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        apps.sort();
        Ok(apps)
    }

    pub fn read(&self, app: &str) -> PanelResult<DescriptorState> {
        let path = self.descriptor_path(app)?;

        match fs::read_to_string(&path) {
            Ok(content) => Ok(DescriptorState::Found { path, content }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(DescriptorState::NotFound { path })
            }
            Err(e) => Err(PanelError::io(path, e)),
        }
    }

    /// Overwrite the descriptor, then re-apply it
    pub async fn write(&self, app: &str, content: &str) -> PanelResult<ApplyOutcome> {
        let path = self.descriptor_path(app)?;

        fs::write(&path, content).map_err(|e| PanelError::io(&path, e))?;
        tracing::info!(app, path = %path.display(), bytes = content.len(), "descriptor written");

        self.orchestrator.up(&path).await
    }

    /// Create the application directory if needed, write and apply
    pub async fn create(&self, app: &str, content: &str) -> PanelResult<ApplyOutcome> {
        let path = self.descriptor_path(app)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| PanelError::io(dir, e))?;
        }

        self.write(app, content).await
    }
}

fn validate_app_name(app: &str) -> PanelResult<()> {
    let invalid = app.is_empty()
        || app == "."
        || app == ".."
        || app.contains('/')
        || app.contains('\\')
        || app.contains('\0');

    if invalid {
        return Err(PanelError::InvalidAppName(app.to_string()));
    }
    Ok(())
}

/// Service names declared in a descriptor, in file order
///
/// Display only: anything that does not parse yields an empty list.
pub fn services(content: &str) -> Vec<String> {
    let Ok(doc) = serde_yaml::from_str::<serde_yaml::Value>(content) else {
        return Vec::new();
    };

    doc.get("services")
        .and_then(|s| s.as_mapping())
        .map(|services| {
            services
                .keys()
                .filter_map(|k| k.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WEB: &str = "services:\n  web:\n    image: nginx:1.25\n    ports:\n      - \"8080:80\"\n  db:\n    image: postgres:16\n";

    fn ok_outcome() -> ApplyOutcome {
        ApplyOutcome {
            command: "docker-compose up".to_string(),
            exit_code: Some(0),
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn manager(dir: &TempDir, orchestrator: MockOrchestrator) -> ComposeManager {
        ComposeManager::new(dir.path(), "docker-compose.yml", Arc::new(orchestrator))
    }

    #[test]
    fn test_descriptor_path() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, MockOrchestrator::new());

        assert_eq!(
            manager.descriptor_path("blog").unwrap(),
            dir.path().join("blog").join("docker-compose.yml")
        );
    }

    #[test]
    fn test_invalid_app_names() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, MockOrchestrator::new());

        for name in ["", ".", "..", "../etc", "a/b", "a\\b"] {
            assert!(
                matches!(manager.descriptor_path(name), Err(PanelError::InvalidAppName(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_missing_descriptor_is_not_found() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, MockOrchestrator::new());

        let state = manager.read("ghost").unwrap();
        assert!(matches!(state, DescriptorState::NotFound { .. }));
        assert_eq!(state.path(), dir.path().join("ghost").join("docker-compose.yml"));
        assert!(state.content().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("web")).unwrap();

        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_up().times(1).returning(|_| Ok(ok_outcome()));
        let manager = manager(&dir, orchestrator);

        let content = "services:\r\n  web:\r\n    image: \"nginx\"   \n\n# trailing comment";
        manager.write("web", content).await.unwrap();

        let state = manager.read("web").unwrap();
        assert_eq!(state.content(), Some(content));
    }

    #[tokio::test]
    async fn test_create_app_writes_and_applies_path() {
        let dir = TempDir::new().unwrap();
        let expected = dir.path().join("foo").join("docker-compose.yml");

        let mut orchestrator = MockOrchestrator::new();
        let expected_path = expected.clone();
        orchestrator
            .expect_up()
            .withf(move |path| path == expected_path.as_path())
            .times(1)
            .returning(|_| Ok(ok_outcome()));
        let manager = manager(&dir, orchestrator);

        let outcome = manager.create("foo", WEB).await.unwrap();
        assert!(outcome.success);
        assert!(dir.path().join("foo").is_dir());
        assert_eq!(fs::read_to_string(&expected).unwrap(), WEB);
    }

    #[tokio::test]
    async fn test_recreate_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_up().times(2).returning(|_| Ok(ok_outcome()));
        let manager = manager(&dir, orchestrator);

        manager.create("foo", "services: {}\n").await.unwrap();
        manager.create("foo", WEB).await.unwrap();

        assert_eq!(manager.read("foo").unwrap().content(), Some(WEB));
    }

    #[tokio::test]
    async fn test_write_without_directory_fails_before_apply() {
        let dir = TempDir::new().unwrap();
        let mut orchestrator = MockOrchestrator::new();
        orchestrator.expect_up().never();
        let manager = manager(&dir, orchestrator);

        let result = manager.write("absent", WEB).await;
        assert!(matches!(result, Err(PanelError::Io { .. })));
    }

    #[test]
    fn test_list_apps() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("wiki")).unwrap();
        fs::create_dir(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let manager = manager(&dir, MockOrchestrator::new());

        assert_eq!(manager.list_apps().unwrap(), vec!["blog", "wiki"]);

        let missing = ComposeManager::new(
            dir.path().join("nope"),
            "docker-compose.yml",
            Arc::new(MockOrchestrator::new()),
        );
        assert!(missing.list_apps().unwrap().is_empty());
    }

    #[test]
    fn test_services_best_effort() {
        assert_eq!(services(WEB), vec!["web", "db"]);
        assert!(services("services: [").is_empty());
        assert!(services("version: '3'\n").is_empty());
    }

    #[test]
    fn test_outcome_summary() {
        let failed = ApplyOutcome {
            command: "docker-compose -f x up -d --build".to_string(),
            exit_code: Some(1),
            success: false,
            stdout: String::new(),
            stderr: "Pulling web\nERROR: manifest unknown\n".to_string(),
        };
        assert_eq!(
            failed.summary(),
            "docker-compose -f x up -d --build failed (exit 1): ERROR: manifest unknown"
        );
    }

    #[tokio::test]
    async fn test_process_orchestrator_passes_descriptor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docker-compose.yml");
        let orchestrator = ProcessOrchestrator::new(vec!["echo".to_string(), "compose".to_string()]);

        let outcome = orchestrator.up(&path).await.unwrap();
        assert!(outcome.success);
        assert_eq!(
            outcome.stdout.trim(),
            format!("compose -f {} up -d --build", path.display())
        );
    }

    #[tokio::test]
    async fn test_process_orchestrator_reports_exit_status() {
        let orchestrator = ProcessOrchestrator::new(vec!["false".to_string()]);
        let outcome = orchestrator.up(Path::new("/tmp/none.yml")).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_process_orchestrator_spawn_failure() {
        let orchestrator = ProcessOrchestrator::new(vec!["/nonexistent/compose-tool".to_string()]);
        let result = orchestrator.up(Path::new("/tmp/none.yml")).await;

        assert!(matches!(result, Err(PanelError::Spawn { .. })));
    }
}
