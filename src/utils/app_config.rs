/// Application configuration management
/// Stores settings in ~/.config/vps-panel/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::constants::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub database: Option<String>,
}

/// On-disk configuration; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub apps_dir: Option<String>,
    pub compose_file_name: Option<String>,
    pub compose_command: Option<Vec<String>>,
    pub docs_path: Option<String>,
    pub disk_path: Option<String>,
    pub postgres: PostgresConfig,
}

impl AppConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("vps-panel");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, falling back to defaults when absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

}

/// PostgreSQL connection profile with the password resolved
#[derive(Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

/// Fully resolved runtime settings, built once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub apps_dir: PathBuf,
    pub compose_file_name: String,
    pub compose_command: Vec<String>,
    pub docs_path: PathBuf,
    pub disk_path: PathBuf,
    pub postgres: PostgresSettings,
}

impl Settings {
    /// Merge the file configuration with defaults and the environment secret
    pub fn resolve(config: AppConfig, pg_password: Option<String>) -> Self {
        let compose_command = config
            .compose_command
            .filter(|cmd| !cmd.is_empty())
            .unwrap_or_else(|| DEFAULT_COMPOSE_COMMAND.iter().map(|s| s.to_string()).collect());

        Self {
            apps_dir: PathBuf::from(config.apps_dir.unwrap_or_else(|| DEFAULT_APPS_DIR.to_string())),
            compose_file_name: config
                .compose_file_name
                .unwrap_or_else(|| DEFAULT_COMPOSE_FILE.to_string()),
            compose_command,
            docs_path: PathBuf::from(config.docs_path.unwrap_or_else(|| DEFAULT_DOCS_PATH.to_string())),
            disk_path: PathBuf::from(config.disk_path.unwrap_or_else(|| DEFAULT_DISK_PATH.to_string())),
            postgres: PostgresSettings {
                host: config.postgres.host.unwrap_or_else(|| DEFAULT_PG_HOST.to_string()),
                port: config.postgres.port.unwrap_or(DEFAULT_PG_PORT),
                user: config.postgres.user.unwrap_or_else(|| DEFAULT_PG_USER.to_string()),
                database: config
                    .postgres
                    .database
                    .unwrap_or_else(|| DEFAULT_PG_DATABASE.to_string()),
                password: pg_password,
            },
        }
    }

    /// Load `.env`, the config file and `PG_PASSWORD`; called once from main
    pub fn load() -> Result<Self> {
        // A missing .env is normal on hosts that export the variable directly
        let _ = dotenv::dotenv();

        let config = AppConfig::load()?;
        let pg_password = std::env::var(PG_PASSWORD_ENV).ok();

        Ok(Self::resolve(config, pg_password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_host_layout() {
        let settings = Settings::resolve(AppConfig::default(), None);

        assert_eq!(settings.apps_dir, PathBuf::from("/home/collos/apps"));
        assert_eq!(settings.compose_file_name, "docker-compose.yml");
        assert_eq!(settings.compose_command, vec!["docker-compose".to_string()]);
        assert_eq!(settings.disk_path, PathBuf::from("/"));
        assert_eq!(settings.postgres.host, "localhost");
        assert_eq!(settings.postgres.user, "collos");
        assert_eq!(settings.postgres.database, "postgres");
        assert_eq!(settings.postgres.port, 5432);
        assert!(settings.postgres.password.is_none());
    }

    #[test]
    fn test_partial_file_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "apps_dir = \"/srv/apps\"\ncompose_command = [\"docker\", \"compose\"]\n\n[postgres]\nport = 5433\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        let settings = Settings::resolve(config, Some("secret".to_string()));

        assert_eq!(settings.apps_dir, PathBuf::from("/srv/apps"));
        assert_eq!(settings.compose_command, vec!["docker".to_string(), "compose".to_string()]);
        assert_eq!(settings.postgres.port, 5433);
        assert_eq!(settings.postgres.user, "collos");
        assert_eq!(settings.postgres.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_empty_compose_command_falls_back() {
        let config = AppConfig {
            compose_command: Some(Vec::new()),
            ..AppConfig::default()
        };
        let settings = Settings::resolve(config, None);
        assert_eq!(settings.compose_command, vec!["docker-compose".to_string()]);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "apps_dir = [\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_password_hidden_in_debug() {
        let settings = Settings::resolve(AppConfig::default(), Some("hunter2".to_string()));
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("****"));
    }
}
