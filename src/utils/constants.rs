/// Defaults for the host layout the panel manages
///
/// Every value here can be overridden in config.toml except the name of the
/// password variable.

/// Directory holding one sub-directory per compose application
pub const DEFAULT_APPS_DIR: &str = "/home/collos/apps";

/// Descriptor file name inside each application directory
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// Orchestration tool invoked to (re)apply a descriptor
pub const DEFAULT_COMPOSE_COMMAND: &[&str] = &["docker-compose"];

/// Static documentation shown in the Docs screen
pub const DEFAULT_DOCS_PATH: &str = "readme.md";

/// Filesystem whose usage is reported in the disk panel
pub const DEFAULT_DISK_PATH: &str = "/";

/// PostgreSQL connection profile
pub const DEFAULT_PG_HOST: &str = "localhost";
pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_PG_USER: &str = "collos";
pub const DEFAULT_PG_DATABASE: &str = "postgres";

/// Environment variable carrying the PostgreSQL password
pub const PG_PASSWORD_ENV: &str = "PG_PASSWORD";

/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "VPS_PANEL_CONFIG";

/// Label used for images without a repository tag
pub const UNTAGGED: &str = "untagged";

/// Docker reports this start time for containers that never ran
pub const DOCKER_ZERO_TIME: &str = "0001-01-01T00:00:00Z";
