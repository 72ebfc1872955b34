/// Error types shared by the inspection components
///
/// Application layers (CLI, TUI, HTTP) wrap these in anyhow; the components
/// themselves stay typed so the controller can decide which failures are
/// displayable and which abort a pass.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("PostgreSQL error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read socket table: {0}")]
    SocketTable(String),

    #[error("No mounted filesystem contains {0}")]
    MountNotFound(PathBuf),

    #[error("Invalid application name '{0}'")]
    InvalidAppName(String),

    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

impl PanelError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PanelError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PanelResult<T> = std::result::Result<T, PanelError>;
