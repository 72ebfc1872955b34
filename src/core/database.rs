/// PostgreSQL catalog inspection
///
/// Each call opens its own connection and closes it before returning.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

#[cfg(test)]
use mockall::automock;

use crate::core::error::{PanelError, PanelResult};
use crate::utils::app_config::PostgresSettings;

const LIST_DATABASES_SQL: &str =
    "SELECT datname::text FROM pg_database WHERE datistemplate = false ORDER BY datname";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn list_databases(&self) -> PanelResult<Vec<String>>;
}

/// What the databases panel shows after a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DatabasePanel {
    Databases(Vec<String>),
    Warning(String),
}

impl DatabasePanel {
    pub fn from_result(result: PanelResult<Vec<String>>) -> Self {
        match result {
            Ok(names) => DatabasePanel::Databases(names),
            Err(e) => {
                let detail = match e {
                    PanelError::Database(inner) => inner.to_string(),
                    other => other.to_string(),
                };
                tracing::warn!(error = %detail, "database listing failed");
                DatabasePanel::Warning(format!("Failed to connect to PostgreSQL: {}", detail))
            }
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            DatabasePanel::Warning(message) => Some(message),
            DatabasePanel::Databases(_) => None,
        }
    }
}

pub struct DatabaseInspector {
    settings: PostgresSettings,
}

impl DatabaseInspector {
    pub fn new(settings: PostgresSettings) -> Self {
        Self { settings }
    }

    fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.settings.host)
            .port(self.settings.port)
            .username(&self.settings.user)
            .database(&self.settings.database);

        match &self.settings.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[async_trait]
impl DatabaseProbe for DatabaseInspector {
    async fn list_databases(&self) -> PanelResult<Vec<String>> {
        tracing::debug!(
            host = %self.settings.host,
            port = self.settings.port,
            user = %self.settings.user,
            "listing databases"
        );

        let mut conn = PgConnection::connect_with(&self.connect_options()).await?;
        let result = sqlx::query_scalar::<_, String>(LIST_DATABASES_SQL)
            .fetch_all(&mut conn)
            .await;

        // Close regardless of the query outcome
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close PostgreSQL connection");
        }

        Ok(result?)
    }
}
