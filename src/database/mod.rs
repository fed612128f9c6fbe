//! Connection management and schema migrations
//!
//! The program store runs on SQLite by default. PostgreSQL and MySQL URLs are
//! accepted as well since every query goes through SeaORM.

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database as SeaOrmDatabase, DatabaseBackend, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::config::defaults::{DEFAULT_INSERT_BATCH_SIZE, DEFAULT_MAX_CONNECTIONS};

pub mod migrations;
pub mod repositories;

use migrations::Migrator;

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Backend family, detected from the URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DatabaseType {
    #[strum(to_string = "SQLite")]
    SQLite,
    #[strum(to_string = "PostgreSQL")]
    PostgreSQL,
    #[strum(to_string = "MySQL")]
    MySQL,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Result<Self> {
        match url.split_once(':').map(|(scheme, _)| scheme) {
            Some("sqlite") => Ok(Self::SQLite),
            Some("postgres" | "postgresql") => Ok(Self::PostgreSQL),
            Some("mysql") => Ok(Self::MySQL),
            _ => anyhow::bail!("Unsupported database URL: {}", url),
        }
    }

    pub fn backend(self) -> DatabaseBackend {
        match self {
            Self::SQLite => DatabaseBackend::Sqlite,
            Self::PostgreSQL => DatabaseBackend::Postgres,
            Self::MySQL => DatabaseBackend::MySql,
        }
    }
}

/// Shared SeaORM connection pool plus what it is connected to
#[derive(Clone)]
pub struct Database {
    connection: Arc<DatabaseConnection>,
    database_type: DatabaseType,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let database_type = DatabaseType::from_url(&config.url)?;
        let url = match database_type {
            DatabaseType::SQLite => sqlite_connect_url(&config.url)?,
            _ => config.url.clone(),
        };

        let mut options = ConnectOptions::new(url.as_str());
        options
            .max_connections(config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        // Every pooled connection to sqlite::memory: is its own empty database
        if is_sqlite_memory(&url) {
            options
                .max_connections(1)
                .max_lifetime(Duration::from_secs(365 * 24 * 3600));
        } else {
            options.max_lifetime(Duration::from_secs(1800));
        }

        info!(database = %database_type, "Connecting to database");
        let connection = SeaOrmDatabase::connect(options).await.map_err(|e| {
            error!(database = %database_type, "Database connection failed: {:?}", e);
            anyhow::Error::new(e).context(format!("Failed to connect to {}", config.url))
        })?;
        debug!(database = %database_type, "Database connection established");

        Ok(Self {
            connection: Arc::new(connection),
            database_type,
        })
    }

    /// Private in-memory SQLite database with the schema applied
    pub async fn in_memory() -> Result<Self> {
        let database = Self::new(&DatabaseConfig {
            url: IN_MEMORY_URL.to_string(),
            max_connections: Some(1),
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
        })
        .await?;
        database.migrate().await?;
        Ok(database)
    }

    pub async fn migrate(&self) -> Result<()> {
        Migrator::up(&*self.connection, None)
            .await
            .with_context(|| format!("Failed to migrate {} database", self.database_type))?;
        info!(database = %self.database_type, "Database schema is up to date");
        Ok(())
    }

    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.connection)
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.database_type.backend()
    }

    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }
}

fn is_sqlite_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Make sure a file-backed SQLite database can be created on first start:
/// the parent directory must exist and the URL needs `mode=rwc`.
fn sqlite_connect_url(url: &str) -> Result<String> {
    if is_sqlite_memory(url) || url.contains("mode=") {
        return Ok(url.to_string());
    }

    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|rest| rest.split('?').next().unwrap_or(rest))
        .with_context(|| format!("Invalid SQLite URL: {url}"))?;

    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
        info!(directory = %parent.display(), "Created SQLite database directory");
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    Ok(format!("{url}{separator}mode=rwc"))
}
