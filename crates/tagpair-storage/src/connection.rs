use crate::error::{StorageError, StorageResult};
use sqlx::ConnectOptions;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where and how to open the session store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file holding the `session_store` table.
    pub path: PathBuf,

    /// Pool size. The flow issues one query at a time, so a few suffice.
    pub max_connections: u32,

    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,

    /// How long SQLite waits on a locked file before failing a write.
    pub busy_timeout: Duration,

    /// Create the file (and its directory) if missing.
    pub create_if_missing: bool,

    /// Apply embedded migrations on open.
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tagpair.db"),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn auto_migrate(mut self, migrate: bool) -> Self {
        self.auto_migrate = migrate;
        self
    }
}

/// Pooled handle to the session store database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (and by default create and migrate) the session database.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tagpair_storage::connection::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new(DatabaseConfig::new("tagpair.db")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        if config.create_if_missing
            && let Some(dir) = config.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::Configuration(format!(
                    "cannot create store directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if config.auto_migrate {
            db.migrate().await?;
        }

        tracing::debug!("Session store opened at {}", config.path.display());
        Ok(db)
    }

    /// Open a private in-memory store with the schema applied.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to `sqlite::memory:` is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Apply the migrations embedded from `migrations/`. Idempotent.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Round-trip a trivial query.
    pub async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::new("state/session.db")
            .max_connections(2)
            .busy_timeout(Duration::from_millis(250))
            .create_if_missing(false)
            .auto_migrate(false);

        assert_eq!(config.path, PathBuf::from("state/session.db"));
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.create_if_missing);
        assert!(!config.auto_migrate);
    }

    #[test]
    fn test_config_defaults() {
        let config = DatabaseConfig::default();

        assert_eq!(config.path, PathBuf::from("tagpair.db"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
        assert!(config.create_if_missing && config.auto_migrate);
    }

    #[tokio::test]
    async fn test_missing_file_without_create_fails() {
        let dir = std::env::temp_dir().join(format!("tagpair-absent-{}", std::process::id()));
        let config = DatabaseConfig::new(dir.join("session.db")).create_if_missing(false);

        assert!(Database::new(config).await.is_err());
        assert!(!dir.exists());
    }
}
