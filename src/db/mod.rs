//! SQLite datastore shared by every worker pointed at the same data directory.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};

use crate::core::errors::{AppError, AppResult};

pub mod repositories;

const DATABASE_FILE: &str = "catalog-sync.sqlite";
const DATA_DIR_NAME: &str = ".catalog-sync";
const MAX_CONNECTIONS: u32 = 5;
/// Concurrent workers contend on job claims; wait instead of failing with SQLITE_BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static MIGRATOR: Migrator = sqlx::migrate!("./src/db/migrations");

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(data_dir: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let connect_options = SqliteConnectOptions::new()
            .filename(data_dir.join(DATABASE_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(connect_options)
            .await?;
        Self::migrated(pool).await
    }

    /// Single-connection database that lives as long as the pool.
    pub async fn in_memory() -> AppResult<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> AppResult<Self> {
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `base` when given, else `.catalog-sync` under the current directory.
pub fn default_data_dir(base: Option<PathBuf>) -> AppResult<PathBuf> {
    if let Some(path) = base {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|err| AppError::Io(err.to_string()))?;
    Ok(cwd.join(DATA_DIR_NAME))
}
