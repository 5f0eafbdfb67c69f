//! Persisted download counter.
//!
//! Tracks how many times each (credential, book) pair has been
//! downloaded. The increment runs after the `complete` event and is
//! best-effort: the session finishes whether or not the write lands.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::instrument;

use crate::api::Credential;

/// Maximum connections in the pool. Kept low for SQLite since it uses
/// file-level locking.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in milliseconds.
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Counter persistence errors.
#[derive(Debug, Error)]
pub enum CounterError {
    /// Database operation failed.
    #[error("download counter database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Interface to the persisted download counter.
#[async_trait]
pub trait DownloadCounter: Send + Sync {
    /// Increments the count for one (credential, book) pair.
    async fn increment(&self, credential: &Credential, book_id: &str) -> Result<(), CounterError>;

    /// Reads the current count for one (credential, book) pair.
    async fn count(&self, credential: &Credential, book_id: &str) -> Result<i64, CounterError>;
}

/// SQLite-backed counter.
#[derive(Debug, Clone)]
pub struct SqliteDownloadCounter {
    pool: SqlitePool,
}

impl SqliteDownloadCounter {
    /// Opens (creating if needed) the counter database at `db_path`.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, CounterError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        Self::connect(&db_url).await
    }

    /// Opens an in-memory counter, for tests and ephemeral runs.
    pub async fn new_in_memory() -> Result<Self, CounterError> {
        Self::connect("sqlite::memory:").await
    }

    async fn connect(db_url: &str) -> Result<Self, CounterError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(db_url)
            .await?;

        // WAL mode for concurrent reads
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query(&format!("PRAGMA busy_timeout={BUSY_TIMEOUT_MS}"))
            .execute(&pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS download_counts (
                credential TEXT NOT NULL,
                book_id TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (credential, book_id)
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DownloadCounter for SqliteDownloadCounter {
    async fn increment(&self, credential: &Credential, book_id: &str) -> Result<(), CounterError> {
        sqlx::query(
            "INSERT INTO download_counts (credential, book_id, count) VALUES (?, ?, 1)
             ON CONFLICT (credential, book_id) DO UPDATE SET count = count + 1",
        )
        .bind(&credential.cookie)
        .bind(book_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count(&self, credential: &Credential, book_id: &str) -> Result<i64, CounterError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT count FROM download_counts WHERE credential = ? AND book_id = ?",
        )
        .bind(&credential.cookie)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(0, |(count,)| count))
    }
}
