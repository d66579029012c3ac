//! Persisted key-value storage for the session record.
//!
//! The session survives restarts by being written as text under a fixed key.
//! [`SqliteStorage`] is the durable backend used by the client; [`MemoryStorage`]
//! keeps everything in-process (tests, throwaway sessions).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not be opened or initialized.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A read or write against an open backend failed.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Text storage that survives process restarts.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage. Cheap to clone; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), value.into());
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// SQLite-backed storage (one `kv` table in a local database file).
///
/// The database is opened lazily on first use, so constructing the storage
/// never fails and an unreadable file only surfaces as a [`StorageError`] on
/// the operation that needed it.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    path: PathBuf,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Storage at `{dir}/session.db`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("session.db"))
    }

    /// Storage under the OS data directory: `{data_dir}/shopfront/session.db`.
    pub fn in_default_location() -> anyhow::Result<Self> {
        Ok(Self::in_dir(default_data_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the pool, opening the database on first use.
    async fn pool(&self) -> Result<SqlitePool, StorageError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = open_pool(&self.path)
            .await
            .map_err(|err| StorageError::Unavailable(format!("{err:#}")))?;
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

async fn open_pool(path: &Path) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create storage directory at {:?}", parent))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    // A single connection keeps writes serialized; session traffic is tiny.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open session database at {:?}", path))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .context("failed to create kv table")?;

    Ok(pool)
}

#[async_trait]
impl SessionStorage for SqliteStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let pool = self.pool().await?;

        let row = sqlx::query("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&pool)
            .await
            .map_err(|err| StorageError::Operation(format!("load {key}: {err}")))?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(|err| StorageError::Operation(format!("decode {key}: {err}")))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let pool = self.pool().await?;

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key)
            DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .map_err(|err| StorageError::Operation(format!("save {key}: {err}")))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let pool = self.pool().await?;

        sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&pool)
            .await
            .map_err(|err| StorageError::Operation(format!("remove {key}: {err}")))?;

        Ok(())
    }
}

/// Resolve `{app_data_dir}/shopfront`, falling back to `~/.local/share`.
pub fn default_data_dir() -> anyhow::Result<PathBuf> {
    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    dir.push("shopfront");
    Ok(dir)
}
