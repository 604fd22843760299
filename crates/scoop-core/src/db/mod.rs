//! SQLite article store.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so readers are not blocked by an ingest in progress
//! - `busy_timeout = 5s` to absorb transient lock contention
//! - `foreign_keys = ON`
//!
//! The embedding dimension and model id are bound to the store the first time
//! it is opened and are invariant afterwards.

pub mod articles;
pub mod fts;
pub mod migrations;
pub mod schema;
pub mod verdicts;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::{path::Path, time::Duration};
use tracing::debug;

use crate::error::ErrorCode;

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Typed store failures that callers may want to branch on.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("embedding dimension mismatch: store holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding model mismatch: store was built with '{expected}', configured '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("store row for {article_id} is corrupt: {reason}")]
    CorruptRow { article_id: String, reason: String },
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DimensionMismatch { .. } | Self::ModelMismatch { .. } => {
                ErrorCode::DimensionMismatch
            }
            Self::CorruptRow { .. } => ErrorCode::StoreUnavailable,
        }
    }
}

/// Embedding space recorded in `store_meta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingSpace {
    pub dimension: usize,
    pub model: String,
}

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening, configuring, or migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open article store {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    debug!(path = %path.display(), "article store opened");

    Ok(conn)
}

/// Open a migrated in-memory store.
///
/// # Errors
///
/// Returns an error if migrations fail.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

pub(crate) fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

pub(crate) fn from_micros(us: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Integer,
            format!("timestamp {us} out of range").into(),
        )
    })
}

/// Read the recorded embedding space, if one has been bound yet.
///
/// # Errors
///
/// Returns an error if the metadata row cannot be read.
pub fn embedding_space(conn: &Connection) -> Result<Option<EmbeddingSpace>> {
    let row: Option<(Option<i64>, Option<String>)> = conn
        .query_row(
            "SELECT embedding_dim, embedding_model FROM store_meta WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .context("read store_meta")?;

    let Some((Some(dim), model)) = row else {
        return Ok(None);
    };
    let dimension = usize::try_from(dim).context("store_meta.embedding_dim out of range")?;
    Ok(Some(EmbeddingSpace {
        dimension,
        model: model.unwrap_or_default(),
    }))
}

/// Bind the store to an embedding space, or verify an existing binding.
///
/// A store whose model id was never recorded adopts `model`.
///
/// # Errors
///
/// Returns [`StoreError::DimensionMismatch`] or [`StoreError::ModelMismatch`]
/// if the store was built in a different embedding space, or an error if the
/// metadata cannot be written.
pub fn bind_embedding_space(conn: &Connection, dimension: usize, model: &str) -> Result<()> {
    if let Some(existing) = embedding_space(conn)? {
        if existing.dimension != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: existing.dimension,
                actual: dimension,
            }
            .into());
        }
        if existing.model.is_empty() {
            conn.execute(
                "UPDATE store_meta SET embedding_model = ?1 WHERE id = 1",
                params![model],
            )
            .context("record embedding model")?;
            debug!(model, "recorded embedding model for existing store");
        } else if existing.model != model {
            return Err(StoreError::ModelMismatch {
                expected: existing.model,
                actual: model.to_string(),
            }
            .into());
        }
        return Ok(());
    }

    let dim = i64::try_from(dimension).context("embedding dimension out of range")?;
    conn.execute(
        "UPDATE store_meta SET embedding_dim = ?1, embedding_model = ?2 WHERE id = 1",
        params![dim, model],
    )
    .context("record embedding space")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("scoop.db");
        (dir, path)
    }

    #[test]
    fn open_store_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path).expect("open store");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_store_runs_migrations() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path).expect("open store");
        let version = migrations::current_schema_version(&conn).expect("schema version");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn embedding_space_binds_once_and_rejects_other_dimensions() {
        let conn = open_in_memory().expect("open store");
        assert_eq!(embedding_space(&conn).expect("read"), None);

        bind_embedding_space(&conn, 384, "hashed-bow-v1").expect("bind");
        assert_eq!(
            embedding_space(&conn).expect("read"),
            Some(EmbeddingSpace {
                dimension: 384,
                model: "hashed-bow-v1".into()
            })
        );

        bind_embedding_space(&conn, 384, "hashed-bow-v1").expect("same space is accepted");

        let err = bind_embedding_space(&conn, 1536, "hashed-bow-v1").unwrap_err();
        let store_err = err.downcast_ref::<StoreError>().expect("typed error");
        assert_eq!(store_err.code(), ErrorCode::DimensionMismatch);
    }

    #[test]
    fn embedding_space_rejects_other_model_at_same_dimension() {
        let conn = open_in_memory().expect("open store");
        bind_embedding_space(&conn, 384, "hashed-bow-v1").expect("bind");

        let err =
            bind_embedding_space(&conn, 384, "openai/text-embedding-3-small").unwrap_err();
        let store_err = err.downcast_ref::<StoreError>().expect("typed error");
        assert!(matches!(store_err, StoreError::ModelMismatch { .. }));
        assert_eq!(store_err.code(), ErrorCode::DimensionMismatch);
        assert_eq!(
            embedding_space(&conn).expect("read").map(|space| space.model),
            Some("hashed-bow-v1".to_string())
        );
    }

    #[test]
    fn store_without_recorded_model_adopts_the_first_one() {
        let conn = open_in_memory().expect("open store");
        conn.execute(
            "UPDATE store_meta SET embedding_dim = 384, embedding_model = NULL WHERE id = 1",
            [],
        )
        .expect("seed legacy meta");

        bind_embedding_space(&conn, 384, "hashed-bow-v1").expect("adopt model");
        assert_eq!(
            embedding_space(&conn).expect("read").map(|space| space.model),
            Some("hashed-bow-v1".to_string())
        );
        assert!(bind_embedding_space(&conn, 384, "other-model").is_err());
    }
}
