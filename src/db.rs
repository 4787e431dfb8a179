//! Connection pool setup and schema initialization.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DB_FILE_NAME;
use crate::repository::sqlite::schema;

/// Resolve the stable per-user cache directory the database file lives in.
pub fn default_db_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().context("failed to resolve platform cache directory")?;
    Ok(cache_dir.join("jobwatch").join(DB_FILE_NAME))
}

/// Open (creating if absent) the database at `db_path`, apply pragmas, and
/// idempotently (re-)initialize the schema.
pub async fn init_db(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create db directory: {}", parent.display()))?;
    }

    log::info!("opening database at {}", db_path.display());

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .with_context(|| format!("invalid database path: {}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30))
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database at {}", db_path.display()))?;

    schema::initialize_schema(&pool)
        .await
        .context("failed to initialize schema")?;

    log::info!("database ready at {}", db_path.display());
    Ok(pool)
}

/// In-memory database for tests: same pragmas and schema init path as
/// production, including foreign-key enforcement (so cascade/set-null
/// behavior is exercised the same way it runs in the real database).
pub async fn init_memory_db() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .context("invalid in-memory database URI")?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("failed to open in-memory database")?;
    schema::initialize_schema(&pool)
        .await
        .context("failed to initialize schema")?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_db_creates_parent_dir_and_is_reopenable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jobwatch.db");

        let pool = init_db(&path).await.unwrap();
        drop(pool);
        assert!(path.exists());

        // Reopening an existing file must not fail schema init.
        let pool = init_db(&path).await.unwrap();
        drop(pool);
    }
}
