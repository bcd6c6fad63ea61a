use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::config::Config;
use crate::error::VaultError;

/// Open (creating if needed) the index database for writing.
///
/// The database path is checked against the vault root first; nothing is
/// created on disk when the check fails.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = config.validate_db_path()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Open an existing index database.
///
/// With `read_only`, SQLite itself refuses every write on the connection.
pub async fn connect_existing(config: &Config, read_only: bool) -> Result<SqlitePool> {
    let db_path = config.validate_db_path()?;
    ensure_exists(&db_path)?;

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .read_only(read_only);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

fn ensure_exists(db_path: &Path) -> Result<(), VaultError> {
    if db_path.is_file() {
        Ok(())
    } else {
        Err(VaultError::DatabaseNotFound(db_path.to_path_buf()))
    }
}

/// Delete the database file and its WAL side files.
pub fn remove_database(db_path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        let path = Path::new(&name);
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
