//! Index statistics.
//!
//! A quick summary of what is indexed: note and chunk counts, the busiest
//! folders and the status distribution. Used by `vault stats` to confirm an
//! index build did what was expected.

use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use std::path::PathBuf;

use crate::config::Config;
use crate::db;
use crate::error::VaultError;

/// Label for notes at the vault root, whose folder is empty.
pub const ROOT_FOLDER_LABEL: &str = "(root)";

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub db_path: PathBuf,
    pub size_bytes: u64,
    pub notes: i64,
    pub chunks: i64,
    /// Up to 10 folders, most notes first.
    pub top_folders: Vec<(String, i64)>,
    /// Every status value with its note count, most common first.
    pub statuses: Vec<(String, i64)>,
}

pub async fn collect_stats(config: &Config) -> Result<IndexStats> {
    let pool = db::connect_existing(config, true).await?;
    let db_path = config.validate_db_path()?;

    let notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
        .fetch_one(&pool)
        .await
        .map_err(VaultError::query)?;

    let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vec_chunks")
        .fetch_one(&pool)
        .await
        .map_err(VaultError::query)?;

    let folder_rows = sqlx::query(
        r#"
        SELECT COALESCE(folder, '') AS folder, COUNT(*) AS n
        FROM notes
        GROUP BY COALESCE(folder, '')
        ORDER BY n DESC, folder ASC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(VaultError::query)?;

    let status_rows = sqlx::query(
        r#"
        SELECT status, COUNT(*) AS n
        FROM notes
        WHERE status IS NOT NULL
        GROUP BY status
        ORDER BY n DESC, status ASC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(VaultError::query)?;

    pool.close().await;

    let top_folders = folder_rows
        .iter()
        .map(|row| {
            let folder: String = row.get("folder");
            let label = if folder.is_empty() {
                ROOT_FOLDER_LABEL.to_string()
            } else {
                folder
            };
            (label, row.get::<i64, _>("n"))
        })
        .collect();

    let statuses = status_rows
        .iter()
        .map(|row| (row.get::<String, _>("status"), row.get::<i64, _>("n")))
        .collect();

    let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    Ok(IndexStats {
        db_path,
        size_bytes,
        notes,
        chunks,
        top_folders,
        statuses,
    })
}

/// Run the stats command: collect and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let stats = collect_stats(config).await?;
    print!("{}", format_stats(&stats));
    Ok(())
}

pub fn format_stats(stats: &IndexStats) -> String {
    let mut out = String::new();
    out.push_str("Vault Search Index Stats\n");
    out.push_str("========================\n\n");
    out.push_str(&format!("  Database:    {}\n", stats.db_path.display()));
    out.push_str(&format!("  Size:        {}\n\n", format_bytes(stats.size_bytes)));
    out.push_str(&format!("  Notes:       {}\n", stats.notes));
    out.push_str(&format!("  Chunks:      {}\n", stats.chunks));

    if !stats.top_folders.is_empty() {
        out.push_str("\n  Top folders:\n");
        out.push_str(&format!("  {:<40} {:>6}\n", "FOLDER", "NOTES"));
        out.push_str(&format!("  {}\n", "-".repeat(47)));
        for (folder, count) in &stats.top_folders {
            out.push_str(&format!("  {:<40} {:>6}\n", folder, count));
        }
    }

    if !stats.statuses.is_empty() {
        out.push_str("\n  By status:\n");
        for (status, count) in &stats.statuses {
            out.push_str(&format!("  {:<40} {:>6}\n", status, count));
        }
    }

    out.push('\n');
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
