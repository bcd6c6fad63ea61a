use anyhow::Result;
use sqlx::SqlitePool;

/// Create the notes table, the chunk vector table, and the index metadata
/// table. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Document store: one row per note, promoted front-matter columns plus the full mapping
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            path TEXT PRIMARY KEY,
            folder TEXT,
            filename TEXT,
            title TEXT,
            modified REAL,
            status TEXT,
            priority TEXT,
            due TEXT,
            scheduled TEXT,
            tags TEXT,
            projects TEXT,
            contexts TEXT,
            ticker TEXT,
            strategy TEXT,
            expiry TEXT,
            frontmatter_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_notes_folder ON notes(folder)",
        "CREATE INDEX IF NOT EXISTS idx_notes_status ON notes(status)",
        "CREATE INDEX IF NOT EXISTS idx_notes_due ON notes(due)",
        "CREATE INDEX IF NOT EXISTS idx_notes_ticker ON notes(ticker)",
    ] {
        sqlx::query(stmt).execute(pool).await?;
    }

    // Vector index: embeddings are little-endian f32 BLOBs
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vec_chunks (
            chunk_id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            heading TEXT NOT NULL,
            chunk_text TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vec_chunks_path ON vec_chunks(path)")
        .execute(pool)
        .await?;

    // Which embedding model produced the vectors
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
