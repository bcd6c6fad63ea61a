//! Row-level access to the two stores sharing the index database.
//!
//! The `notes` table is keyed by note path and written with
//! insert-or-replace. The `vec_chunks` table is keyed by chunk id; a chunk is
//! replaced by deleting the old row and inserting the new one, so re-indexing
//! a note never leaves a stale copy behind.

use anyhow::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::embedding::{blob_to_vec, l2_distance, vec_to_blob, EmbeddingProvider};
use crate::error::VaultError;
use crate::models::{frontmatter_to_json, Chunk, Note, PromotedFields};

pub async fn upsert_note(conn: &mut SqliteConnection, note: &Note) -> Result<()> {
    let fields = PromotedFields::from_frontmatter(&note.frontmatter);

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO notes
            (path, folder, filename, title, modified, status, priority, due, scheduled,
             tags, projects, contexts, ticker, strategy, expiry, frontmatter_json)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&note.path)
    .bind(&note.folder)
    .bind(&note.filename)
    .bind(&note.title)
    .bind(note.modified)
    .bind(&fields.status)
    .bind(&fields.priority)
    .bind(&fields.due)
    .bind(&fields.scheduled)
    .bind(&fields.tags)
    .bind(&fields.projects)
    .bind(&fields.contexts)
    .bind(&fields.ticker)
    .bind(&fields.strategy)
    .bind(&fields.expiry)
    .bind(frontmatter_to_json(&note.frontmatter))
    .execute(conn)
    .await?;

    Ok(())
}

/// Drop every chunk of a note. Used once per note before its first new chunk
/// is written so chunks from a longer previous version disappear.
pub async fn clear_chunks(conn: &mut SqliteConnection, path: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM vec_chunks WHERE path = ?")
        .bind(path)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Explicit delete-then-insert of one chunk and its embedding.
pub async fn replace_chunk(
    conn: &mut SqliteConnection,
    chunk: &Chunk,
    embedding: &[f32],
) -> Result<()> {
    sqlx::query("DELETE FROM vec_chunks WHERE chunk_id = ?")
        .bind(&chunk.chunk_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO vec_chunks (chunk_id, path, heading, chunk_text, embedding) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&chunk.chunk_id)
    .bind(&chunk.path)
    .bind(&chunk.heading)
    .bind(&chunk.text)
    .bind(vec_to_blob(embedding))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// ============ Embedding identity ============

/// Human-readable identity of an embedding model, e.g. `all-minilm-l6-v2 (384d)`.
pub fn provider_identity(model: &str, dims: usize) -> String {
    format!("{} ({}d)", model, dims)
}

/// Record the model that produced the vectors, or verify it matches the one
/// already recorded. Mixing models would make distances meaningless.
pub async fn pin_embedding_provider(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
) -> Result<()> {
    match check_embedding_provider(pool, provider).await? {
        true => Ok(()),
        false => {
            let mut tx = pool.begin().await?;
            for (key, value) in [
                ("embedding_model", provider.model_name().to_string()),
                ("embedding_dims", provider.dims().to_string()),
            ] {
                sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?, ?)")
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(())
        }
    }
}

/// `Ok(true)` when the recorded model matches, `Ok(false)` when none is
/// recorded yet, and `EmbeddingProviderMismatch` otherwise.
pub async fn check_embedding_provider(
    pool: &SqlitePool,
    provider: &dyn EmbeddingProvider,
) -> Result<bool> {
    let rows = sqlx::query(
        "SELECT key, value FROM index_meta WHERE key IN ('embedding_model', 'embedding_dims')",
    )
    .fetch_all(pool)
    .await?;

    let mut model: Option<String> = None;
    let mut dims: Option<String> = None;
    for row in &rows {
        let key: String = row.get("key");
        let value: String = row.get("value");
        match key.as_str() {
            "embedding_model" => model = Some(value),
            _ => dims = Some(value),
        }
    }

    let (Some(model), Some(dims)) = (model, dims) else {
        return Ok(false);
    };

    if model == provider.model_name() && dims == provider.dims().to_string() {
        Ok(true)
    } else {
        Err(VaultError::EmbeddingProviderMismatch {
            indexed: format!("{} ({}d)", model, dims),
            configured: provider_identity(provider.model_name(), provider.dims()),
        }
        .into())
    }
}

// ============ Vector index reads ============

/// A chunk retrieved by nearest-neighbour search.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub chunk_id: String,
    pub path: String,
    pub heading: String,
    pub text: String,
    pub distance: f64,
}

/// The `k` chunks closest to `query_vec` by L2 distance, nearest first.
///
/// Distances are computed in-process over every stored vector; ties are
/// broken by chunk id so results are deterministic.
pub async fn nearest_chunks(
    pool: &SqlitePool,
    query_vec: &[f32],
    k: usize,
) -> Result<Vec<ChunkCandidate>, VaultError> {
    let rows = sqlx::query("SELECT chunk_id, path, heading, chunk_text, embedding FROM vec_chunks")
        .fetch_all(pool)
        .await
        .map_err(VaultError::query)?;

    let mut candidates = Vec::with_capacity(rows.len());
    for row in &rows {
        let blob: Vec<u8> = row.try_get("embedding").map_err(VaultError::query)?;
        let vector = blob_to_vec(&blob);
        let Some(distance) = l2_distance(query_vec, &vector) else {
            return Err(VaultError::DimensionMismatch {
                expected: vector.len(),
                actual: query_vec.len(),
            });
        };
        candidates.push(ChunkCandidate {
            chunk_id: row.try_get("chunk_id").map_err(VaultError::query)?,
            path: row.try_get("path").map_err(VaultError::query)?,
            heading: row.try_get("heading").map_err(VaultError::query)?,
            text: row.try_get("chunk_text").map_err(VaultError::query)?,
            distance: distance as f64,
        });
    }

    sort_by_distance(&mut candidates);
    candidates.truncate(k);
    Ok(candidates)
}

pub fn sort_by_distance(candidates: &mut [ChunkCandidate]) {
    candidates.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}

// ============ Document store reads ============

/// The `notes` columns joined onto search results.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMetadata {
    pub title: Option<String>,
    pub folder: Option<String>,
    pub filename: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub tags: Option<String>,
}

pub async fn note_metadata(
    pool: &SqlitePool,
    path: &str,
) -> Result<Option<NoteMetadata>, VaultError> {
    let row = sqlx::query(
        "SELECT title, folder, filename, status, priority, due, tags FROM notes WHERE path = ?",
    )
    .bind(path)
    .fetch_optional(pool)
    .await
    .map_err(VaultError::query)?;

    row.map(|row| {
        Ok::<_, sqlx::Error>(NoteMetadata {
            title: row.try_get("title")?,
            folder: row.try_get("folder")?,
            filename: row.try_get("filename")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            due: row.try_get("due")?,
            tags: row.try_get("tags")?,
        })
    })
    .transpose()
    .map_err(VaultError::query)
}
