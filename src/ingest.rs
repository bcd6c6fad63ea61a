//! Index build pipeline.
//!
//! scan → parse → chunk → embed → store. Notes are written in one
//! transaction, then chunks are embedded and committed `index.batch_size` at
//! a time. An interrupted run keeps every committed batch; running it again
//! rewrites the same rows, so builds are safe to repeat.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::chunk::chunk_by_headings;
use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::migrate;
use crate::models::Chunk;
use crate::scanner;
use crate::store;

/// Summary of one index build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexReport {
    pub db_path: PathBuf,
    pub notes: usize,
    pub chunks: usize,
    pub batches: usize,
    pub skipped: usize,
}

/// Build or refresh the index for the configured vault.
///
/// With `rebuild`, the database file is deleted first so no chunk from an
/// earlier layout or embedding model survives.
pub async fn build_index(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    rebuild: bool,
) -> Result<IndexReport> {
    let db_path = config.validate_db_path()?;

    tracing::info!(vault = %config.vault.root.display(), "scanning vault");
    let scan = scanner::scan_vault(config)?;
    tracing::info!(notes = scan.notes.len(), skipped = scan.skipped, "scan complete");

    if rebuild {
        tracing::info!(db = %db_path.display(), "removing existing database for rebuild");
        db::remove_database(&db_path)?;
    }

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    store::pin_embedding_provider(&pool, provider).await?;

    let per_note: Vec<Vec<Chunk>> = scan
        .notes
        .iter()
        .map(|note| chunk_by_headings(&note.path, &note.body, &config.chunking))
        .collect();

    // Notes first, in one transaction. A note with no chunks loses its old ones here.
    let mut tx = pool.begin().await?;
    for (note, chunks) in scan.notes.iter().zip(&per_note) {
        store::upsert_note(&mut *tx, note)
            .await
            .with_context(|| format!("Failed to store note {}", note.path))?;
        if chunks.is_empty() {
            store::clear_chunks(&mut *tx, &note.path).await?;
        }
    }
    tx.commit().await?;
    tracing::info!(notes = scan.notes.len(), "indexed notes in metadata table");

    let all_chunks: Vec<Chunk> = per_note.into_iter().flatten().collect();
    let total = all_chunks.len();
    let batch_size = config.index.batch_size.max(1);
    let mut cleared: HashSet<&str> = HashSet::new();
    let mut batches = 0usize;

    tracing::info!(chunks = total, "generating embeddings");
    for (batch_no, batch) in all_chunks.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedding::embed_texts(provider, &texts)
            .await
            .with_context(|| format!("Embedding batch {} failed", batch_no + 1))?;

        let mut tx = pool.begin().await?;
        for (chunk, vector) in batch.iter().zip(&vectors) {
            if cleared.insert(chunk.path.as_str()) {
                store::clear_chunks(&mut *tx, &chunk.path).await?;
            }
            store::replace_chunk(&mut *tx, chunk, vector)
                .await
                .with_context(|| format!("Failed to store chunk {}", chunk.chunk_id))?;
        }
        tx.commit().await?;
        batches += 1;

        let done = (batch_no * batch_size + batch.len()).min(total);
        tracing::info!("processed {}/{} chunks", done, total);
    }

    pool.close().await;

    Ok(IndexReport {
        db_path,
        notes: scan.notes.len(),
        chunks: total,
        batches,
        skipped: scan.skipped,
    })
}

/// Run the index command: build with the configured provider and print a summary.
pub async fn run_index(config: &Config, rebuild: bool) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Indexing requires embeddings. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;

    let report = build_index(config, provider.as_ref(), rebuild).await?;

    println!("index {}", if rebuild { "rebuild" } else { "refresh" });
    println!("  database: {}", report.db_path.display());
    println!("  notes indexed: {}", report.notes);
    println!("  chunks embedded: {}", report.chunks);
    println!("  batches committed: {}", report.batches);
    if report.skipped > 0 {
        println!("  skipped (unreadable): {}", report.skipped);
    }
    println!("ok");
    Ok(())
}
