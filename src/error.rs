//! Error taxonomy for the indexer, the query engine and the query gateway.
//!
//! Per-item problems (an unreadable note, malformed front matter) never reach
//! this type: they are logged and skipped where they happen. Everything here
//! aborts the current call.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    /// The resolved database path is not inside the resolved vault root.
    #[error("db_path must be within vault directory (db: {db}, vault: {vault})")]
    DbOutsideVault { db: PathBuf, vault: PathBuf },

    #[error("Database not found: {0}. Run: vault index --rebuild")]
    DatabaseNotFound(PathBuf),

    #[error("SQL contains forbidden keyword: {0}")]
    ForbiddenKeyword(String),

    #[error("SQL references table '{0}', which is not available to ad-hoc queries")]
    ForbiddenTable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Query failed: {source}")]
    Query {
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The index was built with a different embedding model; distances would be meaningless.
    #[error(
        "Index was built with {indexed}, but the configured embedding provider is {configured}. \
         Run: vault index --rebuild"
    )]
    EmbeddingProviderMismatch { indexed: String, configured: String },
}

impl VaultError {
    pub fn query(source: sqlx::Error) -> Self {
        VaultError::Query { source }
    }
}
