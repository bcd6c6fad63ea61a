//! # Vault Search CLI (`vault`)
//!
//! Builds the index for a markdown vault and queries it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vault index [--rebuild]` | Scan, chunk, embed and store every note |
//! | `vault stats` | Note and chunk counts, folders, statuses |
//! | `vault search "<query>"` | Hybrid vector + metadata search |
//! | `vault query "<sql>"` | Read-only SQL over the `notes` table |
//! | `vault schema` | Columns of `notes` and sample values |
//!
//! ## Examples
//!
//! ```bash
//! vault --config ./vault.toml index --rebuild
//! vault --vault-path ~/notes search "migration plan" --folder Projects -n 10
//! vault --vault-path ~/notes query "SELECT path FROM notes WHERE due < '2025-01-01'" --format json
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use vault_search::config::{self, Config};
use vault_search::search::SearchFilters;
use vault_search::{dataview, ingest, search, stats};

/// Front-matter aware indexing and hybrid search for a markdown vault.
///
/// Settings come from `--config` (TOML) when given; otherwise defaults are
/// used for the vault named by `--vault-path`.
#[derive(Parser)]
#[command(
    name = "vault",
    about = "Front-matter aware indexing and hybrid semantic search over markdown notes",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vault root. Overrides `[vault].root`.
    #[arg(long, global = true)]
    vault_path: Option<PathBuf>,

    /// Index database path. Overrides `[db].path`; must lie inside the vault.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the index.
    ///
    /// Re-running is safe: notes are replaced by path and chunks by id.
    Index {
        /// Delete the database first and index from scratch.
        #[arg(long)]
        rebuild: bool,
    },

    /// Show index statistics.
    Stats,

    /// Hybrid search: nearest chunks by embedding, filtered by metadata.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results.
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only notes whose folder starts with this prefix.
        #[arg(long)]
        folder: Option<String>,

        /// Only notes with exactly this status.
        #[arg(long)]
        status: Option<String>,

        /// Only notes whose tags contain this text.
        #[arg(long)]
        tag: Option<String>,

        /// Only files with this extension.
        #[arg(long)]
        extension: Option<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run a read-only SQL statement against the `notes` table.
    Query {
        sql: String,

        /// Output format: `table` or `json`.
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Describe the `notes` table.
    Schema {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Resolve the effective configuration from the file and the override flags.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match (&cli.config, &cli.vault_path) {
        (Some(path), _) => config::load_config(path)?,
        (None, Some(root)) => Config::for_vault(root),
        (None, None) => bail!("Either --config or --vault-path is required."),
    };

    if let Some(root) = &cli.vault_path {
        cfg.vault.root = root.clone();
    }
    if let Some(db_path) = &cli.db_path {
        cfg.db.path = Some(db_path.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vault_search=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli)?;

    match cli.command {
        Commands::Index { rebuild } => {
            ingest::run_index(&cfg, rebuild).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Search {
            query,
            limit,
            folder,
            status,
            tag,
            extension,
            json,
        } => {
            let filters = SearchFilters {
                folder,
                status,
                tag,
                extension,
            };
            search::run_search(&cfg, &query, limit, filters, json).await?;
        }
        Commands::Query { sql, format } => {
            dataview::run_query(&cfg, &sql, &format).await?;
        }
        Commands::Schema { json } => {
            dataview::run_schema(&cfg, json).await?;
        }
    }

    Ok(())
}
