use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

use crate::error::VaultError;

/// Database location used when `[db].path` is not set, relative to the vault root.
pub const DEFAULT_DB_RELATIVE: &str = ".claude/vault_search/vault.db";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub vault: VaultConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    pub root: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_exclude_folders")]
    pub exclude_folders: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_extension() -> String {
    "md".to_string()
}

fn default_exclude_folders() -> Vec<String> {
    [".obsidian", ".smart-env", ".claude", "assets", "Templates"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DbConfig {
    /// Relative paths are resolved against the vault root.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_min_chars() -> usize {
    100
}
fn default_max_chars() -> usize {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embed_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_embed_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_embed_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Chunks embedded and committed per transaction.
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: default_index_batch_size(),
        }
    }
}

fn default_index_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            overfetch_factor: default_overfetch_factor(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_limit() -> usize {
    5
}
fn default_overfetch_factor() -> usize {
    3
}
fn default_snippet_chars() -> usize {
    300
}

impl Config {
    /// Default configuration for a vault, with every section at its defaults.
    pub fn for_vault(root: impl Into<PathBuf>) -> Self {
        Self {
            vault: VaultConfig {
                root: root.into(),
                extension: default_extension(),
                exclude_folders: default_exclude_folders(),
                exclude_globs: Vec::new(),
            },
            db: DbConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            search: SearchConfig::default(),
        }
    }

    /// Configured database path, relative paths anchored at the vault root.
    /// Not yet resolved or checked; see [`Config::validate_db_path`].
    pub fn db_path(&self) -> PathBuf {
        match &self.db.path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => self.vault.root.join(p),
            None => self.vault.root.join(DEFAULT_DB_RELATIVE),
        }
    }

    /// Resolve the database path and ensure it lies inside the resolved vault root.
    ///
    /// Runs before any connection is opened so a misconfigured path never
    /// creates a file outside the vault.
    pub fn validate_db_path(&self) -> Result<PathBuf, VaultError> {
        let vault = resolve_path(&self.vault.root);
        let db = resolve_path(&self.db_path());
        if !path_is_within(&vault, &db) {
            return Err(VaultError::DbOutsideVault { db, vault });
        }
        Ok(db)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chars == 0 {
            bail!("chunking.max_chars must be > 0");
        }
        if self.chunking.min_chars > self.chunking.max_chars {
            bail!("chunking.min_chars must be <= chunking.max_chars");
        }
        if self.index.batch_size == 0 {
            bail!("index.batch_size must be > 0");
        }
        if self.search.default_limit < 1 {
            bail!("search.default_limit must be >= 1");
        }
        if self.search.overfetch_factor < 1 {
            bail!("search.overfetch_factor must be >= 1");
        }
        if self.vault.extension.trim_start_matches('.').is_empty() {
            bail!("vault.extension must not be empty");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "local" => {}
            "openai" => {
                if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                    bail!("embedding.dims must be > 0 when provider is 'openai'");
                }
                if self.embedding.model.is_none() {
                    bail!("embedding.model must be specified when provider is 'openai'");
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, local, or openai.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Make `path` absolute and resolve it the way a shell would.
///
/// Existing prefixes are canonicalized (following symlinks); the missing tail
/// is appended lexically with `.` dropped and `..` popping a component.
pub fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => {
                resolved.push(part);
                if let Ok(real) = resolved.canonicalize() {
                    resolved = real;
                }
            }
        }
    }
    resolved
}

/// True when `candidate` is `base` or a descendant of it (component-wise).
pub fn path_is_within(base: &Path, candidate: &Path) -> bool {
    candidate.starts_with(base)
}
