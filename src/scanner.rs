//! Vault walker.
//!
//! Yields the notes under the vault root. Symbolic links are never followed,
//! anything that resolves outside the root is dropped, and excluded folders
//! are pruned before they are descended into. Unreadable files are skipped
//! with a warning.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::{path_is_within, Config};
use crate::frontmatter::{extract_title, parse_frontmatter_with_status, FrontmatterStatus};
use crate::models::Note;

/// Notes read from the vault plus how many candidates were skipped.
#[derive(Debug, Default)]
pub struct VaultScan {
    pub notes: Vec<Note>,
    pub skipped: usize,
}

pub fn scan_vault(config: &Config) -> Result<VaultScan> {
    let root = &config.vault.root;
    let mut scan = VaultScan::default();

    for path in candidate_paths(config)? {
        match read_note(root, &path) {
            Ok(note) => scan.notes.push(note),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read note, skipping");
                scan.skipped += 1;
            }
        }
    }

    Ok(scan)
}

/// Paths of every indexable file under the vault root, sorted.
pub fn candidate_paths(config: &Config) -> Result<Vec<PathBuf>> {
    let root = &config.vault.root;
    if !root.is_dir() {
        bail!("Vault root does not exist: {}", root.display());
    }
    let canonical_root = root.canonicalize()?;
    let extension = config.vault.extension.trim_start_matches('.');
    let exclude_set = build_globset(&config.vault.exclude_globs)?;
    let excluded = &config.vault.exclude_folders;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded_name(entry, excluded));

    let mut paths = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "could not read directory entry, skipping");
                continue;
            }
        };

        if entry.path_is_symlink() || !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative
            .components()
            .any(|c| excluded.iter().any(|name| c.as_os_str() == name.as_str()))
        {
            continue;
        }
        if exclude_set.is_match(relative_string(relative)) {
            continue;
        }

        match path.canonicalize() {
            Ok(real) if path_is_within(&canonical_root, &real) => paths.push(path.to_path_buf()),
            Ok(real) => {
                tracing::warn!(path = %path.display(), resolved = %real.display(), "outside vault root, skipping");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not resolve path, skipping");
            }
        }
    }

    paths.sort();
    Ok(paths)
}

fn is_excluded_name(entry: &DirEntry, excluded: &[String]) -> bool {
    entry.file_type().is_dir()
        && excluded
            .iter()
            .any(|name| entry.file_name() == name.as_str())
}

/// Read and parse one note. `path` must lie under `root`.
pub fn read_note(root: &Path, path: &Path) -> Result<Note> {
    let content = std::fs::read_to_string(path)?;
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()
        .ok()
        .and_then(|m| m.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let relative = path.strip_prefix(root)?;
    let rel_str = relative_string(relative);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let folder = relative
        .parent()
        .map(relative_string)
        .unwrap_or_default();

    let (frontmatter, body, status) = parse_frontmatter_with_status(&content);
    if let FrontmatterStatus::Malformed(reason) = &status {
        tracing::warn!(path = %rel_str, %reason, "malformed front matter, indexing as plain text");
    }
    let title = extract_title(body, &filename);

    Ok(Note {
        path: rel_str,
        folder,
        filename,
        title,
        modified,
        body: body.to_string(),
        frontmatter,
    })
}

/// `/`-separated form of a relative path, independent of platform.
fn relative_string(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
