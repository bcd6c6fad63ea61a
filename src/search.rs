//! Hybrid search: vector nearest neighbours joined with note metadata.
//!
//! The vector table knows nothing about front matter, so structured filters
//! are applied after retrieval. When any filter is active the engine
//! over-fetches `overfetch_factor × limit` candidates first; if too few of
//! them survive the filters the result is simply shorter than requested.

use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};

use crate::chunk::truncate_chars;
use crate::config::Config;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::VaultError;
use crate::models::SearchResult;
use crate::render;
use crate::store::{self, ChunkCandidate, NoteMetadata};

/// Structured filters, combined with AND. `None` means inactive.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Folder prefix, e.g. `Projects` matches `Projects/Alpha`.
    pub folder: Option<String>,
    /// Exact status.
    pub status: Option<String>,
    /// Substring of the JSON-encoded tag list.
    pub tag: Option<String>,
    /// File extension, with or without the leading dot.
    pub extension: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.folder.is_none()
            && self.status.is_none()
            && self.tag.is_none()
            && self.extension.is_none()
    }

    /// Whether a note (or the lack of one) passes every active filter.
    ///
    /// Folder, tag and extension compare ASCII case-insensitively; status is
    /// exact. A chunk whose note row is missing passes only when no filter
    /// is active.
    pub fn matches(&self, meta: Option<&NoteMetadata>) -> bool {
        if self.is_empty() {
            return true;
        }
        let Some(meta) = meta else {
            return false;
        };

        if let Some(folder) = &self.folder {
            let Some(note_folder) = &meta.folder else {
                return false;
            };
            if !starts_with_ignore_case(note_folder, folder) {
                return false;
            }
        }

        if let Some(status) = &self.status {
            if meta.status.as_deref() != Some(status.as_str()) {
                return false;
            }
        }

        if let Some(tag) = &self.tag {
            let Some(tags) = &meta.tags else {
                return false;
            };
            if !tags.to_ascii_lowercase().contains(&tag.to_ascii_lowercase()) {
                return false;
            }
        }

        if let Some(ext) = &self.extension {
            let Some(filename) = &meta.filename else {
                return false;
            };
            let suffix = format!(".{}", ext.trim_start_matches('.'));
            if !ends_with_ignore_case(filename, &suffix) {
                return false;
            }
        }

        true
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub filters: SearchFilters,
}

impl SearchRequest {
    /// A request with the configured default limit and no filters.
    pub fn new(config: &Config, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: config.search.default_limit,
            filters: SearchFilters::default(),
        }
    }
}

/// Run a hybrid search against an existing index.
///
/// Results are ordered by ascending distance and hold at most
/// `request.limit` entries.
pub async fn search(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    request: &SearchRequest,
) -> Result<Vec<SearchResult>> {
    if request.query.trim().is_empty() {
        return Err(VaultError::InvalidRequest("query must not be empty".into()).into());
    }
    if request.limit == 0 {
        return Err(VaultError::InvalidRequest("limit must be at least 1".into()).into());
    }

    let pool = db::connect_existing(config, true).await?;
    store::check_embedding_provider(&pool, provider).await?;

    let query_vec = embedding::embed_query(provider, &request.query).await?;

    let fetch_k = candidate_count(
        request.limit,
        &request.filters,
        config.search.overfetch_factor,
    );
    let candidates = store::nearest_chunks(&pool, &query_vec, fetch_k).await?;
    tracing::debug!(
        fetched = candidates.len(),
        requested = fetch_k,
        "vector candidates"
    );

    let mut metadata: HashMap<String, Option<NoteMetadata>> = HashMap::new();
    for candidate in &candidates {
        if !metadata.contains_key(&candidate.path) {
            let meta = store::note_metadata(&pool, &candidate.path).await?;
            metadata.insert(candidate.path.clone(), meta);
        }
    }
    pool.close().await;

    let results = assemble_results(
        candidates,
        &metadata,
        &request.filters,
        request.limit,
        config.search.snippet_chars,
    );
    tracing::debug!(results = results.len(), "search complete");
    Ok(results)
}

/// How many nearest chunks to fetch: `limit`, or `overfetch_factor × limit`
/// when filters will discard some. Saturates instead of overflowing.
fn candidate_count(limit: usize, filters: &SearchFilters, overfetch_factor: usize) -> usize {
    if filters.is_empty() {
        limit
    } else {
        limit.saturating_mul(overfetch_factor.max(1))
    }
}

/// Filter, order, dedupe and truncate joined candidates.
fn assemble_results(
    mut candidates: Vec<ChunkCandidate>,
    metadata: &HashMap<String, Option<NoteMetadata>>,
    filters: &SearchFilters,
    limit: usize,
    snippet_chars: usize,
) -> Vec<SearchResult> {
    store::sort_by_distance(&mut candidates);

    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();
    for candidate in candidates {
        let meta = metadata.get(&candidate.path).and_then(|m| m.as_ref());
        if !filters.matches(meta) {
            continue;
        }
        if !seen.insert(candidate.chunk_id.clone()) {
            continue;
        }
        results.push(to_result(candidate, meta, snippet_chars));
        if results.len() == limit {
            break;
        }
    }
    results
}

fn to_result(
    candidate: ChunkCandidate,
    meta: Option<&NoteMetadata>,
    snippet_chars: usize,
) -> SearchResult {
    let snippet = make_snippet(&candidate.text, snippet_chars);
    let tags = meta
        .and_then(|m| m.tags.as_deref())
        .and_then(|t| serde_json::from_str::<Vec<serde_json::Value>>(t).ok())
        .unwrap_or_default();

    SearchResult {
        chunk_id: candidate.chunk_id,
        path: candidate.path,
        heading: candidate.heading,
        snippet,
        distance: candidate.distance,
        title: meta.and_then(|m| m.title.clone()),
        folder: meta.and_then(|m| m.folder.clone()),
        status: meta.and_then(|m| m.status.clone()),
        priority: meta.and_then(|m| m.priority.clone()),
        due: meta.and_then(|m| m.due.clone()),
        tags,
    }
}

/// Run the search command and print the hits as a listing or JSON.
pub async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    filters: SearchFilters,
    json: bool,
) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Search requires embeddings. Set [embedding] provider in config.");
    }
    let provider = embedding::create_provider(&config.embedding)?;

    let request = SearchRequest {
        query: query.to_string(),
        limit: limit.unwrap_or(config.search.default_limit),
        filters,
    };
    let results = search(config, provider.as_ref(), &request).await?;

    if json {
        println!("{}", render::to_json(&results)?);
    } else {
        println!("{}", render::format_search_results(&results, query));
    }
    Ok(())
}

/// First `max` characters of `text`, with `...` appended when cut.
pub fn make_snippet(text: &str, max: usize) -> String {
    let cut = truncate_chars(text, max);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(folder: &str, filename: &str, status: Option<&str>, tags: Option<&str>) -> NoteMetadata {
        NoteMetadata {
            title: Some(filename.trim_end_matches(".md").to_string()),
            folder: Some(folder.to_string()),
            filename: Some(filename.to_string()),
            status: status.map(String::from),
            priority: None,
            due: None,
            tags: tags.map(String::from),
        }
    }

    fn candidate(id: &str, path: &str, distance: f64) -> ChunkCandidate {
        ChunkCandidate {
            chunk_id: id.to_string(),
            path: path.to_string(),
            heading: "H".to_string(),
            text: format!("body of {}", id),
            distance,
        }
    }

    #[test]
    fn test_empty_filters_match_everything() {
        let filters = SearchFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(None));
        assert!(filters.matches(Some(&meta("", "a.md", None, None))));
    }

    #[test]
    fn test_missing_note_fails_active_filter() {
        let filters = SearchFilters {
            status: Some("open".into()),
            ..Default::default()
        };
        assert!(!filters.matches(None));
    }

    #[test]
    fn test_folder_prefix_case_insensitive() {
        let filters = SearchFilters {
            folder: Some("projects".into()),
            ..Default::default()
        };
        assert!(filters.matches(Some(&meta("Projects/Alpha", "a.md", None, None))));
        assert!(!filters.matches(Some(&meta("Areas", "a.md", None, None))));
    }

    #[test]
    fn test_status_is_exact() {
        let filters = SearchFilters {
            status: Some("open".into()),
            ..Default::default()
        };
        assert!(filters.matches(Some(&meta("", "a.md", Some("open"), None))));
        assert!(!filters.matches(Some(&meta("", "a.md", Some("Open"), None))));
        assert!(!filters.matches(Some(&meta("", "a.md", Some("reopened"), None))));
        assert!(!filters.matches(Some(&meta("", "a.md", None, None))));
    }

    #[test]
    fn test_tag_substring_of_serialized_list() {
        let filters = SearchFilters {
            tag: Some("rust".into()),
            ..Default::default()
        };
        assert!(filters.matches(Some(&meta("", "a.md", None, Some(r#"["rustlang","cli"]"#)))));
        assert!(!filters.matches(Some(&meta("", "a.md", None, Some(r#"["python"]"#)))));
        assert!(!filters.matches(Some(&meta("", "a.md", None, None))));
    }

    #[test]
    fn test_extension_with_or_without_dot() {
        let note = meta("", "a.md", None, None);
        for ext in ["md", ".md", "MD"] {
            let filters = SearchFilters {
                extension: Some(ext.into()),
                ..Default::default()
            };
            assert!(filters.matches(Some(&note)), "extension {}", ext);
        }
        let filters = SearchFilters {
            extension: Some("txt".into()),
            ..Default::default()
        };
        assert!(!filters.matches(Some(&note)));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let filters = SearchFilters {
            folder: Some("Notes".into()),
            status: Some("open".into()),
            ..Default::default()
        };
        assert!(filters.matches(Some(&meta("Notes", "a.md", Some("open"), None))));
        assert!(!filters.matches(Some(&meta("Notes", "a.md", Some("closed"), None))));
        assert!(!filters.matches(Some(&meta("Other", "a.md", Some("open"), None))));
    }

    #[test]
    fn test_candidate_count_overfetches_only_with_filters() {
        let status = SearchFilters {
            status: Some("open".into()),
            ..Default::default()
        };
        assert_eq!(candidate_count(5, &SearchFilters::default(), 3), 5);
        assert_eq!(candidate_count(5, &status, 3), 15);
        assert_eq!(candidate_count(5, &status, 0), 5);
    }

    #[test]
    fn test_candidate_count_saturates_for_huge_limit() {
        let status = SearchFilters {
            status: Some("open".into()),
            ..Default::default()
        };
        assert_eq!(candidate_count(usize::MAX, &status, 3), usize::MAX);
    }

    #[test]
    fn test_assemble_sorts_filters_and_truncates() {
        let mut metadata = HashMap::new();
        metadata.insert("open.md".to_string(), Some(meta("", "open.md", Some("open"), None)));
        metadata.insert("closed.md".to_string(), Some(meta("", "closed.md", Some("closed"), None)));

        let candidates = vec![
            candidate("open.md#1", "open.md", 0.9),
            candidate("closed.md#0", "closed.md", 0.1),
            candidate("open.md#0", "open.md", 0.5),
            candidate("open.md#2", "open.md", 1.5),
        ];
        let filters = SearchFilters {
            status: Some("open".into()),
            ..Default::default()
        };

        let results = assemble_results(candidates, &metadata, &filters, 2, 300);
        let ids: Vec<&str> = results.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["open.md#0", "open.md#1"]);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_assemble_dedupes_and_underfills_silently() {
        let metadata = HashMap::new();
        let candidates = vec![
            candidate("a.md#0", "a.md", 0.2),
            candidate("a.md#0", "a.md", 0.2),
        ];
        let results = assemble_results(candidates, &metadata, &SearchFilters::default(), 5, 300);
        assert_eq!(results.len(), 1);
        assert!(results[0].title.is_none());
        assert!(results[0].tags.is_empty());
    }

    #[test]
    fn test_result_decodes_tags() {
        let mut metadata = HashMap::new();
        metadata.insert(
            "a.md".to_string(),
            Some(meta("", "a.md", None, Some(r#"["x","y"]"#))),
        );
        let results = assemble_results(
            vec![candidate("a.md#0", "a.md", 0.0)],
            &metadata,
            &SearchFilters::default(),
            1,
            300,
        );
        assert_eq!(results[0].tags, vec![serde_json::json!("x"), serde_json::json!("y")]);
    }

    #[test]
    fn test_make_snippet() {
        assert_eq!(make_snippet("short", 300), "short");
        let long = "é".repeat(301);
        let snippet = make_snippet(&long, 300);
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 303);
    }
}
