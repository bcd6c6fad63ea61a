//! Heading-boundary text chunker.
//!
//! Splits a note body at markdown headings of levels 1–3. Each section is
//! labelled with its nearest heading and kept only when it carries at least
//! `min_chars` characters of text; sections are truncated to `max_chars`.
//!
//! A note whose sections are all too short still yields one `"Full Note"`
//! chunk so every non-empty note stays reachable by semantic search.

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Heading assigned to text that precedes the first heading.
pub const INTRO_HEADING: &str = "Introduction";
/// Heading of the fallback chunk covering the whole body.
pub const FULL_NOTE_HEADING: &str = "Full Note";

/// Split `body` into chunks with ids `"{path}#0"`, `"{path}#1"`, ...
pub fn chunk_by_headings(path: &str, body: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current_heading = INTRO_HEADING.to_string();
    let mut current_text = String::new();

    for line in body.split_inclusive('\n') {
        if let Some(heading) = heading_text(line) {
            flush(path, &current_heading, &current_text, config, &mut chunks);
            current_heading = heading.to_string();
            current_text.clear();
        } else {
            current_text.push_str(line);
        }
    }
    flush(path, &current_heading, &current_text, config, &mut chunks);

    let trimmed = body.trim();
    if chunks.is_empty() && !trimmed.is_empty() {
        chunks.push(Chunk {
            chunk_id: format!("{}#0", path),
            path: path.to_string(),
            heading: FULL_NOTE_HEADING.to_string(),
            text: truncate_chars(trimmed, config.max_chars).to_string(),
        });
    }

    chunks
}

fn flush(
    path: &str,
    heading: &str,
    text: &str,
    config: &ChunkingConfig,
    chunks: &mut Vec<Chunk>,
) {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() < config.min_chars {
        return;
    }
    chunks.push(Chunk {
        chunk_id: format!("{}#{}", path, chunks.len()),
        path: path.to_string(),
        heading: heading.to_string(),
        text: truncate_chars(trimmed, config.max_chars).to_string(),
    });
}

/// Heading text of a `#`, `##` or `###` line, or `None` for any other line.
fn heading_text(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\n', '\r']);
    let rest = line.trim_start_matches('#');
    let level = line.len() - rest.len();
    if !(1..=3).contains(&level) || !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Longest prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
