//! Front-matter splitting and title extraction.
//!
//! A note may open with a YAML block fenced by `---` lines. Anything that
//! cannot be read as a YAML mapping is treated as plain body text; parsing
//! never fails.

use std::path::Path;

use crate::models::{Frontmatter, MetaValue};

/// Outcome of splitting a note, kept separate so callers can log malformed blocks.
#[derive(Debug, PartialEq)]
pub enum FrontmatterStatus {
    Absent,
    Parsed,
    Malformed(String),
}

/// Split `content` into its front-matter mapping and body.
pub fn parse_frontmatter(content: &str) -> (Frontmatter, &str) {
    let (fm, body, _) = parse_frontmatter_with_status(content);
    (fm, body)
}

pub fn parse_frontmatter_with_status(content: &str) -> (Frontmatter, &str, FrontmatterStatus) {
    let Some((block, body)) = split_block(content) else {
        return (Frontmatter::new(), content, FrontmatterStatus::Absent);
    };

    if block.trim().is_empty() {
        return (Frontmatter::new(), body, FrontmatterStatus::Parsed);
    }

    match serde_yaml::from_str::<serde_yaml::Value>(block) {
        Ok(serde_yaml::Value::Null) => (Frontmatter::new(), body, FrontmatterStatus::Parsed),
        Ok(value) => match MetaValue::from_yaml(&value) {
            MetaValue::Map(map) => (map, body, FrontmatterStatus::Parsed),
            _ => (
                Frontmatter::new(),
                content,
                FrontmatterStatus::Malformed("front matter is not a mapping".to_string()),
            ),
        },
        Err(e) => (
            Frontmatter::new(),
            content,
            FrontmatterStatus::Malformed(e.to_string()),
        ),
    }
}

/// Locate the `---` fenced block. Returns `(block, body)` or `None` when the
/// opening or closing fence is missing.
fn split_block(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let first_newline = rest.find('\n')?;
    if !rest[..first_newline].trim().is_empty() {
        return None;
    }

    let block_start = 3 + first_newline + 1;
    let mut offset = block_start;
    for line in content[block_start..].split_inclusive('\n') {
        if line.trim_end() == "---" {
            let block = &content[block_start..offset];
            let body = &content[offset + line.len()..];
            return Some((block, body));
        }
        offset += line.len();
    }
    None
}

/// Title from the first `# ` heading, falling back to the filename stem.
pub fn extract_title(body: &str, filename: &str) -> String {
    for line in body.lines() {
        if let Some(rest) = line.strip_prefix('#') {
            if rest.starts_with(|c: char| c.is_whitespace()) && !rest.trim().is_empty() {
                return rest.trim().to_string();
            }
        }
    }
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
        .replace(['-', '_'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_block() {
        let (fm, body) = parse_frontmatter("---\nstatus: open\ntags: [a]\n---\n# Hello\nbody\n");
        assert_eq!(fm.get("status"), Some(&MetaValue::Text("open".into())));
        assert_eq!(body, "# Hello\nbody\n");
    }

    #[test]
    fn test_no_block() {
        let content = "# Just a note\n";
        let (fm, body, status) = parse_frontmatter_with_status(content);
        assert!(fm.is_empty());
        assert_eq!(body, content);
        assert_eq!(status, FrontmatterStatus::Absent);
    }

    #[test]
    fn test_unclosed_block_is_body() {
        let content = "---\nstatus: open\nno closing fence\n";
        let (fm, body) = parse_frontmatter(content);
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_malformed_yaml_is_body() {
        let content = "---\nstatus: [open\n---\ntext\n";
        let (fm, body, status) = parse_frontmatter_with_status(content);
        assert!(fm.is_empty());
        assert_eq!(body, content);
        assert!(matches!(status, FrontmatterStatus::Malformed(_)));
    }

    #[test]
    fn test_scalar_block_is_malformed() {
        let (fm, _, status) = parse_frontmatter_with_status("---\njust a string\n---\nbody");
        assert!(fm.is_empty());
        assert!(matches!(status, FrontmatterStatus::Malformed(_)));
    }

    #[test]
    fn test_empty_block() {
        let (fm, body) = parse_frontmatter("---\n---\nbody");
        assert!(fm.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_horizontal_rule_not_frontmatter() {
        let content = "----\nstatus: open\n---\n";
        let (fm, body) = parse_frontmatter(content);
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn test_title_from_heading() {
        assert_eq!(extract_title("intro\n# My Title \n## Sub", "x.md"), "My Title");
    }

    #[test]
    fn test_title_ignores_subheadings() {
        assert_eq!(extract_title("## Sub\ntext", "my-daily_note.md"), "my daily note");
    }

    #[test]
    fn test_title_strips_any_extension() {
        assert_eq!(extract_title("no heading", "my-note.txt"), "my note");
        assert_eq!(extract_title("", "release.md.notes.md"), "release.md.notes");
        assert_eq!(extract_title("", "README"), "README");
    }
}
