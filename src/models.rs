//! Core data models used throughout vault-search.
//!
//! These types represent the notes, chunks, and search results that flow
//! through the indexing and retrieval pipeline.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// A single front-matter value.
///
/// YAML scalars keep their kind; strings that look like dates or
/// timestamps are normalized to ISO 8601 and tagged as [`MetaValue::Date`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

/// Front-matter mapping of a note. Empty when absent or malformed.
pub type Frontmatter = BTreeMap<String, MetaValue>;

impl MetaValue {
    /// Classify a string, promoting date-like text to [`MetaValue::Date`].
    pub fn from_text(s: &str) -> Self {
        match normalize_date(s) {
            Some(iso) => MetaValue::Date(iso),
            None => MetaValue::Text(s.to_string()),
        }
    }

    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MetaValue::Int(i)
                } else {
                    MetaValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => MetaValue::from_text(s),
            Value::Sequence(items) => MetaValue::List(items.iter().map(Self::from_yaml).collect()),
            Value::Mapping(map) => MetaValue::Map(
                map.iter()
                    .map(|(k, v)| (yaml_key(k), Self::from_yaml(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            MetaValue::Null => Value::Null,
            MetaValue::Bool(b) => Value::Bool(*b),
            MetaValue::Int(i) => Value::from(*i),
            MetaValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            MetaValue::Text(s) | MetaValue::Date(s) => Value::String(s.clone()),
            MetaValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            MetaValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Column form of a promoted scalar field.
    ///
    /// Scalars pass through as text, dates become their ISO string, and
    /// lists or maps are stored as JSON so the value stays parseable.
    pub fn to_column(&self) -> Option<String> {
        match self {
            MetaValue::Null => None,
            MetaValue::Bool(b) => Some(b.to_string()),
            MetaValue::Int(i) => Some(i.to_string()),
            MetaValue::Float(f) => Some(f.to_string()),
            MetaValue::Text(s) | MetaValue::Date(s) => Some(s.clone()),
            MetaValue::List(_) | MetaValue::Map(_) => Some(self.to_json().to_string()),
        }
    }

    /// Python-style truthiness: null, false, zero, and empty values are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            MetaValue::Null => false,
            MetaValue::Bool(b) => *b,
            MetaValue::Int(i) => *i != 0,
            MetaValue::Float(f) => *f != 0.0,
            MetaValue::Text(s) | MetaValue::Date(s) => !s.is_empty(),
            MetaValue::List(items) => !items.is_empty(),
            MetaValue::Map(map) => !map.is_empty(),
        }
    }
}

fn yaml_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Normalize `YYYY-MM-DD` and timestamp strings to ISO 8601, or `None`.
fn normalize_date(s: &str) -> Option<String> {
    let s = s.trim();
    if s.len() < 10 || !s.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_rfc3339());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    None
}

/// Serialize a whole front-matter mapping to JSON for `frontmatter_json`.
pub fn frontmatter_to_json(frontmatter: &Frontmatter) -> String {
    let object: serde_json::Map<String, serde_json::Value> = frontmatter
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    serde_json::Value::Object(object).to_string()
}

/// A parsed markdown note, ready for the `notes` table and the chunker.
#[derive(Debug, Clone)]
pub struct Note {
    /// Path relative to the vault root, `/`-separated. Primary key.
    pub path: String,
    /// Relative parent directory; empty for notes at the vault root.
    pub folder: String,
    pub filename: String,
    pub title: String,
    /// Modification time in seconds since the epoch.
    pub modified: f64,
    /// Body text with the front-matter block removed.
    pub body: String,
    pub frontmatter: Frontmatter,
}

/// Front-matter keys projected into typed `notes` columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotedFields {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub scheduled: Option<String>,
    pub tags: Option<String>,
    pub projects: Option<String>,
    pub contexts: Option<String>,
    pub ticker: Option<String>,
    pub strategy: Option<String>,
    pub expiry: Option<String>,
}

impl PromotedFields {
    pub fn from_frontmatter(fm: &Frontmatter) -> Self {
        let scalar = |key: &str| fm.get(key).and_then(MetaValue::to_column);
        // List fields are JSON-encoded, and absent when empty.
        let list = |key: &str| {
            fm.get(key)
                .filter(|v| v.is_truthy())
                .map(|v| v.to_json().to_string())
        };

        Self {
            status: scalar("status"),
            priority: scalar("priority"),
            due: scalar("due"),
            scheduled: scalar("scheduled"),
            tags: list("tags"),
            projects: list("projects"),
            contexts: list("contexts"),
            ticker: scalar("ticker"),
            strategy: scalar("strategy"),
            expiry: scalar("expiry"),
        }
    }
}

/// A heading-scoped slice of a note body; the unit of embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// `"{path}#{seq}"`.
    pub chunk_id: String,
    pub path: String,
    pub heading: String,
    pub text: String,
}

/// One hybrid search hit, joined with its note's metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub path: String,
    pub heading: String,
    pub snippet: String,
    pub distance: f64,
    pub title: Option<String>,
    pub folder: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub tags: Vec<serde_json::Value>,
}
