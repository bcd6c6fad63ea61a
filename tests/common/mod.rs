//! Helpers shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::Path;

use vault_search::embedding::EmbeddingProvider;

/// Deterministic bag-of-words embedder: each lowercase word is hashed into
/// one of `dims` buckets and the counts are L2-normalized. Texts sharing
/// words land close together.
pub struct TestEmbedder {
    pub name: &'static str,
    pub dims: usize,
}

impl TestEmbedder {
    pub fn new() -> Self {
        Self {
            name: "test-bag-of-words",
            dims: 64,
        }
    }

    pub fn with_dims(dims: usize) -> Self {
        Self {
            name: "test-bag-of-words",
            dims,
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) % self.dims as u64;
            v[bucket as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            v[0] = 1.0;
        } else {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for TestEmbedder {
    fn model_name(&self) -> &str {
        self.name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

pub fn write_note(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A note with front matter and one `## {heading}` section of `body`.
pub fn note_with_section(fields: &[(&str, &str)], heading: &str, body: &str) -> String {
    let mut out = String::from("---\n");
    for (k, v) in fields {
        out.push_str(&format!("{}: {}\n", k, v));
    }
    out.push_str("---\n");
    out.push_str(&format!("## {}\n{}\n", heading, body));
    out
}

/// Roughly 150 characters about planning.
pub fn planning_text() -> String {
    "The quarterly roadmap planning session covers hiring, budget review and launch \
     milestones for the platform team, with owners assigned per milestone."
        .to_string()
}
