//! # Vault Search
//!
//! Front-matter aware indexing and hybrid semantic search over a folder of
//! markdown notes (a "vault").
//!
//! Every note becomes a row in a structured `notes` table with its front
//! matter promoted to typed columns, and its body is split at headings into
//! chunks whose embeddings live in a vector table in the same SQLite file.
//! Searches combine vector nearest neighbours with structured filters; a
//! read-only SQL console serves ad-hoc questions about the metadata.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ Scanner  │──▶│ Front matter │──▶│ notes (SQLite)   │
//! │ (vault)  │   │ + Chunker    │   │ vec_chunks (L2)  │
//! └──────────┘   └──────┬───────┘   └────────┬─────────┘
//!                       │ embed              │
//!                       ▼                    ▼
//!                ┌──────────────┐   ┌──────────────────┐
//!                │  Embedding   │   │ search / dataview│
//!                │  provider    │   │  (CLI: vault)    │
//!                └──────────────┘   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vault --vault-path ~/notes index --rebuild
//! vault --vault-path ~/notes search "quarterly plan" --status open
//! vault --vault-path ~/notes query "SELECT path, due FROM notes WHERE status = 'open'"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and database path validation |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Notes, chunks, metadata values, search results |
//! | [`scanner`] | Vault walker |
//! | [`frontmatter`] | YAML front matter and titles |
//! | [`chunk`] | Heading-based chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`db`] / [`migrate`] / [`store`] | SQLite storage |
//! | [`ingest`] | Index build pipeline |
//! | [`search`] | Hybrid vector + metadata search |
//! | [`dataview`] | Read-only SQL console and schema inspection |
//! | [`stats`] | Index statistics |
//! | [`render`] | Table and JSON output |

pub mod chunk;
pub mod config;
pub mod dataview;
pub mod db;
pub mod embedding;
pub mod error;
pub mod frontmatter;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod render;
pub mod scanner;
pub mod search;
pub mod stats;
pub mod store;
