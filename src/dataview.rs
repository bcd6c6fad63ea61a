//! Ad-hoc SQL console over the `notes` table.
//!
//! Statements run on a read-only SQLite connection, which is what actually
//! prevents writes. The keyword deny-list in [`validate_sql`] only rejects
//! obviously mutating or administrative statements early, with a clear
//! message; it is not a sandbox.
//!
//! The vector table is not part of this surface: any statement naming
//! `vec_chunks` is rejected.

use anyhow::{bail, Result};
use regex::Regex;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use std::sync::OnceLock;
use sqlx::{Column, Executor, Row, SqlitePool, TypeInfo, ValueRef};

use crate::config::Config;
use crate::db;
use crate::error::VaultError;
use crate::render;

/// Keywords rejected as whole words, case-insensitively.
pub const FORBIDDEN_SQL_KEYWORDS: &[&str] = &[
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "ALTER",
    "CREATE",
    "ATTACH",
    "DETACH",
    "PRAGMA",
    "LOAD_EXTENSION",
];

/// Tables that exist in the database but are not queryable here.
const HIDDEN_TABLES: &[&str] = &["vec_chunks"];

/// Reject statements containing a denied keyword or a hidden table name.
///
/// Matching is on word boundaries, so `updated_at` or `created` do not trip
/// `UPDATE` or `CREATE`.
pub fn validate_sql(sql: &str) -> Result<(), VaultError> {
    static KEYWORDS: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    static TABLES: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

    if let Some(m) = word_pattern(&KEYWORDS, FORBIDDEN_SQL_KEYWORDS)?.find(sql) {
        return Err(VaultError::ForbiddenKeyword(m.as_str().to_ascii_uppercase()));
    }
    if let Some(m) = word_pattern(&TABLES, HIDDEN_TABLES)?.find(sql) {
        return Err(VaultError::ForbiddenTable(m.as_str().to_ascii_lowercase()));
    }
    Ok(())
}

/// Case-insensitive whole-word alternation over `words`, compiled once.
fn word_pattern(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    words: &[&str],
) -> Result<&'static Regex, VaultError> {
    cell.get_or_init(|| {
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
    })
    .as_ref()
    .map_err(|e| VaultError::InvalidRequest(e.to_string()))
}

/// Rows of an ad-hoc query, in statement order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    /// One column→value map per row.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Validate and run one read-only statement against the index database.
///
/// Checks run in order: statement text, database location, database
/// existence. Nothing is opened until all three pass.
pub async fn execute_query(config: &Config, sql: &str) -> Result<QueryResult> {
    validate_sql(sql)?;
    let pool = db::connect_existing(config, true).await?;
    let result = run_read_only(&pool, sql).await;
    pool.close().await;
    Ok(result?)
}

async fn run_read_only(pool: &SqlitePool, sql: &str) -> Result<QueryResult, VaultError> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(VaultError::query)?;

    let columns: Vec<String> = match rows.first() {
        Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
        None => pool
            .describe(sql)
            .await
            .map_err(VaultError::query)?
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(decode_value(row, idx)?);
        }
        out.push(values);
    }

    Ok(QueryResult { columns, rows: out })
}

/// Decode a cell by its runtime SQLite storage class.
fn decode_value(row: &SqliteRow, idx: usize) -> Result<serde_json::Value, VaultError> {
    let raw = row.try_get_raw(idx).map_err(VaultError::query)?;
    if raw.is_null() {
        return Ok(serde_json::Value::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => {
            let v: i64 = row.try_get_unchecked(idx).map_err(VaultError::query)?;
            serde_json::Value::from(v)
        }
        "REAL" | "NUMERIC" => {
            let v: f64 = row.try_get_unchecked(idx).map_err(VaultError::query)?;
            serde_json::Value::from(v)
        }
        "BLOB" => {
            let v: Vec<u8> = row.try_get_unchecked(idx).map_err(VaultError::query)?;
            serde_json::Value::String(format!("<{} bytes>", v.len()))
        }
        _ => {
            let v: String = row.try_get_unchecked(idx).map_err(VaultError::query)?;
            serde_json::Value::String(v)
        }
    };
    Ok(value)
}

// ============ Schema inspection ============

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
}

/// Columns of the `notes` table plus a few sample values to query against.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaInfo {
    pub columns: Vec<ColumnInfo>,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub folders: Vec<String>,
}

/// Describe the queryable schema. Uses fixed internal statements, not the
/// ad-hoc gateway.
pub async fn describe_schema(config: &Config) -> Result<SchemaInfo> {
    let pool = db::connect_existing(config, true).await?;

    let rows = sqlx::query(r#"SELECT name, type, "notnull" FROM pragma_table_info('notes')"#)
        .fetch_all(&pool)
        .await
        .map_err(VaultError::query)?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let not_null: i64 = row.try_get("notnull").map_err(VaultError::query)?;
        columns.push(ColumnInfo {
            name: row.try_get("name").map_err(VaultError::query)?,
            declared_type: row.try_get("type").map_err(VaultError::query)?,
            nullable: not_null == 0,
        });
    }

    let statuses = distinct_values(&pool, "status", 5).await?;
    let priorities = distinct_values(&pool, "priority", 5).await?;
    let folders = distinct_values(&pool, "folder", 10).await?;

    pool.close().await;

    Ok(SchemaInfo {
        columns,
        statuses,
        priorities,
        folders,
    })
}

async fn distinct_values(
    pool: &SqlitePool,
    column: &'static str,
    limit: i64,
) -> Result<Vec<String>, VaultError> {
    let sql = format!(
        "SELECT DISTINCT {col} FROM notes WHERE {col} IS NOT NULL AND {col} != '' ORDER BY {col} LIMIT ?",
        col = column
    );
    sqlx::query_scalar(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(VaultError::query)
}

/// Run the query command. `format` is `table` or `json`.
pub async fn run_query(config: &Config, sql: &str, format: &str) -> Result<()> {
    match format {
        "table" | "json" => {}
        _ => bail!("Unknown output format: {}. Use table or json.", format),
    }

    let result = execute_query(config, sql).await?;

    if format == "json" {
        println!("{}", render::format_query_json(&result)?);
    } else {
        println!("{}", render::format_query_table(&result));
        if !result.is_empty() {
            println!("\n({} row{})", result.rows.len(), if result.rows.len() == 1 { "" } else { "s" });
        }
    }
    Ok(())
}

/// Run the schema command.
pub async fn run_schema(config: &Config, json: bool) -> Result<()> {
    let schema = describe_schema(config).await?;
    if json {
        println!("{}", render::to_json(&schema)?);
        return Ok(());
    }

    println!("Table: notes");
    for col in &schema.columns {
        println!(
            "  {:<18} {:<8} {}",
            col.name,
            col.declared_type,
            if col.nullable { "NULL" } else { "NOT NULL" }
        );
    }
    println!();
    println!("Sample statuses:   {}", schema.statuses.join(", "));
    println!("Sample priorities: {}", schema.priorities.join(", "));
    println!("Sample folders:    {}", schema.folders.join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use crate::models::{MetaValue, Note};
    use crate::store;
    use tempfile::TempDir;

    fn note(path: &str, folder: &str, status: &str) -> Note {
        let mut frontmatter = crate::models::Frontmatter::new();
        frontmatter.insert("status".into(), MetaValue::Text(status.into()));
        Note {
            path: path.into(),
            folder: folder.into(),
            filename: path.rsplit('/').next().unwrap_or(path).into(),
            title: path.into(),
            modified: 0.0,
            body: String::new(),
            frontmatter,
        }
    }

    async fn seeded() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let config = Config::for_vault(tmp.path());
        let pool = db::connect(&config).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        store::upsert_note(&mut *conn, &note("Notes/a.md", "Notes", "open"))
            .await
            .unwrap();
        store::upsert_note(&mut *conn, &note("Notes/b.md", "Notes", "closed"))
            .await
            .unwrap();
        drop(conn);
        pool.close().await;
        (tmp, config)
    }

    #[test]
    fn test_validate_rejects_whole_word_keywords() {
        for sql in [
            "DROP TABLE notes",
            "drop table notes",
            "SELECT 1; DELETE FROM notes",
            "PRAGMA table_info(notes)",
            "select load_extension('x')",
        ] {
            assert!(
                matches!(validate_sql(sql), Err(VaultError::ForbiddenKeyword(_))),
                "should reject: {}",
                sql
            );
        }
    }

    #[test]
    fn test_validate_accepts_substrings() {
        for sql in [
            "SELECT updated_at FROM notes",
            "SELECT created, dropped_items FROM notes",
            "SELECT path FROM notes WHERE status = 'open'",
        ] {
            assert!(validate_sql(sql).is_ok(), "should accept: {}", sql);
        }
    }

    #[test]
    fn test_validate_reports_keyword_uppercased_on_every_call() {
        for _ in 0..3 {
            assert!(matches!(
                validate_sql("select load_extension('x')"),
                Err(VaultError::ForbiddenKeyword(k)) if k == "LOAD_EXTENSION"
            ));
            assert!(matches!(
                validate_sql("Drop table notes"),
                Err(VaultError::ForbiddenKeyword(k)) if k == "DROP"
            ));
            assert!(validate_sql("SELECT path FROM notes").is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_vector_table() {
        assert!(matches!(
            validate_sql("SELECT chunk_text FROM vec_chunks"),
            Err(VaultError::ForbiddenTable(_))
        ));
        assert!(validate_sql("SELECT vec_chunks_count FROM notes").is_ok());
    }

    #[test]
    fn test_to_records() {
        let result = QueryResult {
            columns: vec!["path".into(), "n".into()],
            rows: vec![vec![serde_json::json!("a.md"), serde_json::json!(1)]],
        };
        let records = result.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["path"], "a.md");
        assert_eq!(records[0]["n"], 1);
    }

    #[tokio::test]
    async fn test_execute_select() {
        let (_tmp, config) = seeded().await;
        let result = execute_query(&config, "SELECT path FROM notes WHERE status='open'")
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["path"]);
        assert_eq!(result.rows, vec![vec![serde_json::json!("Notes/a.md")]]);
    }

    #[tokio::test]
    async fn test_execute_decodes_types() {
        let (_tmp, config) = seeded().await;
        let result = execute_query(
            &config,
            "SELECT COUNT(*) AS n, 1.5 AS x, NULL AS empty, 'txt' AS s FROM notes",
        )
        .await
        .unwrap();
        assert_eq!(result.columns, vec!["n", "x", "empty", "s"]);
        assert_eq!(
            result.rows[0],
            vec![
                serde_json::json!(2),
                serde_json::json!(1.5),
                serde_json::Value::Null,
                serde_json::json!("txt"),
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_empty_result_keeps_columns() {
        let (_tmp, config) = seeded().await;
        let result = execute_query(&config, "SELECT path, title FROM notes WHERE 0")
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["path", "title"]);
    }

    #[tokio::test]
    async fn test_forbidden_keyword_checked_before_db() {
        let tmp = TempDir::new().unwrap();
        let config = Config::for_vault(tmp.path());
        let err = execute_query(&config, "DROP TABLE notes").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::ForbiddenKeyword(_))
        ));
        assert!(!config.db_path().exists());
    }

    #[tokio::test]
    async fn test_read_only_connection_refuses_writes() {
        let (_tmp, config) = seeded().await;
        // `REPLACE` is not on the deny-list; the connection still refuses it.
        let err = execute_query(
            &config,
            "REPLACE INTO notes (path) VALUES ('x.md')",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::Query { .. })
        ));
    }

    #[tokio::test]
    async fn test_syntax_error_is_query_error() {
        let (_tmp, config) = seeded().await;
        let err = execute_query(&config, "SELEC path FROM notes").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::Query { .. })
        ));
    }

    #[tokio::test]
    async fn test_describe_schema() {
        let (_tmp, config) = seeded().await;
        let schema = describe_schema(&config).await.unwrap();
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names[0], "path");
        assert!(names.contains(&"frontmatter_json"));
        assert_eq!(schema.statuses, vec!["closed", "open"]);
        assert_eq!(schema.folders, vec!["Notes"]);
        assert!(schema.priorities.is_empty());
    }
}
