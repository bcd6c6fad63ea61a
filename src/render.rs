//! Text and JSON renderings of query and search results.
//!
//! Both renderings are built from the same ordered records, so a table row
//! and its JSON object always carry the same values.

use anyhow::Result;
use serde::Serialize;

use crate::chunk::truncate_chars;
use crate::dataview::QueryResult;
use crate::models::SearchResult;

/// Widest a table column may grow before values are cut.
pub const DEFAULT_MAX_WIDTH: usize = 50;

pub const NO_RESULTS: &str = "No results found.";

/// Cell text for a JSON value. `null` renders as an empty cell.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render rows as an aligned text table.
///
/// Each column is as wide as its header or longest value, capped at
/// `max_width`; longer values are cut to fit.
pub fn format_table(columns: &[String], rows: &[Vec<serde_json::Value>], max_width: usize) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let longest = cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0);
            longest.max(header.chars().count()).min(max_width)
        })
        .collect();

    let fit = |text: &str, width: usize| -> String {
        let padded = format!("{:<width$}", text, width = width);
        truncate_chars(&padded, width).to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(
        columns
            .iter()
            .zip(&widths)
            .map(|(h, w)| fit(h, *w))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(
            widths
                .iter()
                .enumerate()
                .map(|(i, w)| fit(row.get(i).map(String::as_str).unwrap_or(""), *w))
                .collect::<Vec<_>>()
                .join(" | "),
        );
    }

    lines.join("\n")
}

pub fn format_query_table(result: &QueryResult) -> String {
    format_table(&result.columns, &result.rows, DEFAULT_MAX_WIDTH)
}

/// Pretty JSON array of column→value objects.
pub fn format_query_json(result: &QueryResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&result.to_records())?)
}

/// Numbered listing of search hits.
pub fn format_search_results(results: &[SearchResult], query: &str) -> String {
    if results.is_empty() {
        return format!("No results for \"{}\".", query);
    }

    let mut out = format!("Results for \"{}\":\n", query);
    for (i, r) in results.iter().enumerate() {
        let title = r.title.as_deref().unwrap_or(&r.path);
        out.push_str(&format!("\n{}. {}\n", i + 1, title));
        out.push_str(&format!("   path:     {}\n", r.path));
        out.push_str(&format!("   section:  {}\n", r.heading));
        if let Some(status) = &r.status {
            out.push_str(&format!("   status:   {}\n", status));
        }
        if let Some(due) = &r.due {
            out.push_str(&format!("   due:      {}\n", due));
        }
        out.push_str(&format!("   distance: {:.4}\n", r.distance));
        out.push_str(&format!("   > {}\n", r.snippet.replace('\n', " ")));
    }
    out
}

/// Pretty JSON of any serializable records.
pub fn to_json<T: Serialize + ?Sized>(records: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}
