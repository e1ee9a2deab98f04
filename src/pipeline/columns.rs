//! Column heuristics: which column names the article id, which columns
//! carry URLs, and which cell values count as usable.
//!
//! Identifier lookup is an explicit ordered candidate list consulted per row
//! with plain name lookups; URL columns are classified once per table by
//! keyword containment on the lowercased column name.

use crate::config::{ColumnMatch, ExtractConfig};
use crate::table::Row;

/// Extra URL keywords accepted by [`ColumnMatch::Exploratory`].
pub const EXPLORATORY_URL_KEYWORDS: [&str; 4] = ["url", "http", "photo", "pic"];

/// Keywords (upper-case containment) that flag likely identifier columns
/// during inspection.
pub const EXPLORATORY_ID_KEYWORDS: [&str; 6] = ["ARTIKEL", "REF", "ID", "PRODUCT", "SKU", "CODE"];

/// Indices of URL-bearing columns, in column order.
pub fn url_columns(columns: &[String], config: &ExtractConfig, mode: ColumnMatch) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, name)| is_url_column(name, config, mode))
        .map(|(idx, _)| idx)
        .collect()
}

fn is_url_column(name: &str, config: &ExtractConfig, mode: ColumnMatch) -> bool {
    let lower = name.to_lowercase();
    let production = config
        .url_keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| lower.contains(k.to_lowercase().as_str()));
    match mode {
        ColumnMatch::Production => production,
        ColumnMatch::Exploratory => {
            production || EXPLORATORY_URL_KEYWORDS.iter().any(|k| lower.contains(k))
        }
    }
}

/// Column names that look like identifiers (inspection only).
pub fn likely_id_columns(columns: &[String]) -> Vec<&str> {
    columns
        .iter()
        .filter(|name| {
            let upper = name.to_uppercase();
            EXPLORATORY_ID_KEYWORDS.iter().any(|k| upper.contains(k))
        })
        .map(String::as_str)
        .collect()
}

/// Trimmed cell value, or `None` when empty or the missing sentinel.
pub fn usable_value<'a>(value: Option<&'a str>, config: &ExtractConfig) -> Option<&'a str> {
    let value = value?.trim();
    if value.is_empty() || config.is_missing(value) {
        None
    } else {
        Some(value)
    }
}

/// Article id for `row`: the first candidate column (in priority order,
/// exact name match) holding a usable value.
pub fn article_id<'a>(row: &Row<'a>, config: &ExtractConfig) -> Option<&'a str> {
    config
        .id_candidates
        .iter()
        .find_map(|candidate| usable_value(row.get(candidate), config))
}

/// The cell as a URL, if usable and carrying the configured prefix.
pub fn accept_url<'a>(value: Option<&'a str>, config: &ExtractConfig) -> Option<&'a str> {
    usable_value(value, config).filter(|v| v.starts_with(config.url_prefix.as_str()))
}
