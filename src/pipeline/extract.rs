//! Row scan: turn one [`Table`] into a [`Catalogue`].
//!
//! Rows sharing an article id append to the same entry, so the URL order is
//! column order within a row, then row order. Articles that end up with no
//! URL are pruned before the catalogue is returned.

use crate::catalogue::Catalogue;
use crate::config::{ColumnMatch, ExtractConfig};
use crate::pipeline::columns::{accept_url, article_id, url_columns, usable_value};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Counters collected while scanning one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractStats {
    pub rows: usize,
    /// Rows without a usable identifier.
    pub rows_skipped: usize,
    pub url_columns: usize,
    pub urls_accepted: usize,
    /// Non-empty cells in URL columns that did not start with the prefix.
    pub urls_rejected: usize,
    /// Articles dropped because none of their cells held a URL.
    pub empty_articles: usize,
    pub articles: usize,
}

/// Build the catalogue of a single table.
pub fn extract(table: &Table, config: &ExtractConfig) -> (Catalogue, ExtractStats) {
    let columns = url_columns(table.columns(), config, ColumnMatch::Production);
    let mut stats = ExtractStats {
        url_columns: columns.len(),
        ..ExtractStats::default()
    };
    if columns.is_empty() {
        debug!("Table '{}' has no URL columns", table.name);
    }

    let mut catalogue = Catalogue::new();
    let mut seen_ids = std::collections::BTreeSet::new();

    for row in table.rows() {
        stats.rows += 1;
        let Some(id) = article_id(&row, config) else {
            stats.rows_skipped += 1;
            continue;
        };
        seen_ids.insert(id);

        for &idx in &columns {
            let cell = row.get_index(idx);
            match accept_url(cell, config) {
                Some(url) => {
                    catalogue.push(id, url);
                    stats.urls_accepted += 1;
                }
                None if usable_value(cell, config).is_some() => stats.urls_rejected += 1,
                None => {}
            }
        }
    }

    stats.empty_articles = seen_ids.len() - catalogue.len();
    catalogue.prune_empty();
    stats.articles = catalogue.len();

    info!(
        "Extracted '{}': {} rows ({} skipped), {} articles, {} URLs ({} rejected)",
        table.name,
        stats.rows,
        stats.rows_skipped,
        stats.articles,
        stats.urls_accepted,
        stats.urls_rejected
    );
    (catalogue, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artikel_image_scenario() {
        let mut t = Table::new("t", ["ARTIKEL", "IMAGE_1", "IMAGE_2", "NOTE"]);
        t.push_row([
            ("ARTIKEL", "A1"),
            ("IMAGE_1", "http://x/1.jpg"),
            ("IMAGE_2", "n/a"),
            ("NOTE", "foo"),
        ]);
        let (c, stats) = extract(&t, &ExtractConfig::default());
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            serde_json::json!({"A1": ["http://x/1.jpg"]})
        );
        assert_eq!(stats.urls_accepted, 1);
        assert_eq!(stats.urls_rejected, 1);
    }

    #[test]
    fn rows_sharing_an_id_append() {
        let mut t = Table::new("t", ["ARTIKEL", "LINK"]);
        t.push_row([("ARTIKEL", "X"), ("LINK", "http://u1")]);
        t.push_row([("ARTIKEL", "X"), ("LINK", "http://u2")]);
        let (c, _) = extract(&t, &ExtractConfig::default());
        assert_eq!(c.get("X").unwrap(), ["http://u1", "http://u2"]);
    }

    #[test]
    fn column_order_then_row_order() {
        let mut t = Table::new("t", ["REF", "IMAGE_B", "IMAGE_A"]);
        t.push_row([("REF", "R"), ("IMAGE_B", "http://b1"), ("IMAGE_A", "http://a1")]);
        t.push_row([("REF", "R"), ("IMAGE_B", "http://b2"), ("IMAGE_A", "http://b1")]);
        let (c, _) = extract(&t, &ExtractConfig::default());
        assert_eq!(
            c.get("R").unwrap(),
            ["http://b1", "http://a1", "http://b2", "http://b1"]
        );
    }

    #[test]
    fn rows_without_identifier_contribute_nothing() {
        let mut t = Table::new("t", ["ARTIKEL", "IMAGE"]);
        t.push_row([("IMAGE", "http://orphan")]);
        t.push_row([("ARTIKEL", "nan"), ("IMAGE", "http://orphan2")]);
        t.push_row([("ARTIKEL", "   "), ("IMAGE", "http://orphan3")]);
        let (c, stats) = extract(&t, &ExtractConfig::default());
        assert!(c.is_empty());
        assert_eq!(stats.rows_skipped, 3);
    }

    #[test]
    fn ids_without_urls_are_dropped() {
        let mut t = Table::new("t", ["ID", "IMAGE_1"]);
        t.push_row([("ID", "keep"), ("IMAGE_1", "https://x/1.png")]);
        t.push_row([("ID", "drop"), ("IMAGE_1", "www.x.com/2.png")]);
        t.push_row([("ID", "drop2")]);
        let (c, stats) = extract(&t, &ExtractConfig::default());
        assert_eq!(c.len(), 1);
        assert!(c.get("drop").is_none());
        assert_eq!(stats.empty_articles, 2);
    }

    #[test]
    fn no_url_columns_means_empty_catalogue() {
        let mut t = Table::new("t", ["ARTIKEL", "URL"]);
        t.push_row([("ARTIKEL", "A"), ("URL", "http://x")]);
        let (c, stats) = extract(&t, &ExtractConfig::default());
        assert!(c.is_empty());
        assert_eq!(stats.url_columns, 0);
    }
}
