//! Result types returned by the builder, inspection and multi-catalogue
//! download entry points.

use crate::catalogue::Catalogue;
use crate::download::DownloadReport;
use crate::error::Sheet2ImgError;
use crate::pipeline::extract::ExtractStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Catalogue built from one input table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCatalogue {
    /// Table name (file stem).
    pub name: String,
    /// Path the table was read from.
    pub source: PathBuf,
    pub catalogue: Catalogue,
    pub stats: ExtractStats,
}

/// Per-source catalogues plus their merge, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogueSet {
    pub sources: Vec<SourceCatalogue>,
    pub merged: Catalogue,
}

impl CatalogueSet {
    /// Articles in the merged catalogue.
    pub fn total_articles(&self) -> usize {
        self.merged.len()
    }

    /// URLs in the merged catalogue.
    pub fn total_urls(&self) -> usize {
        self.merged.total_urls()
    }
}

/// One catalogue's share of a multi-catalogue download.
#[derive(Debug)]
pub struct CatalogueRun {
    /// Catalogue file the URLs came from.
    pub source: PathBuf,
    /// Sub-folder label derived from the file name.
    pub label: String,
    pub output_dir: PathBuf,
    /// `Err` when the catalogue's run hit a fatal error; the other
    /// catalogues are unaffected.
    pub result: Result<DownloadReport, Sheet2ImgError>,
}

impl CatalogueRun {
    /// Finished with every URL saved or skipped.
    pub fn is_clean(&self) -> bool {
        matches!(&self.result, Ok(report) if report.failed == 0)
    }
}

/// Column overview of a table, using the broad (exploratory) keyword sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProfile {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Columns whose name suggests an identifier.
    pub id_columns: Vec<String>,
    /// Columns whose name suggests URLs (exploratory match).
    pub url_columns: Vec<String>,
    /// Columns the extractor would actually read URLs from.
    pub extraction_url_columns: Vec<String>,
    /// First values of the first identifier-like column.
    pub sample_ids: Vec<String>,
    /// First non-empty values of the first URL-like column.
    pub sample_urls: Vec<String>,
}
