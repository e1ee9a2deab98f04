//! # sheet2img
//!
//! Turn spreadsheet-embedded product-image URLs into a keyed catalogue and
//! bulk-download them as uniform JPEG files.
//!
//! ## Two stages
//!
//! ```text
//! tables (.csv/.tsv/.xlsx)
//!  │
//!  ├─ 1. Catalogue Builder   id column by priority list, URL columns by name,
//!  │                         http-prefixed cells only → data_url_*.json
//!  │
//!  └─ 2. Batch Downloader    per URL: skip if file exists, else GET → image/*
//!                            check → decode → RGB → JPEG → <prefix><id>-<n>.jpg
//!                            failures → failed_downloads.json
//! ```
//!
//! The stages share nothing but the catalogue file, so a catalogue can be
//! reviewed (or hand-edited) before any network traffic happens, and a
//! download can be rerun as often as needed: files already on disk are
//! skipped without a request.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheet2img::{build_catalogues, download, DownloadConfig, ExtractConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let set = build_catalogues(&["LINK IMAGE 1.csv"], &ExtractConfig::default())?;
//!     let config = DownloadConfig::builder()
//!         .output_dir("hasil_download")
//!         .build()?;
//!     let report = download(&set.merged, config).await?;
//!     eprintln!("{} ok, {} failed ({})",
//!         report.succeeded(), report.failed, report.success_rate_label());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sheet2img` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalogue;
pub mod config;
pub mod download;
pub mod error;
pub mod harvest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalogue::Catalogue;
pub use config::{
    ColumnMatch, DownloadConfig, DownloadConfigBuilder, ExtractConfig, ExtractConfigBuilder,
    MergeStrategy,
};
pub use download::{
    BatchDownloader, DownloadRecord, DownloadReport, FailureLogEntry, ItemOutcome,
};
pub use error::{ItemError, Sheet2ImgError};
pub use harvest::{
    build_catalogue, build_catalogues, download, download_catalogues, download_file, inspect,
    load_catalogues, profile_table, write_catalogues,
};
pub use output::{CatalogueRun, CatalogueSet, SourceCatalogue, TableProfile};
pub use pipeline::extract::ExtractStats;
pub use pipeline::fetch::{FetchedImage, HttpFetcher, ImageFetcher};
pub use progress::{DownloadProgressCallback, NoopProgressCallback, ProgressCallback};
pub use table::{load_table, Table};
