//! Progress-callback trait for batch download events.
//!
//! Inject an [`Arc<dyn DownloadProgressCallback>`] via
//! [`crate::config::DownloadConfigBuilder::progress_callback`] to receive
//! events as the downloader walks the catalogue. The library itself only
//! logs through `tracing`; rendering (progress bars, per-file lines) is up
//! to the host application.
//!
//! # Example
//!
//! ```rust
//! use sheet2img::{DownloadConfig, DownloadProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Ticker {
//!     ticks: AtomicUsize,
//! }
//!
//! impl DownloadProgressCallback for Ticker {
//!     fn on_progress(&self, processed: usize, total: usize) {
//!         self.ticks.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{processed}/{total}");
//!     }
//! }
//!
//! let config = DownloadConfig::builder()
//!     .progress_callback(Arc::new(Ticker { ticks: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::download::{DownloadRecord, DownloadReport, ItemOutcome};
use std::sync::Arc;

/// Called by the downloader as it processes each URL.
///
/// Events arrive strictly in order from a single task. All methods have
/// default no-op implementations so callers only override what they need.
pub trait DownloadProgressCallback: Send + Sync {
    /// Called once before the first URL.
    fn on_batch_start(&self, total_items: usize, articles: usize) {
        let _ = (total_items, articles);
    }

    /// Called before the first URL of an article.
    fn on_article_start(&self, article_id: &str, urls: usize) {
        let _ = (article_id, urls);
    }

    /// Called when a URL reaches a terminal state.
    ///
    /// # Arguments
    /// * `record`    — article id, URL, sequence number
    /// * `outcome`   — skipped, saved or failed
    /// * `processed` — items finished so far, including this one
    /// * `total`     — items in the batch
    fn on_item_complete(
        &self,
        record: &DownloadRecord,
        outcome: &ItemOutcome,
        processed: usize,
        total: usize,
    ) {
        let _ = (record, outcome, processed, total);
    }

    /// Called every `progress_interval` processed items.
    fn on_progress(&self, processed: usize, total: usize) {
        let _ = (processed, total);
    }

    /// Called after the last URL of an article.
    fn on_article_complete(&self, article_id: &str, succeeded: usize, urls: usize) {
        let _ = (article_id, succeeded, urls);
    }

    /// Called once with the final report (after the failure log is written).
    fn on_batch_complete(&self, report: &DownloadReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DownloadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DownloadConfig`].
pub type ProgressCallback = Arc<dyn DownloadProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let record = DownloadRecord::new("A1", "http://x/1.jpg", 1);
        cb.on_batch_start(1, 1);
        cb.on_article_start("A1", 1);
        cb.on_item_complete(
            &record,
            &ItemOutcome::Saved {
                path: PathBuf::from("MNGA1-1.jpg"),
            },
            1,
            1,
        );
        cb.on_progress(1, 1);
        cb.on_article_complete("A1", 1, 1);
        cb.on_batch_complete(&DownloadReport::default());
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10, 3);
        cb.on_progress(10, 10);
    }
}
