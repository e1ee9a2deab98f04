//! Batch downloader: materialise every catalogue URL as a local JPEG.
//!
//! Each URL goes through a tiny state machine:
//!
//! ```text
//! PENDING ──(target exists)──────────────────▶ SKIPPED
//!    │
//!    └──▶ FETCHING ──(fetch+decode+write ok)──▶ SAVED
//!                  └─(any error)─────────────▶ FAILED
//! ```
//!
//! Processing is strictly sequential: one URL is fetched, re-encoded and
//! written before the next one starts. Failures are recorded and the batch
//! moves on; nothing is retried within a run. Because existing files are
//! skipped, rerunning the same catalogue against the same directory is the
//! retry mechanism.
//!
//! A [`BatchDownloader`] owns all run state (counters, failure list) and is
//! consumed by [`BatchDownloader::run`], so one instance serves one run.

use crate::catalogue::{tmp_sibling, write_atomic, Catalogue};
use crate::config::DownloadConfig;
use crate::error::{ItemError, Sheet2ImgError};
use crate::pipeline::encode;
use crate::pipeline::fetch::{ensure_image_content_type, HttpFetcher, ImageFetcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One URL scheduled for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub article_id: String,
    pub url: String,
    /// 1-based position of `url` within the article's list.
    pub sequence: usize,
}

impl DownloadRecord {
    pub fn new(article_id: impl Into<String>, url: impl Into<String>, sequence: usize) -> Self {
        Self {
            article_id: article_id.into(),
            url: url.into(),
            sequence,
        }
    }

    /// `{prefix}{article_id}-{sequence}.jpg`, with the id made filesystem-safe.
    pub fn file_name(&self, prefix: &str) -> String {
        format!(
            "{}{}-{}.jpg",
            prefix,
            sanitize_article_id(&self.article_id),
            self.sequence
        )
    }
}

/// Percent-encode `%`, path separators and control characters.
///
/// Everything else (spaces, `+`, dots) is kept so names stay recognisable
/// and stable across runs. Encoding `%` itself keeps the mapping
/// one-to-one: `A/B` and `A%2FB` never share a file.
pub fn sanitize_article_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if c == '%' || c == '/' || c == '\\' || c.is_control() {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Terminal state of one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome {
    /// The target file already existed; no request was made.
    Skipped { path: PathBuf },
    /// Fetched, re-encoded and written.
    Saved { path: PathBuf },
    Failed { error: ItemError },
}

impl ItemOutcome {
    /// Skipped and saved both count as success.
    pub fn is_success(&self) -> bool {
        !matches!(self, ItemOutcome::Failed { .. })
    }
}

/// One line of `failed_downloads.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureLogEntry {
    #[serde(rename = "artikel_id", alias = "article_id")]
    pub article_id: String,
    pub url: String,
    pub error: String,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadReport {
    pub output_dir: PathBuf,
    /// URLs in the catalogue.
    pub total: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub failures: Vec<FailureLogEntry>,
    /// Where the failure log was written, when there were failures.
    pub failure_log: Option<PathBuf>,
}

impl DownloadReport {
    /// Saved plus skipped.
    pub fn succeeded(&self) -> usize {
        self.saved + self.skipped
    }

    /// Succeeded plus failed.
    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed
    }

    /// Percentage of attempted items that succeeded; `0.0` for an empty run.
    pub fn success_rate(&self) -> f64 {
        match self.attempted() {
            0 => 0.0,
            n => self.succeeded() as f64 / n as f64 * 100.0,
        }
    }

    /// [`Self::success_rate`] with one decimal, e.g. `80.0%`.
    pub fn success_rate_label(&self) -> String {
        format!("{:.1}%", self.success_rate())
    }
}

/// Sequential downloader for one catalogue into one directory.
pub struct BatchDownloader {
    config: DownloadConfig,
    fetcher: Arc<dyn ImageFetcher>,
    total: usize,
    processed: usize,
    saved: usize,
    skipped: usize,
    failed: usize,
    failures: Vec<FailureLogEntry>,
}

impl BatchDownloader {
    /// Create a downloader. Uses `config.fetcher` when set, otherwise builds
    /// the shared HTTP client.
    pub fn new(config: DownloadConfig) -> Result<Self, Sheet2ImgError> {
        let fetcher: Arc<dyn ImageFetcher> = match config.fetcher {
            Some(ref f) => Arc::clone(f),
            None => Arc::new(HttpFetcher::new(&config)?),
        };
        Ok(Self {
            config,
            fetcher,
            total: 0,
            processed: 0,
            saved: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
        })
    }

    /// Target path for `record` inside the output directory.
    pub fn target_path(&self, record: &DownloadRecord) -> PathBuf {
        self.config
            .output_dir
            .join(record.file_name(&self.config.file_prefix))
    }

    /// Download every URL of `catalogue`.
    ///
    /// # Errors
    /// Only fatal conditions: the output directory cannot be created or the
    /// failure log cannot be written. Per-URL failures end up in
    /// [`DownloadReport::failures`].
    pub async fn run(mut self, catalogue: &Catalogue) -> Result<DownloadReport, Sheet2ImgError> {
        let start = Instant::now();
        let output_dir = self.config.output_dir.clone();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| Sheet2ImgError::OutputWriteFailed {
                path: output_dir.clone(),
                source: e,
            })?;

        self.total = catalogue.total_urls();
        info!(
            "Starting download of {} images from {} articles into {}",
            self.total,
            catalogue.len(),
            output_dir.display()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(self.total, catalogue.len());
        }

        for (article_id, urls) in catalogue.iter() {
            self.download_article(article_id, urls).await;
        }

        let failure_log = if self.failures.is_empty() {
            None
        } else {
            Some(self.write_failure_log()?)
        };

        let report = DownloadReport {
            output_dir,
            total: self.total,
            saved: self.saved,
            skipped: self.skipped,
            failed: self.failed,
            duration_ms: start.elapsed().as_millis() as u64,
            failures: std::mem::take(&mut self.failures),
            failure_log,
        };

        info!(
            "Download complete: {} saved, {} skipped, {} failed ({}) in {}ms",
            report.saved,
            report.skipped,
            report.failed,
            report.success_rate_label(),
            report.duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(&report);
        }
        Ok(report)
    }

    async fn download_article(&mut self, article_id: &str, urls: &[String]) {
        debug!("Article {}: {} images", article_id, urls.len());
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_article_start(article_id, urls.len());
        }

        let mut succeeded = 0;
        for (idx, url) in urls.iter().enumerate() {
            let record = DownloadRecord::new(article_id, url.as_str(), idx + 1);
            let outcome = self.process(&record).await;
            if outcome.is_success() {
                succeeded += 1;
            }
            self.record_outcome(&record, &outcome);
        }

        debug!("Article {}: {}/{} ok", article_id, succeeded, urls.len());
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_article_complete(article_id, succeeded, urls.len());
        }
    }

    /// Drive one record to its terminal state.
    async fn process(&self, record: &DownloadRecord) -> ItemOutcome {
        let path = self.target_path(record);
        if path.exists() {
            debug!("Skip (exists): {}", path.display());
            return ItemOutcome::Skipped { path };
        }
        match self.fetch_and_save(record, &path).await {
            Ok(()) => ItemOutcome::Saved { path },
            Err(error) => ItemOutcome::Failed { error },
        }
    }

    async fn fetch_and_save(&self, record: &DownloadRecord, path: &Path) -> Result<(), ItemError> {
        let fetched = self.fetcher.fetch(&record.url).await?;
        ensure_image_content_type(fetched.content_type.as_deref())?;

        let quality = self.config.jpeg_quality;
        let jpeg = tokio::task::spawn_blocking(move || encode::reencode_jpeg(&fetched.bytes, quality))
            .await
            .map_err(|e| ItemError::Encode {
                detail: format!("encoder task failed: {e}"),
            })??;

        // Rename last so an interrupted write never leaves a file a rerun would skip.
        let write_err = |e: std::io::Error| ItemError::Write {
            path: path.to_path_buf(),
            detail: e.to_string(),
        };
        let tmp_path = tmp_sibling(path);
        let written = match tokio::fs::write(&tmp_path, &jpeg).await {
            Ok(()) => tokio::fs::rename(&tmp_path, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }
        debug!("Saved {} ({} bytes)", path.display(), jpeg.len());
        Ok(())
    }

    fn record_outcome(&mut self, record: &DownloadRecord, outcome: &ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Saved { .. } => self.saved += 1,
            ItemOutcome::Failed { error } => {
                warn!("Failed {} ({}): {}", record.url, record.article_id, error);
                self.failed += 1;
                self.failures.push(FailureLogEntry {
                    article_id: record.article_id.clone(),
                    url: record.url.clone(),
                    error: error.to_string(),
                });
            }
        }

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_complete(record, outcome, self.processed, self.total);
        }
        if self.processed % self.config.progress_interval.max(1) == 0 {
            info!(
                "Progress: {}/{} ({:.1}%)",
                self.processed,
                self.total,
                self.processed as f64 / self.total.max(1) as f64 * 100.0
            );
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_progress(self.processed, self.total);
            }
        }
    }

    fn write_failure_log(&self) -> Result<PathBuf, Sheet2ImgError> {
        let path = self.config.failure_log_path();
        let json = serde_json::to_string_pretty(&self.failures)
            .map_err(|e| Sheet2ImgError::Internal(format!("serialise failure log: {e}")))?;
        write_atomic(&path, json.as_bytes())?;
        info!(
            "Failure log written: {} ({} entries)",
            path.display(),
            self.failures.len()
        );
        Ok(path)
    }
}
