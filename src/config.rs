//! Configuration types for catalogue extraction and batch downloading.
//!
//! The two stages run independently, so each has its own struct:
//! [`ExtractConfig`] for the Catalogue Builder and [`DownloadConfig`] for the
//! Batch Downloader. Both come with a `Default` matching the historical
//! behaviour and a validating builder.

use crate::error::Sheet2ImgError;
use crate::pipeline::fetch::ImageFetcher;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Identifier columns, in priority order. The first one present on a row
/// with a usable value becomes the article id.
pub const DEFAULT_ID_CANDIDATES: [&str; 6] =
    ["REF+", "ARTIKEL", "Ref + Color", "REF", "ID", "PRODUCT_ID"];

/// Substrings (case-insensitive) that mark a column as URL-bearing.
pub const DEFAULT_URL_KEYWORDS: [&str; 2] = ["image", "link"];

/// Placeholder a tabular reader leaves in empty cells.
pub const MISSING_SENTINEL: &str = "nan";

/// Browser-like agent; several CDNs refuse requests without one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Configuration for the Catalogue Builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Identifier column names checked in order (case-sensitive exact match).
    pub id_candidates: Vec<String>,

    /// A column is URL-bearing when its lowercased name contains one of these.
    pub url_keywords: Vec<String>,

    /// Cell value treated as absent (compared case-insensitively after trim).
    pub missing_sentinel: String,

    /// Accepted URLs must start with this prefix. Default: `http`.
    pub url_prefix: String,

    /// How catalogues from several sources are combined. Default: overwrite.
    pub merge: MergeStrategy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            id_candidates: DEFAULT_ID_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            url_keywords: DEFAULT_URL_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            missing_sentinel: MISSING_SENTINEL.to_string(),
            url_prefix: "http".to_string(),
            merge: MergeStrategy::default(),
        }
    }
}

impl ExtractConfig {
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder {
            config: Self::default(),
        }
    }

    /// `true` when `value` is the missing-cell placeholder.
    pub fn is_missing(&self, value: &str) -> bool {
        value.eq_ignore_ascii_case(&self.missing_sentinel)
    }
}

/// Builder for [`ExtractConfig`].
#[derive(Debug)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn id_candidates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.id_candidates = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn url_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.url_keywords = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        self
    }

    pub fn missing_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.config.missing_sentinel = sentinel.into();
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.url_prefix = prefix.into();
        self
    }

    pub fn merge(mut self, strategy: MergeStrategy) -> Self {
        self.config.merge = strategy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractConfig, Sheet2ImgError> {
        let c = &self.config;
        if c.id_candidates.iter().all(|n| n.trim().is_empty()) {
            return Err(Sheet2ImgError::InvalidConfig(
                "at least one identifier column name is required".into(),
            ));
        }
        if c.url_keywords.iter().all(|k| k.is_empty()) {
            return Err(Sheet2ImgError::InvalidConfig(
                "at least one URL column keyword is required".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for the Batch Downloader.
///
/// Built via [`DownloadConfig::builder()`] or [`DownloadConfig::default()`].
///
/// # Example
/// ```rust
/// use sheet2img::DownloadConfig;
///
/// let config = DownloadConfig::builder()
///     .output_dir("hasil_download/link_image_1")
///     .file_prefix("MNG")
///     .timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 95);
/// ```
#[derive(Clone)]
pub struct DownloadConfig {
    /// Directory receiving the JPEG files and the failure log.
    pub output_dir: PathBuf,

    /// Prepended to every filename: `{prefix}{id}-{n}.jpg`. Default: `MNG`.
    pub file_prefix: String,

    /// Per-request timeout in seconds. Default: 30.
    pub timeout_secs: u64,

    /// JPEG quality, 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// Emit a progress notification every N processed items. Default: 10.
    pub progress_interval: usize,

    /// Upper bound on a response body. Default: 50 MiB.
    pub max_image_bytes: u64,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// File name of the failure log inside `output_dir`.
    pub failure_log_name: String,

    /// Pre-constructed fetcher. Takes precedence over the built-in HTTP client.
    pub fetcher: Option<Arc<dyn ImageFetcher>>,

    /// Receives per-item and per-article events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("hasil_download"),
            file_prefix: "MNG".to_string(),
            timeout_secs: 30,
            jpeg_quality: 95,
            progress_interval: 10,
            max_image_bytes: 50 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            failure_log_name: "failed_downloads.json".to_string(),
            fetcher: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("output_dir", &self.output_dir)
            .field("file_prefix", &self.file_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("progress_interval", &self.progress_interval)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("user_agent", &self.user_agent)
            .field("failure_log_name", &self.failure_log_name)
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<dyn ImageFetcher>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DownloadProgressCallback>"),
            )
            .finish()
    }
}

impl DownloadConfig {
    /// Create a new builder for `DownloadConfig`.
    pub fn builder() -> DownloadConfigBuilder {
        DownloadConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the failure log.
    pub fn failure_log_path(&self) -> PathBuf {
        self.output_dir.join(&self.failure_log_name)
    }
}

/// Builder for [`DownloadConfig`].
#[derive(Debug)]
pub struct DownloadConfigBuilder {
    config: DownloadConfig,
}

impl DownloadConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn progress_interval(mut self, every: usize) -> Self {
        self.config.progress_interval = every.max(1);
        self
    }

    pub fn max_image_bytes(mut self, bytes: u64) -> Self {
        self.config.max_image_bytes = bytes;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn failure_log_name(mut self, name: impl Into<String>) -> Self {
        self.config.failure_log_name = name.into();
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DownloadConfig, Sheet2ImgError> {
        let c = &self.config;
        if c.output_dir.as_os_str().is_empty() {
            return Err(Sheet2ImgError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if c.file_prefix.contains(['/', '\\']) {
            return Err(Sheet2ImgError::InvalidConfig(format!(
                "file prefix must not contain path separators, got '{}'",
                c.file_prefix
            )));
        }
        if c.failure_log_name.is_empty() || c.failure_log_name.contains(['/', '\\']) {
            return Err(Sheet2ImgError::InvalidConfig(format!(
                "failure log name must be a plain file name, got '{}'",
                c.failure_log_name
            )));
        }
        if c.max_image_bytes == 0 {
            return Err(Sheet2ImgError::InvalidConfig(
                "max image size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How per-source catalogues are folded into the merged catalogue.
///
/// | Strategy | On a key present in both sources |
/// |----------|----------------------------------|
/// | `Overwrite` | later source's list replaces the earlier one (default) |
/// | `Append` | later source's URLs are appended |
///
/// Within a single source, rows sharing an id always append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Overwrite,
    Append,
}

/// Which keyword set classifies URL-bearing columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnMatch {
    /// `image` / `link` (or the configured keywords). Used for extraction.
    #[default]
    Production,
    /// Production keywords plus `url`, `http`, `photo`, `pic`. Inspection only.
    Exploratory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_defaults() {
        let c = DownloadConfig::default();
        assert_eq!(c.file_prefix, "MNG");
        assert_eq!(c.timeout_secs, 30);
        assert_eq!(c.jpeg_quality, 95);
        assert_eq!(c.progress_interval, 10);
        assert_eq!(
            c.failure_log_path(),
            PathBuf::from("hasil_download/failed_downloads.json")
        );
    }

    #[test]
    fn builder_clamps_quality_and_interval() {
        let c = DownloadConfig::builder()
            .jpeg_quality(0)
            .progress_interval(0)
            .timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.progress_interval, 1);
        assert_eq!(c.timeout_secs, 1);
    }

    #[test]
    fn builder_rejects_prefix_with_separator() {
        let err = DownloadConfig::builder()
            .file_prefix("../MNG")
            .build()
            .unwrap_err();
        assert!(matches!(err, Sheet2ImgError::InvalidConfig(_)));
    }

    #[test]
    fn extract_defaults_keep_priority_order() {
        let c = ExtractConfig::default();
        assert_eq!(
            c.id_candidates,
            vec!["REF+", "ARTIKEL", "Ref + Color", "REF", "ID", "PRODUCT_ID"]
        );
        assert_eq!(c.url_keywords, vec!["image", "link"]);
        assert_eq!(c.merge, MergeStrategy::Overwrite);
    }

    #[test]
    fn sentinel_is_case_insensitive() {
        let c = ExtractConfig::default();
        assert!(c.is_missing("nan"));
        assert!(c.is_missing("NaN"));
        assert!(!c.is_missing("banana"));
    }

    #[test]
    fn extract_builder_requires_an_id_column() {
        let err = ExtractConfig::builder()
            .id_candidates(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("identifier"));
    }

    #[test]
    fn merge_strategy_serialises_lowercase() {
        let s = serde_json::to_string(&MergeStrategy::Append).unwrap();
        assert_eq!(s, "\"append\"");
    }
}
