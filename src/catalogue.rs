//! The URL catalogue: `ArticleId → ordered list of image URLs`.
//!
//! A catalogue is the only thing the two stages share. The builder writes
//! it once per source (plus a merged copy) and the downloader reads it back.
//! On disk it is a pretty-printed JSON object:
//!
//! ```json
//! {
//!   "1703127252": [
//!     "https://shop.example.com/fotos/17031272_52.jpg",
//!     "https://shop.example.com/fotos/17031272_52_R.jpg"
//!   ]
//! }
//! ```

use crate::config::{ExtractConfig, MergeStrategy};
use crate::error::Sheet2ImgError;
use crate::pipeline::columns::usable_value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the catalogue combining every source.
pub const MERGED_CATALOGUE_FILE: &str = "data_url_full.json";

/// Mapping from article id to its image URLs, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalogue {
    entries: BTreeMap<String, Vec<String>>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `url` to the entry for `id`, creating it if needed.
    pub fn push(&mut self, id: impl Into<String>, url: impl Into<String>) {
        self.entries.entry(id.into()).or_default().push(url.into());
    }

    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    /// Number of articles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of URLs across all articles.
    pub fn total_urls(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Drop articles with no URLs. Returns how many were removed.
    pub fn prune_empty(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, urls| !urls.is_empty());
        before - self.entries.len()
    }

    /// Fold `other` into `self`. With [`MergeStrategy::Overwrite`] a key
    /// present in both ends up with `other`'s list; with
    /// [`MergeStrategy::Append`] the lists are concatenated.
    pub fn merge(&mut self, other: Catalogue, strategy: MergeStrategy) {
        for (id, urls) in other.entries {
            match strategy {
                MergeStrategy::Overwrite => {
                    self.entries.insert(id, urls);
                }
                MergeStrategy::Append => {
                    self.entries.entry(id).or_default().extend(urls);
                }
            }
        }
    }

    /// Load a catalogue from `.json` (`id → [url]`) or `.csv` (`id,url` pairs).
    pub fn load(path: &Path) -> Result<Self, Sheet2ImgError> {
        if !path.exists() {
            return Err(Sheet2ImgError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let catalogue = match extension.as_str() {
            "json" => Self::load_json(path)?,
            "csv" => Self::load_pairs_csv(path)?,
            _ => {
                return Err(Sheet2ImgError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    extension,
                })
            }
        };
        info!(
            "Loaded catalogue {}: {} articles, {} URLs",
            path.display(),
            catalogue.len(),
            catalogue.total_urls()
        );
        Ok(catalogue)
    }

    fn load_json(path: &Path) -> Result<Self, Sheet2ImgError> {
        let text = std::fs::read_to_string(path).map_err(|e| Sheet2ImgError::CatalogueParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| Sheet2ImgError::CatalogueParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Two-column `article_id,url` file; the header row is skipped. Records
    /// with fewer than two fields, or an empty/`nan` id or URL, are ignored.
    fn load_pairs_csv(path: &Path) -> Result<Self, Sheet2ImgError> {
        let parse_err = |e: csv::Error| Sheet2ImgError::CatalogueParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(parse_err)?;

        let config = ExtractConfig::default();
        let mut catalogue = Catalogue::new();
        for record in reader.records() {
            let record = record.map_err(parse_err)?;
            let id = usable_value(record.get(0), &config);
            let url = usable_value(record.get(1), &config);
            if let (Some(id), Some(url)) = (id, url) {
                catalogue.push(id, url);
            }
        }
        Ok(catalogue)
    }

    /// Write as pretty JSON. Uses atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), Sheet2ImgError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Sheet2ImgError::Internal(format!("serialise catalogue: {e}")))?;
        write_atomic(path, json.as_bytes())?;
        debug!("Wrote catalogue {} ({} bytes)", path.display(), json.len());
        Ok(())
    }
}

impl FromIterator<(String, Vec<String>)> for Catalogue {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Lowercased file stem with every run of non-alphanumerics collapsed to `_`.
///
/// `"LINK IMAGE 1"` → `"link_image_1"`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() {
        "source".to_string()
    } else {
        out
    }
}

/// Catalogue file name for a source: `data_url_<slug>.json`.
pub fn catalogue_file_name(source: &str) -> String {
    format!("data_url_{}.json", slug(source))
}

/// Inverse of [`catalogue_file_name`] for naming download sub-directories:
/// `data_url_link_image_1.json` → `link_image_1`.
pub fn catalogue_label(path: &Path) -> String {
    let stem = crate::table::source_name(path);
    let stem = stem.strip_prefix("data_url_").unwrap_or(&stem);
    slug(stem)
}

/// Write `bytes` to `path` via a sibling `.tmp` file and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Sheet2ImgError> {
    let fail = |source: std::io::Error| Sheet2ImgError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }
    let tmp_path = tmp_sibling(path);
    std::fs::write(&tmp_path, bytes).map_err(fail)?;
    std::fs::rename(&tmp_path, path).map_err(fail)
}

/// `name.ext` → `name.ext.tmp`
pub(crate) fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(pairs: &[(&str, &[&str])]) -> Catalogue {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn push_appends_in_order() {
        let mut c = Catalogue::new();
        c.push("X", "u1");
        c.push("X", "u2");
        assert_eq!(c.get("X").unwrap(), ["u1", "u2"]);
        assert_eq!(c.total_urls(), 2);
    }

    #[test]
    fn merge_overwrite_is_last_writer_wins() {
        let mut a = cat(&[("X", &["u1"]), ("Y", &["y1"])]);
        let b = cat(&[("X", &["u2"])]);
        a.merge(b, MergeStrategy::Overwrite);
        assert_eq!(a.get("X").unwrap(), ["u2"]);
        assert_eq!(a.get("Y").unwrap(), ["y1"]);
    }

    #[test]
    fn merge_append_concatenates() {
        let mut a = cat(&[("X", &["u1"])]);
        a.merge(cat(&[("X", &["u2"])]), MergeStrategy::Append);
        assert_eq!(a.get("X").unwrap(), ["u1", "u2"]);
    }

    #[test]
    fn prune_drops_empty_entries() {
        let mut c = cat(&[("X", &[]), ("Y", &["y1"])]);
        assert_eq!(c.prune_empty(), 1);
        assert!(c.get("X").is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn json_shape_is_a_plain_object() {
        let c = cat(&[("A1", &["http://x/1.jpg"])]);
        let v: serde_json::Value = serde_json::to_value(&c).unwrap();
        assert_eq!(v, serde_json::json!({"A1": ["http://x/1.jpg"]}));
    }

    #[test]
    fn save_then_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/data_url_full.json");
        let c = cat(&[("Ärtikel-1", &["https://x/ü.jpg"])]);
        c.save(&path).unwrap();
        assert!(!tmp_sibling(&path).exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Ärtikel-1"), "non-ASCII kept verbatim: {text}");
        assert_eq!(Catalogue::load(&path).unwrap(), c);
    }

    #[test]
    fn load_pairs_csv_skips_header_and_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.csv");
        std::fs::write(
            &path,
            "artikel_id,url\nA1,http://x/1.jpg\nA1,http://x/2.jpg\nlonely\nB2,http://y/1.jpg\n",
        )
        .unwrap();
        let c = Catalogue::load(&path).unwrap();
        assert_eq!(c.get("A1").unwrap(), ["http://x/1.jpg", "http://x/2.jpg"]);
        assert_eq!(c.get("B2").unwrap(), ["http://y/1.jpg"]);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn load_pairs_csv_drops_blank_ids_and_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.csv");
        std::fs::write(
            &path,
            "artikel_id,url\n,http://x/orphan.jpg\n  ,http://x/blank.jpg\nnan,http://x/nan.jpg\n C3 , http://z/1.jpg \nD4,\n",
        )
        .unwrap();
        let c = Catalogue::load(&path).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("C3").unwrap(), ["http://z/1.jpg"]);
        assert!(c.get("").is_none());
    }

    #[test]
    fn load_missing_is_source_not_found() {
        let err = Catalogue::load(Path::new("nope/data_url_full.json")).unwrap_err();
        assert!(matches!(err, Sheet2ImgError::SourceNotFound { .. }));
    }

    #[test]
    fn load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let err = Catalogue::load(&path).unwrap_err();
        assert!(matches!(err, Sheet2ImgError::CatalogueParse { .. }));
    }

    #[test]
    fn slug_and_file_names() {
        assert_eq!(slug("LINK IMAGE 1"), "link_image_1");
        assert_eq!(slug("  IMAGE 26.09.2025 "), "image_26_09_2025");
        assert_eq!(slug("---"), "source");
        assert_eq!(catalogue_file_name("LINK IMAGE 2"), "data_url_link_image_2.json");
        assert_eq!(
            catalogue_label(Path::new("out/data_url_link_image_1.json")),
            "link_image_1"
        );
        assert_eq!(catalogue_label(Path::new("mine.json")), "mine");
    }
}
