//! Error types for the sheet2img library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Sheet2ImgError`] — **Fatal**: a whole stage cannot proceed (input
//!   table or catalogue missing, output directory not writable, bad
//!   configuration). Returned as `Err(Sheet2ImgError)` from the top-level
//!   build and download functions. It halts that stage only; a caller
//!   processing several catalogues moves on to the next one.
//!
//! * [`ItemError`] — **Non-fatal**: a single URL failed (network error,
//!   HTTP status, not an image, undecodable bytes) but every other URL is
//!   unaffected. Stored inside [`crate::download::ItemOutcome::Failed`] and
//!   in the failure log rather than propagated.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sheet2img library.
///
/// Per-URL failures use [`ItemError`] and are collected into the
/// download report instead of being propagated here.
#[derive(Debug, Error)]
pub enum Sheet2ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// An input table or catalogue file does not exist.
    #[error("Source not found: '{path}'\nRun the extract step first or check the path.")]
    SourceNotFound { path: PathBuf },

    /// The file extension is not one the reader understands.
    #[error("Unsupported source format '{extension}' for '{path}' (expected .csv, .tsv or .json)")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The table exists but could not be parsed.
    #[error("Failed to read table '{path}': {detail}")]
    SourceUnreadable { path: PathBuf, detail: String },

    /// The catalogue file is not a valid `id → [url]` mapping.
    #[error("Catalogue '{path}' is malformed: {detail}")]
    CatalogueParse { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory or write a catalogue / log file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── HTTP errors ───────────────────────────────────────────────────────
    /// The shared HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single URL.
///
/// Recorded in the failure log; the batch always continues with the next URL.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// Connection, DNS, TLS or body-read failure.
    #[error("request failed: {detail}")]
    Request { detail: String },

    /// The request did not complete within the configured timeout.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    /// The declared content type is missing or not `image/*`.
    #[error("not an image: content-type '{content_type}'")]
    NotAnImage { content_type: String },

    /// The body exceeded the configured size cap.
    #[error("body larger than {limit} bytes")]
    TooLarge { limit: u64 },

    /// The fetched bytes are not a decodable image.
    #[error("cannot decode image: {detail}")]
    Decode { detail: String },

    /// JPEG re-encoding failed.
    #[error("cannot encode JPEG: {detail}")]
    Encode { detail: String },

    /// The JPEG could not be written to its target path.
    #[error("cannot write '{path}': {detail}")]
    Write { path: PathBuf, detail: String },
}

impl ItemError {
    /// `true` for the fetch class (network, status, content type, size);
    /// `false` for the decode class (decode, encode, write).
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ItemError::Request { .. }
                | ItemError::Timeout { .. }
                | ItemError::HttpStatus { .. }
                | ItemError::NotAnImage { .. }
                | ItemError::TooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_not_found_display() {
        let e = Sheet2ImgError::SourceNotFound {
            path: PathBuf::from("data_url_full.json"),
        };
        assert!(e.to_string().contains("data_url_full.json"));
    }

    #[test]
    fn http_status_display() {
        let e = ItemError::HttpStatus { status: 404 };
        assert_eq!(e.to_string(), "HTTP 404");
    }

    #[test]
    fn not_an_image_display() {
        let e = ItemError::NotAnImage {
            content_type: "text/html".into(),
        };
        assert!(e.to_string().contains("text/html"));
    }

    #[test]
    fn fetch_and_decode_classes() {
        assert!(ItemError::Timeout { secs: 30 }.is_fetch_failure());
        assert!(ItemError::TooLarge { limit: 1 }.is_fetch_failure());
        assert!(!ItemError::Decode {
            detail: "bad magic".into()
        }
        .is_fetch_failure());
        assert!(!ItemError::Write {
            path: PathBuf::from("x.jpg"),
            detail: "disk full".into()
        }
        .is_fetch_failure());
    }
}
