//! Pipeline stages for both halves of the tool.
//!
//! Each submodule implements exactly one transformation step, so every
//! stage is testable on its own and the network / imaging libraries stay
//! behind narrow functions.
//!
//! ## Data Flow
//!
//! ```text
//! Catalogue Builder:   table ──▶ columns ──▶ extract ──▶ Catalogue
//! Batch Downloader:    URL ──▶ fetch ──▶ encode ──▶ <prefix><id>-<n>.jpg
//! ```
//!
//! 1. [`columns`] — identifier priority list, URL-column keywords, cell filters
//! 2. [`extract`] — scan rows of one table into a catalogue
//! 3. [`fetch`]   — timed HTTP GET with content-type and size checks
//! 4. [`encode`]  — decode, convert to RGB, re-encode as JPEG

pub mod columns;
pub mod encode;
pub mod extract;
pub mod fetch;
