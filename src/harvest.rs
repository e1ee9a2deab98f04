//! Top-level entry points for both stages.
//!
//! The two stages never share runtime state: [`build_catalogues`] and
//! [`write_catalogues`] produce catalogue files, [`download_file`] reads one
//! back and runs a [`BatchDownloader`] over it. Nothing here prompts or
//! starts a download on its own; the caller decides when a batch begins.

use crate::catalogue::{
    catalogue_file_name, catalogue_label, slug, Catalogue, MERGED_CATALOGUE_FILE,
};
use crate::config::{ColumnMatch, DownloadConfig, ExtractConfig};
use crate::download::{BatchDownloader, DownloadReport};
use crate::error::Sheet2ImgError;
use crate::output::{CatalogueRun, CatalogueSet, SourceCatalogue, TableProfile};
use crate::pipeline::columns::{likely_id_columns, url_columns};
use crate::pipeline::extract;
use crate::progress::ProgressCallback;
use crate::table::{load_table, Table};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

const SAMPLE_IDS: usize = 5;
const SAMPLE_URLS: usize = 3;

/// Build the catalogue of one in-memory table.
pub fn build_catalogue(table: &Table, config: &ExtractConfig) -> Catalogue {
    extract::extract(table, config).0
}

/// Read every table, extract one catalogue per table and merge them in
/// input order using `config.merge`.
///
/// # Errors
/// The first table that is missing or unreadable aborts the whole build.
pub fn build_catalogues<P: AsRef<Path>>(
    sources: &[P],
    config: &ExtractConfig,
) -> Result<CatalogueSet, Sheet2ImgError> {
    let start = Instant::now();
    let mut set = CatalogueSet::default();

    for source in sources {
        let source = source.as_ref();
        let table = load_table(source)?;
        info!("Read {}: {} rows", source.display(), table.len());

        let (catalogue, stats) = extract::extract(&table, config);
        set.merged.merge(catalogue.clone(), config.merge);
        set.sources.push(SourceCatalogue {
            name: table.name.clone(),
            source: source.to_path_buf(),
            catalogue,
            stats,
        });
    }

    info!(
        "Built {} catalogues: {} articles, {} URLs merged ({:?}) in {}ms",
        set.sources.len(),
        set.total_articles(),
        set.total_urls(),
        config.merge,
        start.elapsed().as_millis()
    );
    Ok(set)
}

/// Write `data_url_<slug>.json` per source and `data_url_full.json` into
/// `out_dir`. Returns the written paths, merged file last.
///
/// Two sources with the same slug get `_2`, `_3`, … suffixes.
pub fn write_catalogues(set: &CatalogueSet, out_dir: &Path) -> Result<Vec<PathBuf>, Sheet2ImgError> {
    let mut written = Vec::with_capacity(set.sources.len() + 1);
    let mut used: HashSet<String> = HashSet::new();

    for source in &set.sources {
        let base = slug(&source.name);
        let mut name = base.clone();
        let mut n = 2;
        while !used.insert(name.clone()) {
            name = format!("{base}_{n}");
            n += 1;
        }
        let path = out_dir.join(catalogue_file_name(&name));
        source.catalogue.save(&path)?;
        info!(
            "Saved {} ({} articles)",
            path.display(),
            source.catalogue.len()
        );
        written.push(path);
    }

    let merged_path = out_dir.join(MERGED_CATALOGUE_FILE);
    set.merged.save(&merged_path)?;
    info!(
        "Saved {} ({} articles)",
        merged_path.display(),
        set.merged.len()
    );
    written.push(merged_path);
    Ok(written)
}

/// Profile a table file without extracting anything.
pub fn inspect(path: &Path) -> Result<TableProfile, Sheet2ImgError> {
    let table = load_table(path)?;
    Ok(profile_table(&table, &ExtractConfig::default()))
}

/// Profile an in-memory table.
pub fn profile_table(table: &Table, config: &ExtractConfig) -> TableProfile {
    let columns = table.columns();
    let id_columns: Vec<String> = likely_id_columns(columns)
        .into_iter()
        .map(str::to_string)
        .collect();
    let names = |idx: Vec<usize>| -> Vec<String> {
        idx.into_iter().map(|i| columns[i].clone()).collect()
    };
    let exploratory = url_columns(columns, config, ColumnMatch::Exploratory);
    let production = url_columns(columns, config, ColumnMatch::Production);

    let sample_ids = id_columns
        .first()
        .map(|col| {
            table
                .rows()
                .take(SAMPLE_IDS)
                .map(|r| r.get(col).unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default();
    let sample_urls = exploratory
        .first()
        .map(|&idx| {
            table
                .rows()
                .filter_map(|r| r.get_index(idx))
                .take(SAMPLE_URLS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    TableProfile {
        name: table.name.clone(),
        rows: table.len(),
        columns: columns.to_vec(),
        id_columns,
        url_columns: names(exploratory),
        extraction_url_columns: names(production),
        sample_ids,
        sample_urls,
    }
}

/// Download every URL of an in-memory catalogue.
pub async fn download(
    catalogue: &Catalogue,
    config: DownloadConfig,
) -> Result<DownloadReport, Sheet2ImgError> {
    BatchDownloader::new(config)?.run(catalogue).await
}

/// Load a catalogue file (`.json` or `.csv`) and download it.
///
/// # Errors
/// `SourceNotFound` when the catalogue is missing; the caller can report it
/// and continue with its next catalogue.
pub async fn download_file(
    catalogue_path: &Path,
    config: DownloadConfig,
) -> Result<DownloadReport, Sheet2ImgError> {
    let catalogue = Catalogue::load(catalogue_path)?;
    download(&catalogue, config).await
}

/// Load every catalogue file, keeping each file's error next to its path so
/// one missing or malformed file does not hide the others.
pub fn load_catalogues<P: AsRef<Path>>(
    paths: &[P],
) -> Vec<(PathBuf, Result<Catalogue, Sheet2ImgError>)> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            (path.to_path_buf(), Catalogue::load(path))
        })
        .collect()
}

/// Download several catalogues one after another.
///
/// With more than one catalogue each writes into
/// `<base.output_dir>/<label>`. `progress_for` is asked once per catalogue
/// for a callback. A fatal error in one catalogue (e.g. its folder cannot be
/// created) is kept in that [`CatalogueRun`] and the next catalogue still
/// runs.
pub async fn download_catalogues<F>(
    catalogues: &[(PathBuf, Catalogue)],
    base: &DownloadConfig,
    mut progress_for: F,
) -> Vec<CatalogueRun>
where
    F: FnMut(&str) -> Option<ProgressCallback>,
{
    let split = catalogues.len() > 1;
    let mut runs = Vec::with_capacity(catalogues.len());

    for (path, catalogue) in catalogues {
        let label = catalogue_label(path);
        let mut config = base.clone();
        if split {
            config.output_dir = base.output_dir.join(&label);
        }
        if let Some(cb) = progress_for(&label) {
            config.progress_callback = Some(cb);
        }
        let output_dir = config.output_dir.clone();

        let result = match BatchDownloader::new(config) {
            Ok(downloader) => downloader.run(catalogue).await,
            Err(e) => Err(e),
        };
        if let Err(ref e) = result {
            warn!("Download of {} failed: {}", path.display(), e);
        }
        runs.push(CatalogueRun {
            source: path.clone(),
            label,
            output_dir,
            result,
        });
    }
    runs
}
