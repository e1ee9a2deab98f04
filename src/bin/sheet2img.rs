//! CLI binary for sheet2img.
//!
//! A thin shim over the library crate: maps subcommands and flags to
//! `ExtractConfig` / `DownloadConfig`, owns the confirmation prompt, and
//! prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sheet2img::{
    build_catalogues, download_catalogues, inspect, load_catalogues, write_catalogues,
    Catalogue, DownloadConfig, DownloadProgressCallback, DownloadRecord, DownloadReport,
    ExtractConfig, ItemOutcome, MergeStrategy, ProgressCallback,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit status when the operator declines the confirmation prompt.
const EXIT_CANCELLED: u8 = 3;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one line per failed URL
/// (and per saved URL when `verbose`).
struct CliProgressCallback {
    bar: ProgressBar,
    verbose: bool,
}

impl CliProgressCallback {
    fn new(label: &str, verbose: bool) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>5}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar, verbose })
    }
}

impl DownloadProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_items: usize, articles: usize) {
        self.bar.set_length(total_items as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Downloading {total_items} images from {articles} articles…"
            ))
        ));
    }

    fn on_article_start(&self, article_id: &str, _urls: usize) {
        self.bar.set_message(article_id.to_string());
    }

    fn on_item_complete(
        &self,
        record: &DownloadRecord,
        outcome: &ItemOutcome,
        _processed: usize,
        _total: usize,
    ) {
        match outcome {
            ItemOutcome::Failed { error } => {
                let msg = error.to_string();
                // Truncate very long error messages to keep output tidy.
                let msg = if msg.chars().count() > 80 {
                    let cut: String = msg.chars().take(79).collect();
                    format!("{cut}\u{2026}")
                } else {
                    msg
                };
                self.bar.println(format!(
                    "  {} {}-{}  {}",
                    red("✗"),
                    record.article_id,
                    record.sequence,
                    red(&msg)
                ));
            }
            ItemOutcome::Saved { path } if self.verbose => {
                self.bar
                    .println(format!("  {} {}", green("✓"), dim(&path.display().to_string())));
            }
            ItemOutcome::Skipped { path } if self.verbose => {
                self.bar.println(format!(
                    "  {} {} {}",
                    dim("⏭"),
                    dim(&path.display().to_string()),
                    dim("(exists)")
                ));
            }
            _ => {}
        }
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _report: &DownloadReport) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Look at a sheet's columns before extracting
  sheet2img inspect "IMAGE 26.09.2025.xlsx"

  # Build per-source and merged catalogues in the current directory
  sheet2img extract "LINK IMAGE 1.xlsx" "LINK IMAGE 2.xlsx"

  # Download the merged catalogue (asks for confirmation)
  sheet2img download data_url_full.json -o hasil_download

  # Download each source into its own sub-folder, no prompt
  sheet2img download data_url_link_image_1.json data_url_link_image_2.json \
      -o hasil_download --yes

CATALOGUE FORMATS:
  .json   {"<article id>": ["https://…", …], …}
  .csv    article_id,url  (one URL per line, header row skipped)

OUTPUT:
  <dir>/<prefix><article id>-<n>.jpg   n = position of the URL in its list
  <dir>/failed_downloads.json          only when something failed

  Existing files are skipped, so rerunning a download retries only the
  failures.

ENVIRONMENT VARIABLES:
  RUST_LOG                 Override log filter (e.g. sheet2img=debug)
  SHEET2IMG_OUTPUT_DIR     Default for --output-dir
  SHEET2IMG_PREFIX         Default for --prefix
"#;

/// Extract product-image URLs from spreadsheets and bulk-download them.
#[derive(Parser, Debug)]
#[command(
    name = "sheet2img",
    version,
    about = "Extract product-image URLs from spreadsheets and bulk-download them as JPEG",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SHEET2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SHEET2IMG_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "SHEET2IMG_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show columns, likely id / URL columns and sample values of tables.
    Inspect {
        /// Table files (.csv, .tsv, .xlsx or .xls).
        #[arg(required = true)]
        tables: Vec<PathBuf>,

        /// Print the profiles as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build catalogues: one per table plus a merged data_url_full.json.
    Extract {
        /// Table files (.csv, .tsv, .xlsx or .xls), merged in the given order.
        #[arg(required = true)]
        tables: Vec<PathBuf>,

        /// Directory receiving the catalogue files.
        #[arg(short, long, env = "SHEET2IMG_CATALOGUE_DIR", default_value = ".")]
        output_dir: PathBuf,

        /// Cross-source merge for keys present in several tables.
        #[arg(long, env = "SHEET2IMG_MERGE", value_enum, default_value = "overwrite")]
        merge: MergeArg,
    },

    /// Download the images of one or more catalogues.
    Download {
        /// Catalogue files (.json or .csv).
        #[arg(required = true)]
        catalogues: Vec<PathBuf>,

        /// Output directory. With several catalogues each gets a sub-folder.
        #[arg(short, long, env = "SHEET2IMG_OUTPUT_DIR", default_value = "hasil_download")]
        output_dir: PathBuf,

        /// File name prefix: <prefix><id>-<n>.jpg
        #[arg(long, env = "SHEET2IMG_PREFIX", default_value = "MNG")]
        prefix: String,

        /// Per-request timeout in seconds.
        #[arg(long, env = "SHEET2IMG_TIMEOUT", default_value_t = 30)]
        timeout: u64,

        /// JPEG quality (1–100).
        #[arg(long, env = "SHEET2IMG_QUALITY", default_value_t = 95,
              value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,

        /// Log progress every N images.
        #[arg(long, env = "SHEET2IMG_PROGRESS_EVERY", default_value_t = 10)]
        progress_every: usize,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MergeArg {
    Overwrite,
    Append,
}

impl From<MergeArg> for MergeStrategy {
    fn from(v: MergeArg) -> Self {
        match v {
            MergeArg::Overwrite => MergeStrategy::Overwrite,
            MergeArg::Append => MergeStrategy::Append,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let is_download = matches!(cli.command, Command::Download { .. });
    let show_progress = is_download && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Inspect { ref tables, json } => run_inspect(tables, json),
        Command::Extract {
            ref tables,
            ref output_dir,
            merge,
        } => run_extract(tables, output_dir, merge.into(), cli.quiet),
        Command::Download {
            ref catalogues,
            ref output_dir,
            ref prefix,
            timeout,
            quality,
            progress_every,
            yes,
        } => {
            let base = DownloadConfig::builder()
                .output_dir(output_dir)
                .file_prefix(prefix.as_str())
                .timeout_secs(timeout)
                .jpeg_quality(quality)
                .progress_interval(progress_every)
                .build()
                .context("Invalid configuration")?;
            run_download(catalogues, base, yes, show_progress, &cli).await
        }
    }
}

fn run_inspect(tables: &[PathBuf], json: bool) -> Result<ExitCode> {
    let mut profiles = Vec::with_capacity(tables.len());
    for path in tables {
        let profile =
            inspect(path).with_context(|| format!("Failed to inspect {}", path.display()))?;
        profiles.push(profile);
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&profiles).context("Failed to serialise profiles")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    for p in &profiles {
        println!("{} ({} rows)", bold(&p.name), p.rows);
        println!("  Columns ({}):", p.columns.len());
        for (i, col) in p.columns.iter().enumerate() {
            println!("    {:>2}. {}", i + 1, col);
        }
        println!("  ID-like columns:        {:?}", p.id_columns);
        println!("  URL-like columns:       {:?}", p.url_columns);
        println!("  Extracted URL columns:  {:?}", p.extraction_url_columns);
        if let Some(col) = p.id_columns.first() {
            println!("  Sample values of '{col}': {:?}", p.sample_ids);
        }
        if let Some(col) = p.url_columns.first() {
            println!("  Sample URLs from '{col}':");
            for url in &p.sample_urls {
                println!("    {url}");
            }
        }
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

fn run_extract(
    tables: &[PathBuf],
    output_dir: &Path,
    merge: MergeStrategy,
    quiet: bool,
) -> Result<ExitCode> {
    let config = ExtractConfig::builder()
        .merge(merge)
        .build()
        .context("Invalid configuration")?;
    let set = build_catalogues(tables, &config).context("Failed to read tables")?;
    let written = write_catalogues(&set, output_dir).context("Failed to write catalogues")?;

    if !quiet {
        for source in &set.sources {
            let s = &source.stats;
            eprintln!(
                "{} {}  {} rows ({} without id)  {} articles  {} URLs  {}",
                green("✔"),
                bold(&source.name),
                s.rows,
                s.rows_skipped,
                s.articles,
                s.urls_accepted,
                dim(&format!("{} non-http cells ignored", s.urls_rejected)),
            );
        }
        let per_article = if set.total_articles() == 0 {
            0.0
        } else {
            set.total_urls() as f64 / set.total_articles() as f64
        };
        eprintln!(
            "{} merged: {} articles, {} URLs ({:.1} per article)",
            cyan("◆"),
            bold(&set.total_articles().to_string()),
            bold(&set.total_urls().to_string()),
            per_article
        );
        for path in &written {
            eprintln!("   → {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_download(
    catalogues: &[PathBuf],
    base: DownloadConfig,
    yes: bool,
    show_progress: bool,
    cli: &Cli,
) -> Result<ExitCode> {
    // ── Load every catalogue first; a bad one halts only itself ─────────
    let mut any_failed = false;
    let mut loaded: Vec<(PathBuf, Catalogue)> = Vec::with_capacity(catalogues.len());
    for (path, result) in load_catalogues(catalogues) {
        match result {
            Ok(c) => loaded.push((path, c)),
            Err(e) => {
                eprintln!("{} {}", red("✘"), e);
                any_failed = true;
            }
        }
    }
    if loaded.is_empty() {
        anyhow::bail!("No catalogue could be loaded");
    }

    let total_articles: usize = loaded.iter().map(|(_, c)| c.len()).sum();
    let total_urls: usize = loaded.iter().map(|(_, c)| c.total_urls()).sum();
    eprintln!(
        "{} {} catalogue(s): {} articles, {} URLs",
        cyan("◆"),
        loaded.len(),
        bold(&total_articles.to_string()),
        bold(&total_urls.to_string())
    );

    // ── Confirmation ─────────────────────────────────────────────────────
    if !yes && !confirm("Start downloading? (y/n): ")? {
        eprintln!("{} Download cancelled.", red("✘"));
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }

    // ── One run per catalogue ────────────────────────────────────────────
    let mut bars: Vec<Arc<CliProgressCallback>> = Vec::new();
    let runs = download_catalogues(&loaded, &base, |label| {
        if !show_progress {
            return None;
        }
        let cb = CliProgressCallback::new(label, cli.verbose);
        bars.push(Arc::clone(&cb));
        Some(cb as ProgressCallback)
    })
    .await;
    // A run that failed before starting never finishes its bar.
    for cb in &bars {
        cb.bar.finish_and_clear();
    }

    for run in &runs {
        any_failed |= !run.is_clean();
        match &run.result {
            Ok(report) if !cli.quiet => print_report(&run.label, report),
            Ok(_) => {}
            Err(e) => eprintln!(
                "{} {}  {}",
                red("✘"),
                bold(&run.label),
                red(&format!("Download of {} failed: {e}", run.source.display()))
            ),
        }
    }

    if runs.len() > 1 && !cli.quiet {
        eprintln!("{} Folders:", cyan("◆"));
        for run in &runs {
            eprintln!(
                "   {}  {} images",
                run.output_dir.display(),
                count_jpegs(&run.output_dir)
            );
        }
    }

    Ok(if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_report(label: &str, report: &DownloadReport) {
    eprintln!(
        "{}  {}  {} saved  {} skipped  {} failed  {}  {:.1}s  →  {}",
        if report.failed == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        bold(label),
        report.saved,
        report.skipped,
        if report.failed == 0 {
            report.failed.to_string()
        } else {
            red(&report.failed.to_string())
        },
        bold(&report.success_rate_label()),
        report.duration_ms as f64 / 1000.0,
        report.output_dir.display(),
    );
    if let Some(ref log) = report.failure_log {
        eprintln!("   {} {}", dim("failure log:"), log.display());
    }
}

/// Ask on stderr, read one line from stdin. `y`, `yes` and `ya` accept.
fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush().ok();
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "ya"
    ))
}

fn count_jpegs(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|x| x == "jpg"))
                .count()
        })
        .unwrap_or(0)
}
