//! CLI binary for edgequake-pdf2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2csv::{
    convert, convert_batch, inspect, write_output, BalanceCheck, ConversionConfig,
    ConversionProgressCallback, ConversionStats, PageSelection, ProgressCallback,
    StatementOptions, StatementReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

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

// ── CLI progress callbacks using indicatif ───────────────────────────────────

/// Per-page progress for a single document.
struct PageProgress {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl PageProgress {
    /// Starts as a spinner; `on_conversion_start` turns it into a bar once
    /// the page count is known.
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for PageProgress {
    fn on_conversion_start(&self, total_pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Extracting");
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, line_count: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{line_count:>5} lines")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }

    fn on_conversion_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

/// Per-document progress for batch runs. Page events are ignored; each
/// document advances the bar by one, whether it converted or failed.
struct DocumentProgress {
    bar: ProgressBar,
}

impl DocumentProgress {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} documents  \
                 ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for DocumentProgress {
    fn on_conversion_complete(&self, _total_pages: usize, _success_count: usize) {
        self.bar.inc(1);
    }

    fn on_conversion_error(&self, _error: &str) {
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  pdf2csv statement.pdf

  # Convert to file
  pdf2csv statement.pdf -o statement.csv

  # Several statements into one directory (<stem>.csv each; a repeated
  # stem gets -2, -3, ... appended)
  pdf2csv jan.pdf feb.pdf mar.pdf -o outputs/

  # Bank statement: account header, no repeated page headers, only
  # transaction rows, and a running-balance check
  pdf2csv --statement-header --dedup --transactions-only --check-balance statement.pdf

  # Specific pages, narrower columns
  pdf2csv --pages 2-4 --tolerance 3 report.pdf -o report.csv

  # Text already extracted with `pdftotext -layout`
  pdftotext -layout statement.pdf statement.txt
  pdf2csv statement.txt

  # Inspect PDF metadata only
  pdf2csv --inspect-only statement.pdf

  # JSON output with table, stats and metadata
  pdf2csv --json statement.pdf > statement.json

HOW COLUMNS ARE FOUND:
  Every line is split into runs of non-space characters; the start offset of
  each run is pooled across all lines. Offsets no more than --tolerance chars
  apart are merged and the smallest one becomes a column's left edge. Lines
  are cut at those edges and padded to a rectangle. With fewer than
  --min-boundaries edges, lines are split on runs of 2+ spaces instead.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override log filter (e.g. edgequake_pdf2csv=debug)
  PDF2CSV_*               Fallback for every flag (e.g. PDF2CSV_TOLERANCE=4)
"#;

/// Rebuild tables from statement PDFs and export them as CSV.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2csv",
    version,
    about = "Rebuild tables from statement PDFs and export them as CSV",
    long_about = "Extract the text layer of statement-style PDFs (or read text extracted \
elsewhere), infer column boundaries from character alignment across the whole document, \
and write a rectangular CSV with CRLF rows and minimal quoting.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or UTF-8 text files.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file, or output directory when several inputs are given.
    #[arg(short, long, env = "PDF2CSV_OUTPUT")]
    output: Option<PathBuf>,

    /// Max distance (chars) between segment starts of one column.
    #[arg(long, env = "PDF2CSV_TOLERANCE", default_value_t = 6)]
    tolerance: usize,

    /// Boundaries needed before column slicing is used.
    #[arg(long, env = "PDF2CSV_MIN_BOUNDARIES", default_value_t = 2,
          value_parser = clap::value_parser!(u64).range(1..))]
    min_boundaries: u64,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2CSV_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2CSV_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Keep Unicode spaces and tabs as extracted.
    #[arg(long, env = "PDF2CSV_NO_NORMALIZE")]
    no_normalize: bool,

    /// Documents converted at once when several inputs are given.
    #[arg(short, long, env = "PDF2CSV_CONCURRENCY", default_value_t = 4,
          value_parser = clap::value_parser!(u64).range(1..))]
    concurrency: u64,

    /// Write `Account Number:` and `Opening Balance:` rows above the table.
    #[arg(long, env = "PDF2CSV_STATEMENT_HEADER", help_heading = "Statement")]
    statement_header: bool,

    /// Drop duplicate rows such as repeated page headers, keeping the first.
    #[arg(long, env = "PDF2CSV_DEDUP", help_heading = "Statement")]
    dedup: bool,

    /// Keep only the column-header row and rows holding a date and an amount.
    #[arg(long, env = "PDF2CSV_TRANSACTIONS_ONLY", help_heading = "Statement")]
    transactions_only: bool,

    /// Rewrite Debit/Credit/Amount/Balance cells as plain decimals.
    #[arg(long, env = "PDF2CSV_CLEAN_AMOUNTS", help_heading = "Statement")]
    clean_amounts: bool,

    /// Report rows whose balance disagrees with the running balance.
    #[arg(long, env = "PDF2CSV_CHECK_BALANCE", help_heading = "Statement")]
    check_balance: bool,

    /// As --check-balance, then overwrite balances with recomputed values.
    #[arg(long, env = "PDF2CSV_FIX_BALANCE", help_heading = "Statement")]
    fix_balance: bool,

    /// Opening balance for the balance check (default: read from the text).
    #[arg(long, env = "PDF2CSV_OPENING_BALANCE", allow_negative_numbers = true,
          help_heading = "Statement")]
    opening_balance: Option<f64>,

    /// Output structured JSON (ConversionOutput) instead of CSV.
    #[arg(long, env = "PDF2CSV_JSON")]
    json: bool,

    /// Print document metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear through the progress bar, so they are
    // only shown when the bar is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        for input in &cli.inputs {
            let meta = inspect(input, &config)
                .await
                .with_context(|| format!("Failed to inspect {input}"))?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
                );
                continue;
            }

            println!("File:         {}", input);
            println!("Kind:         {:?}", meta.source_kind);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            if !meta.pdf_version.is_empty() {
                println!("PDF Version:  {}", meta.pdf_version);
            }
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    if cli.inputs.len() > 1 {
        return run_batch(&cli, show_progress).await;
    }

    // ── Single document ──────────────────────────────────────────────────
    let input = &cli.inputs[0];
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(PageProgress::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let output = convert(input, &config)
        .await
        .context("Conversion failed")?;

    let body = if cli.json {
        let mut json =
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        json.push('\n');
        json
    } else {
        output.csv.clone()
    };

    let target = match cli.output {
        Some(ref path) => {
            write_output(path, &body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path.display().to_string()
        }
        None => {
            io::stdout()
                .lock()
                .write_all(body.as_bytes())
                .context("Failed to write to stdout")?;
            "stdout".to_string()
        }
    };

    if !cli.quiet {
        if let Some(ref report) = output.statement {
            print_statement_report(input, report);
        }
        if !cli.json {
            print_summary(&output.stats, &target);
        }
    }

    Ok(())
}

/// Convert several inputs, writing one uniquely named file per input into
/// the output directory (the current directory when `-o` is absent).
async fn run_batch(cli: &Cli, show_progress: bool) -> Result<()> {
    let out_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    if out_dir.is_file() {
        anyhow::bail!(
            "-o must be a directory when converting several inputs (got file {})",
            out_dir.display()
        );
    }
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let ext = if cli.json { "json" } else { "csv" };
    let names = output_names(&cli.inputs, ext);

    let progress = show_progress.then(|| DocumentProgress::new(cli.inputs.len()));
    let progress_cb = progress
        .clone()
        .map(|p| p as Arc<dyn ConversionProgressCallback>);
    let config = build_config(cli, progress_cb)?;

    let items = convert_batch(&cli.inputs, &config).await;
    if let Some(p) = progress {
        p.bar.finish_and_clear();
    }

    let mut failed = 0usize;
    for (item, name) in items.into_iter().zip(names) {
        let target = out_dir.join(name);
        let written = match item.result {
            Ok(output) => {
                let body = if cli.json {
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?
                } else {
                    output.csv.clone()
                };
                match write_output(&target, &body).await {
                    Ok(()) => Ok(output),
                    Err(e) => Err(anyhow::Error::new(e)),
                }
            }
            Err(e) => Err(anyhow::Error::new(e)),
        };

        match written {
            Ok(output) => {
                if !cli.quiet {
                    eprintln!(
                        "{} {}  {} rows × {} cols  →  {}",
                        green("✓"),
                        item.input,
                        output.stats.row_count,
                        output.stats.column_count,
                        bold(&target.display().to_string()),
                    );
                    if let Some(ref report) = output.statement {
                        print_statement_report(&item.input, report);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}  {}", red("✗"), item.input, red(&format!("{e:#}")));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} documents failed", cli.inputs.len());
    }
    Ok(())
}

fn print_summary(stats: &ConversionStats, target: &str) {
    eprintln!(
        "{}  {} rows × {} cols  {}  {}ms  →  {}",
        if stats.failed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.row_count,
        stats.column_count,
        dim(&format!("{:?}", stats.strategy)),
        stats.total_duration_ms,
        bold(target),
    );
}

/// Mismatches listed per document before the rest is summarised.
const MAX_LISTED_MISMATCHES: usize = 10;

fn print_statement_report(input: &str, report: &StatementReport) {
    if report.duplicates_removed > 0 || report.non_transactions_removed > 0 {
        eprintln!(
            "  {} {} duplicate and {} non-transaction rows removed",
            dim("·"),
            report.duplicates_removed,
            report.non_transactions_removed,
        );
    }
    let Some(ref balance) = report.balance else {
        return;
    };
    if balance.mismatches.is_empty() {
        eprintln!(
            "  {} {} balances agree (opening {:.2})",
            green("✓"),
            balance.checked_rows,
            balance.opening_balance,
        );
        return;
    }

    eprintln!(
        "  {} {}: {}/{} balances disagree{}",
        cyan("⚠"),
        input,
        red(&balance.mismatches.len().to_string()),
        balance.checked_rows,
        if balance.fixed { ", fixed" } else { "" },
    );
    for m in balance.mismatches.iter().take(MAX_LISTED_MISMATCHES) {
        eprintln!(
            "    row {:>4}  stated {:>12.2}  expected {:>12.2}",
            m.row, m.stated, m.expected
        );
    }
    if balance.mismatches.len() > MAX_LISTED_MISMATCHES {
        eprintln!(
            "    {}",
            dim(&format!(
                "… {} more",
                balance.mismatches.len() - MAX_LISTED_MISMATCHES
            ))
        );
    }
}

/// `statements/jan.pdf` → `jan`
fn file_stem(input: &str) -> String {
    Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// One output file name per input, `<stem>.<ext>`. A stem already taken by
/// an earlier input gets `-2`, `-3`, … appended. Names are compared without
/// case so case-insensitive file systems cannot collide either.
fn output_names(inputs: &[String], ext: &str) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = file_stem(input);
            let mut name = format!("{stem}.{ext}");
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{stem}-{n}.{ext}");
                n += 1;
            }
            PathBuf::from(name)
        })
        .collect()
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages: PageSelection = cli.pages.parse().context("Invalid --pages")?;

    let mut builder = ConversionConfig::builder()
        .cluster_tolerance(cli.tolerance)
        .min_boundaries(cli.min_boundaries as usize)
        .normalize_whitespace(!cli.no_normalize)
        .pages(pages)
        .concurrency(cli.concurrency as usize);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let balance = if cli.fix_balance {
        BalanceCheck::Fix
    } else if cli.check_balance {
        BalanceCheck::Report
    } else {
        BalanceCheck::Off
    };
    builder = builder.statement(StatementOptions {
        header: cli.statement_header,
        dedup: cli.dedup,
        transactions_only: cli.transactions_only,
        clean_amounts: cli.clean_amounts,
        balance,
        opening_balance: cli.opening_balance,
    });

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(inputs: &[&str], ext: &str) -> Vec<String> {
        let inputs: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        output_names(&inputs, ext)
            .into_iter()
            .map(|p| p.display().to_string())
            .collect()
    }

    #[test]
    fn test_output_names() {
        assert_eq!(
            names(&["statements/jan.pdf", "report", "a.b.txt"], "csv"),
            vec!["jan.csv", "report.csv", "a.b.csv"]
        );
    }

    #[test]
    fn test_output_names_never_collide() {
        assert_eq!(
            names(&["2024/jan.pdf", "2025/jan.pdf", "jan-2.txt", "JAN.pdf"], "csv"),
            vec!["jan.csv", "jan-2.csv", "jan-2-2.csv", "JAN-3.csv"]
        );
        assert_eq!(names(&["a/x.pdf", "b/x.txt"], "json"), vec!["x.json", "x-2.json"]);
    }

    #[test]
    fn test_document_progress_counts_failures() {
        let progress = DocumentProgress::new(3);
        progress.on_conversion_complete(2, 2);
        progress.on_conversion_error("File not found");
        progress.on_conversion_complete(1, 1);
        assert_eq!(progress.bar.position(), 3);
        progress.bar.finish_and_clear();
    }

    #[test]
    fn test_cli_statement_flags() {
        let cli = Cli::try_parse_from([
            "pdf2csv",
            "a.pdf",
            "--dedup",
            "--fix-balance",
            "--opening-balance",
            "-12.5",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert!(config.statement.dedup);
        assert!(!config.statement.header);
        assert_eq!(config.statement.balance, BalanceCheck::Fix);
        assert_eq!(config.statement.opening_balance, Some(-12.5));
    }

    #[test]
    fn test_cli_parses_batch() {
        let cli = Cli::try_parse_from(["pdf2csv", "a.pdf", "b.pdf", "-o", "out", "--tolerance", "3"])
            .unwrap();
        assert_eq!(cli.inputs, vec!["a.pdf", "b.pdf"]);
        assert_eq!(cli.tolerance, 3);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.cluster_tolerance, 3);
        assert_eq!(config.min_boundaries, 2);
    }

    #[test]
    fn test_cli_rejects_zero_concurrency() {
        assert!(Cli::try_parse_from(["pdf2csv", "a.pdf", "--concurrency", "0"]).is_err());
    }
}
