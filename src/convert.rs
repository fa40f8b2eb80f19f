//! Conversion entry points.
//!
//! Every entry point ends in the same place: the lines of all selected
//! pages are concatenated in page order and handed to
//! [`crate::table::reconstruct`] as one unit, so column boundaries are
//! inferred across the whole page set rather than page by page.

use crate::config::ConversionConfig;
use crate::error::Pdf2CsvError;
use crate::output::{BatchItem, ConversionOutput, ConversionStats, DocumentMetadata, PageText};
use crate::pipeline::input::{self, InputKind, ResolvedInput};
use crate::pipeline::{extract, normalize};
use crate::table::{self, statement, statement::StatementReport, Table};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Form feed: the page separator `pdftotext` and most text extractors emit.
const PAGE_BREAK: char = '\u{000C}';

/// Convert a PDF (or a pre-extracted text file) to CSV.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages failed
/// (check `output.stats.failed_pages`, or call
/// [`ConversionOutput::into_result`]).
///
/// # Errors
/// Returns `Err(Pdf2CsvError)` only for fatal errors:
/// - File not found / permission denied / not a PDF or text
/// - pdfium cannot be bound or the PDF cannot be opened
/// - The page selection is empty, or every selected page failed
///
/// The progress callback, if any, gets `on_conversion_complete` on success
/// and `on_conversion_error` on a fatal error.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2CsvError> {
    let result = convert_document(input_str.as_ref(), config).await;
    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(output) => {
                cb.on_conversion_complete(output.pages.len(), output.stats.extracted_pages)
            }
            Err(e) => cb.on_conversion_error(&e.to_string()),
        }
    }
    result
}

async fn convert_document(
    input_str: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2CsvError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str)?;

    // ── Step 2: Extract page text ────────────────────────────────────────
    let extract_start = Instant::now();
    let (metadata, pages) = match resolved {
        ResolvedInput::Pdf(ref path) => extract::extract_document(path, config).await?,
        ResolvedInput::Text { ref text, .. } => text_pages(text, config)?,
    };
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    debug!(
        "Extracted {} pages from {} in {}ms",
        pages.len(),
        resolved.path().display(),
        extract_duration_ms
    );

    // ── Step 3: Reconstruct and serialise ────────────────────────────────
    let mut output = assemble(metadata, pages, config)?;
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete: {} rows × {} columns ({:?}), {}ms total",
        output.stats.row_count,
        output.stats.column_count,
        output.stats.strategy,
        output.stats.total_duration_ms
    );

    Ok(output)
}

/// Reconstruct a table from lines that were already extracted.
///
/// The lines are used exactly as given: no whitespace normalisation is
/// applied, so callers feeding raw extractor output should run
/// [`crate::pipeline::normalize::normalize_line`] first if needed.
pub fn convert_lines<S: AsRef<str>>(
    lines: &[S],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2CsvError> {
    let start = Instant::now();
    let (table, csv, report) = tabulate(lines, config)?;
    let page = PageText::ok(1, lines.iter().map(|l| l.as_ref().to_string()).collect());

    let stats = ConversionStats {
        total_pages: 1,
        extracted_pages: 1,
        failed_pages: 0,
        line_count: lines.len(),
        row_count: table.rows.len(),
        column_count: table.column_count(),
        boundary_count: table.boundaries.len(),
        strategy: table.strategy,
        extract_duration_ms: 0,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    Ok(ConversionOutput {
        csv,
        table,
        pages: vec![page],
        metadata: text_metadata(1),
        stats,
        statement: report,
    })
}

/// Convert a document and write the CSV directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2CsvError> {
    let output = convert(input_str, config).await?;
    write_output(output_path.as_ref(), &output.csv).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2CsvError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2CsvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Convert document bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed when
/// this function returns.
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2CsvError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| Pdf2CsvError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| Pdf2CsvError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(&path, config).await
}

/// Convert several independent documents concurrently.
///
/// At most `config.concurrency` documents are in flight at once. Each
/// document gets its own reconstruction; nothing is shared between them.
/// Results come back in input order, one [`BatchItem`] per input.
pub async fn convert_batch<S: AsRef<str>>(inputs: &[S], config: &ConversionConfig) -> Vec<BatchItem> {
    info!(
        "Starting batch conversion of {} documents (concurrency {})",
        inputs.len(),
        config.concurrency
    );

    let mut items: Vec<(usize, BatchItem)> = stream::iter(inputs.iter().enumerate().map(
        |(i, input)| async move {
            let input = input.as_ref().to_string();
            let result = convert(&input, config).await;
            (i, BatchItem { input, result })
        },
    ))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    items.sort_by_key(|(i, _)| *i);
    items.into_iter().map(|(_, item)| item).collect()
}

/// Read document metadata without reconstructing anything.
///
/// Only `password` and `pdfium_lib_path` are read from `config`. Text
/// inputs never bind pdfium.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Pdf2CsvError> {
    match input::resolve_input(input_str.as_ref())? {
        ResolvedInput::Pdf(path) => {
            extract::extract_metadata(
                &path,
                config.password.as_deref(),
                config.pdfium_lib_path.as_deref(),
            )
            .await
        }
        ResolvedInput::Text { text, .. } => Ok(text_metadata(split_pages(&text).len())),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Reconstruct the table from every successfully extracted page.
fn assemble(
    metadata: DocumentMetadata,
    pages: Vec<PageText>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2CsvError> {
    let extracted = pages.iter().filter(|p| p.error.is_none()).count();
    let failed = pages.len() - extracted;

    if extracted == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no pages selected".to_string());
        return Err(Pdf2CsvError::AllPagesFailed {
            total: pages.len(),
            first_error,
        });
    }

    let lines: Vec<&str> = pages
        .iter()
        .flat_map(|p| p.lines.iter().map(String::as_str))
        .collect();

    let (table, csv, report) = tabulate(&lines, config)?;

    let stats = ConversionStats {
        total_pages: metadata.page_count,
        extracted_pages: extracted,
        failed_pages: failed,
        line_count: lines.len(),
        row_count: table.rows.len(),
        column_count: table.column_count(),
        boundary_count: table.boundaries.len(),
        strategy: table.strategy,
        extract_duration_ms: 0,
        total_duration_ms: 0,
    };

    Ok(ConversionOutput {
        csv,
        table,
        pages,
        metadata,
        stats,
        statement: report,
    })
}

/// Reconstruct, run the enabled statement passes, and serialise.
///
/// The statement header rows go above the table in the CSV but are not
/// part of [`Table::rows`], which stays rectangular.
fn tabulate<S: AsRef<str>>(
    lines: &[S],
    config: &ConversionConfig,
) -> Result<(Table, String, Option<StatementReport>), Pdf2CsvError> {
    let mut table = table::reconstruct(lines, &config.table_params());
    let options = &config.statement;
    if !options.is_enabled() {
        let csv = table.to_csv()?;
        return Ok((table, csv, None));
    }

    let report = statement::apply(&mut table, lines, options);
    let mut csv = String::new();
    if options.header {
        let mut header = report.header.clone();
        header.opening_balance = options.opening_balance.or(header.opening_balance);
        csv.push_str(&table::serialize(&statement::preamble(&header))?);
    }
    csv.push_str(&table.to_csv()?);
    Ok((table, csv, Some(report)))
}

/// Split pre-extracted text into selected pages of lines.
fn text_pages(
    text: &str,
    config: &ConversionConfig,
) -> Result<(DocumentMetadata, Vec<PageText>), Pdf2CsvError> {
    let raw_pages = split_pages(text);
    let total = raw_pages.len();
    let indices = config.pages.to_indices(total);
    if indices.is_empty() {
        return Err(Pdf2CsvError::PageOutOfRange {
            page: extract::first_requested_page(config),
            total,
        });
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(indices.len());
    }

    let pages = indices
        .iter()
        .map(|&idx| {
            let page_num = idx + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(page_num, indices.len());
            }
            let lines = if config.normalize_whitespace {
                normalize::normalize_text(raw_pages[idx])
            } else {
                normalize::split_lines(raw_pages[idx])
            };
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_complete(page_num, indices.len(), lines.len());
            }
            PageText::ok(page_num, lines)
        })
        .collect();

    Ok((text_metadata(total), pages))
}

/// Split text on form feeds. A trailing form feed does not open a new page.
fn split_pages(text: &str) -> Vec<&str> {
    let text = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
    text.split(PAGE_BREAK).collect()
}

fn text_metadata(page_count: usize) -> DocumentMetadata {
    DocumentMetadata {
        source_kind: InputKind::Text,
        page_count,
        ..DocumentMetadata::default()
    }
}

/// Write `contents` to `path` atomically: parent directories are created,
/// the text goes to `<path>.tmp` first and is then renamed into place.
pub async fn write_output(path: &Path, contents: &str) -> Result<(), Pdf2CsvError> {
    let write_err = |source| Pdf2CsvError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
