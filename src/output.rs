//! Result types returned by the conversion entry points.

use crate::error::{PageError, Pdf2CsvError};
use crate::pipeline::input::InputKind;
use crate::table::statement::StatementReport;
use crate::table::{SliceStrategy, Table};
use serde::{Deserialize, Serialize};

/// Everything produced by one document conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// CSV text (CRLF rows, minimal quoting).
    pub csv: String,
    /// The reconstructed table the CSV was serialised from.
    pub table: Table,
    /// Per-page extraction results, in page order.
    pub pages: Vec<PageText>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
    /// Findings of the statement passes; `None` when none were enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<StatementReport>,
}

impl ConversionOutput {
    /// Treat any failed page as an error.
    pub fn into_result(self) -> Result<Self, Pdf2CsvError> {
        if self.stats.failed_pages == 0 {
            return Ok(self);
        }
        Err(Pdf2CsvError::PartialFailure {
            success: self.stats.extracted_pages,
            failed: self.stats.failed_pages,
            total: self.pages.len(),
        })
    }
}

/// Text extracted from one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Lines of text, whitespace-normalised when enabled.
    #[serde(skip)]
    pub lines: Vec<String>,
    /// Number of lines the page contributed.
    pub line_count: usize,
    /// Set when extraction failed; `lines` is then empty.
    pub error: Option<PageError>,
}

impl PageText {
    pub fn ok(page_num: usize, lines: Vec<String>) -> Self {
        Self {
            page_num,
            line_count: lines.len(),
            lines,
            error: None,
        }
    }

    pub fn failed(error: PageError) -> Self {
        let page_num = match &error {
            PageError::TextExtractionFailed { page, .. } => *page,
        };
        Self {
            page_num,
            lines: Vec::new(),
            line_count: 0,
            error: Some(error),
        }
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source_kind: InputKind,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Selected pages whose text was extracted.
    pub extracted_pages: usize,
    /// Selected pages whose extraction failed.
    pub failed_pages: usize,
    /// Lines fed to reconstruction (blank lines included).
    pub line_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub boundary_count: usize,
    pub strategy: SliceStrategy,
    pub extract_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Outcome for one input of [`crate::convert_batch`].
#[derive(Debug)]
pub struct BatchItem {
    /// The input path as given.
    pub input: String,
    pub result: Result<ConversionOutput, Pdf2CsvError>,
}
