//! Error types for the edgequake-pdf2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2CsvError`] — **Fatal**: the conversion cannot proceed at all
//!   (missing file, wrong password, pdfium unavailable). Returned as
//!   `Err(Pdf2CsvError)` from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: the text of one page could not be
//!   extracted but the other pages are fine. Stored inside
//!   [`crate::output::PageText`] so callers can see which pages were skipped.
//!
//! Table reconstruction itself never fails: every input, including an empty
//! one, produces a (possibly empty) table.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2csv library.
#[derive(Debug, Error)]
pub enum Pdf2CsvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file is neither a PDF nor UTF-8 text.
    #[error("File is not a PDF or UTF-8 text: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Every selected page failed text extraction.
    #[error("Text extraction failed on all {total} selected pages.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    /// Some pages were extracted but at least one failed.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any page failure as an error.
    #[error("{failed}/{total} pages failed text extraction")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction from PDF files needs the pdfium shared library.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory), or\n\
  • pass --pdfium-lib <PATH>, or\n\
  • install libpdfium where the system loader can find it.\n\
Pre-extracted .txt inputs do not need pdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// pdfium could not load the page or its text layer.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextExtractionFailed { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = Pdf2CsvError::AllPagesFailed {
            total: 3,
            first_error: "Page 1: text extraction failed: boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("all 3"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn partial_failure_display() {
        let e = Pdf2CsvError::PartialFailure {
            success: 9,
            failed: 1,
            total: 10,
        };
        assert!(e.to_string().contains("1/10"));
    }

    #[test]
    fn not_a_pdf_display_shows_magic() {
        let e = Pdf2CsvError::NotAPdf {
            path: PathBuf::from("scan.png"),
            magic: *b"\x89PNG",
        };
        assert!(e.to_string().contains("scan.png"));
    }

    #[test]
    fn page_out_of_range_display() {
        let e = Pdf2CsvError::PageOutOfRange { page: 9, total: 2 };
        assert!(e.to_string().contains("Page 9"));
        assert!(e.to_string().contains("2 pages"));
    }

    #[test]
    fn page_error_display() {
        let e = PageError::TextExtractionFailed {
            page: 4,
            detail: "no text layer".into(),
        };
        assert_eq!(e.to_string(), "Page 4: text extraction failed: no text layer");
    }

    #[test]
    fn binding_error_mentions_env_var() {
        let e = Pdf2CsvError::PdfiumBindingFailed("not found".into());
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
