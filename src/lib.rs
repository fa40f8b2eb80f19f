//! # edgequake-pdf2csv
//!
//! Rebuild tables from statement-style PDFs and export them as CSV.
//!
//! ## Why this crate?
//!
//! Bank statements, invoices and reports put their tables in the PDF text
//! layer as plain runs of characters with no cell structure. Extract that
//! text and all that survives is alignment: values of one column start at
//! about the same character offset on every line. This crate infers those
//! offsets across the whole document, cuts every line at them and writes a
//! rectangular, RFC 4180 style CSV.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (or pre-extracted text)
//!  │
//!  ├─ 1. Input      validate the path, sniff %PDF vs UTF-8 text
//!  ├─ 2. Extract    page text via pdfium (spawn_blocking)
//!  ├─ 3. Normalise  Unicode spaces and tabs → ASCII space
//!  ├─ 4. Boundary   pool segment starts, cluster into column edges
//!  ├─ 5. Slice      cut lines at the edges, pad to a rectangle
//!  ├─ 6. Statement  optional: header, dedup, transaction filter, balance check
//!  └─ 7. Serialise  CRLF rows, minimal quoting
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2csv::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("statement.pdf", &config).await?;
//!     print!("{}", output.csv);
//!     eprintln!("{} rows × {} columns",
//!         output.stats.row_count,
//!         output.stats.column_count);
//!     Ok(())
//! }
//! ```
//!
//! Lines you already have can skip extraction entirely:
//!
//! ```rust
//! use edgequake_pdf2csv::{reconstruct, TableParams};
//!
//! let lines = [
//!     "Date       Description         Amount",
//!     "01/01      Coffee Shop         12.50",
//! ];
//! let table = reconstruct(&lines, &TableParams::default());
//! assert_eq!(table.to_csv().unwrap(), "Date,Description,Amount\r\n01/01,Coffee Shop,12.50\r\n");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2csv = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! PDF text comes from the pdfium shared library, loaded at runtime from
//! [`ConversionConfig::pdfium_lib_path`], the `PDFIUM_LIB_PATH` environment
//! variable, or the system loader path, in that order. Text inputs never
//! touch pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection};
pub use convert::{
    convert, convert_batch, convert_from_bytes, convert_lines, convert_sync, convert_to_file,
    inspect, write_output,
};
pub use error::{PageError, Pdf2CsvError};
pub use output::{BatchItem, ConversionOutput, ConversionStats, DocumentMetadata, PageText};
pub use pipeline::input::InputKind;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use table::{
    detect_boundaries, reconstruct, serialize, slice_rows, Grid, Row, SliceStrategy, Table,
    TableParams, DEFAULT_CLUSTER_TOLERANCE, MIN_BOUNDARY_COUNT,
};
pub use table::statement::{
    BalanceCheck, BalanceMismatch, BalanceReport, StatementHeader, StatementOptions,
    StatementReport,
};
