//! Table reconstruction from whitespace-aligned text.
//!
//! Text extracted from a statement-style PDF arrives as flat lines. The only
//! trace of the original table is that values in the same column start at
//! roughly the same character offset. Reconstruction runs in three strictly
//! ordered steps:
//!
//! ```text
//! lines ──▶ boundary ──▶ slice ──▶ serialize
//!          (offsets)    (grid)     (CSV)
//! ```
//!
//! 1. [`boundary`]  — pool segment starts from every line and cluster them
//!    into one left edge per column
//! 2. [`slice`]     — cut each non-blank line at those edges, trim, and pad
//!    to a rectangle; fall back to gap splitting when no structure was found
//! 3. [`serialize`] — CRLF-terminated CSV with minimal quoting
//!
//! [`statement`] holds optional bank-statement passes (account header,
//! duplicate and non-transaction row removal, balance check) that run on
//! the grid between slicing and serialisation.
//!
//! Everything here is a pure function of its inputs. Nothing is cached
//! between documents.

pub mod boundary;
pub mod serialize;
pub mod slice;
pub mod statement;

pub use boundary::{cluster_offsets, detect_boundaries, segment_starts};
pub use serialize::serialize;
pub use slice::{pad_rows, slice_line, slice_rows, slice_rows_with_min, split_on_gaps};

use crate::error::Pdf2CsvError;
use serde::{Deserialize, Serialize};

/// Largest gap, in chars, between two segment starts of the same column.
pub const DEFAULT_CLUSTER_TOLERANCE: usize = 6;

/// Fewer boundaries than this means no usable column structure.
pub const MIN_BOUNDARY_COUNT: usize = 2;

/// One reconstructed row of trimmed cells.
pub type Row = Vec<String>;

/// Rectangular matrix of cells, in input line order.
pub type Grid = Vec<Row>;

/// How the rows of a [`Table`] were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceStrategy {
    /// Cut at the detected column boundaries.
    Columns,
    /// Split on runs of two or more whitespace characters.
    GapSplit,
}

/// Tuning knobs for [`reconstruct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableParams {
    pub cluster_tolerance: usize,
    pub min_boundaries: usize,
}

impl Default for TableParams {
    fn default() -> Self {
        Self {
            cluster_tolerance: DEFAULT_CLUSTER_TOLERANCE,
            min_boundaries: MIN_BOUNDARY_COUNT,
        }
    }
}

/// A reconstructed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column left edges (char offsets), ascending.
    pub boundaries: Vec<usize>,
    /// Strategy that produced `rows`.
    pub strategy: SliceStrategy,
    /// Rectangular grid; every row has [`Table::column_count`] cells.
    pub rows: Grid,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialise the rows as CSV.
    pub fn to_csv(&self) -> Result<String, Pdf2CsvError> {
        serialize(&self.rows)
    }
}

/// Detect boundaries over the whole document, then slice every line.
pub fn reconstruct<S: AsRef<str>>(lines: &[S], params: &TableParams) -> Table {
    let boundaries = detect_boundaries(lines, params.cluster_tolerance);
    let (rows, strategy) = slice_rows_with_min(lines, &boundaries, params.min_boundaries);
    tracing::debug!(
        boundaries = ?boundaries,
        ?strategy,
        rows = rows.len(),
        "Reconstructed table"
    );
    Table {
        boundaries,
        strategy,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_statement() {
        let lines = [
            "Date       Description         Amount",
            "",
            "01/01      Coffee Shop         12.50",
            "02/01      Book Store          7.00",
        ];
        let table = reconstruct(&lines, &TableParams::default());
        assert_eq!(table.boundaries, vec![0, 11, 31]);
        assert_eq!(table.strategy, SliceStrategy::Columns);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0], vec!["Date", "Description", "Amount"]);
        assert_eq!(table.rows[1], vec!["01/01", "Coffee Shop", "12.50"]);
        assert_eq!(table.rows[2], vec!["02/01", "Book Store", "7.00"]);
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_reconstruct_single_blank_line() {
        let table = reconstruct(&[""], &TableParams::default());
        assert!(table.boundaries.is_empty());
        assert!(table.is_empty());
        assert_eq!(table.to_csv().unwrap(), "");
    }

    #[test]
    fn test_reconstruct_degenerate_fallback() {
        let table = reconstruct(&["A  B  C"], &TableParams::default());
        assert_eq!(table.boundaries, vec![0]);
        assert_eq!(table.strategy, SliceStrategy::GapSplit);
        assert_eq!(table.rows, vec![vec!["A", "B", "C"]]);
        assert_eq!(table.to_csv().unwrap(), "A,B,C\r\n");
    }

    #[test]
    fn test_reconstruct_tolerance_changes_split() {
        let lines = ["Date  Description      Amount", "01/01  Coffee Shop      12.50"];
        let wide = reconstruct(&lines, &TableParams::default());
        assert_eq!(wide.boundaries, vec![0, 14, 23]);

        let tight = reconstruct(
            &lines,
            &TableParams {
                cluster_tolerance: 2,
                ..TableParams::default()
            },
        );
        assert_eq!(tight.boundaries, vec![0, 6, 14, 23]);
        assert_eq!(tight.rows[1], vec!["01/01", "Coffee", "Shop", "12.50"]);
    }

    #[test]
    fn test_reconstruct_is_deterministic() {
        let lines = [
            "Ref     Date         Value",
            "A1      2024-01-01   10.00",
            "B2      2024-01-02   -3.10",
        ];
        let params = TableParams::default();
        assert_eq!(reconstruct(&lines, &params), reconstruct(&lines, &params));
    }
}
