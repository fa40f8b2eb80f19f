//! CSV serialisation of a reconstructed grid.
//!
//! Output follows the interchange convention spreadsheet tools expect: CRLF
//! after every row (including the last), and a cell is quoted only when it
//! contains a comma, a double quote, or a line break. Writing goes through
//! the [`csv`] crate's writer so quoting matches any RFC 4180 reader.

use super::Row;
use crate::error::Pdf2CsvError;

/// Serialise `rows` to CSV text. No rows yields an empty string.
///
/// Rows may differ in length; the grids produced by
/// [`super::reconstruct`] never do.
pub fn serialize(rows: &[Row]) -> Result<String, Pdf2CsvError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .flexible(true)
        .from_writer(Vec::with_capacity(estimate_len(rows)));

    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| Pdf2CsvError::Internal(format!("CSV write failed: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Pdf2CsvError::Internal(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Pdf2CsvError::Internal(format!("CSV output is not UTF-8: {e}")))
}

fn estimate_len(rows: &[Row]) -> usize {
    rows.iter()
        .map(|row| row.iter().map(|c| c.len() + 1).sum::<usize>() + 2)
        .sum()
}
