//! Row slicing and grid normalisation.
//!
//! Given the document-wide boundary set, every non-blank line is cut into
//! cells at the same offsets, so a value that sits under a header ends up in
//! that header's column. When the detector could not find enough boundaries
//! the slicer falls back to splitting on runs of two or more whitespace
//! characters, which is what a human reading a short, loosely formatted
//! snippet would do.

use super::{Grid, Row, SliceStrategy, MIN_BOUNDARY_COUNT};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Slice `lines` into a rectangular grid using the default minimum boundary
/// count ([`MIN_BOUNDARY_COUNT`]).
pub fn slice_rows<S: AsRef<str>>(lines: &[S], boundaries: &[usize]) -> Grid {
    slice_rows_with_min(lines, boundaries, MIN_BOUNDARY_COUNT).0
}

/// Slice `lines` into a rectangular grid.
///
/// Uses fixed-offset slicing when `boundaries` has at least `min_boundaries`
/// entries, gap splitting otherwise. Blank lines are dropped. Returns the
/// grid together with the strategy that produced it.
pub fn slice_rows_with_min<S: AsRef<str>>(
    lines: &[S],
    boundaries: &[usize],
    min_boundaries: usize,
) -> (Grid, SliceStrategy) {
    let non_blank = lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| !line.trim().is_empty());

    let has_structure = !boundaries.is_empty() && boundaries.len() >= min_boundaries;
    let (mut grid, strategy): (Grid, _) = if has_structure {
        (
            non_blank.map(|line| slice_line(line, boundaries)).collect(),
            SliceStrategy::Columns,
        )
    } else {
        (non_blank.map(split_on_gaps).collect(), SliceStrategy::GapSplit)
    };

    pad_rows(&mut grid);
    (grid, strategy)
}

/// Cut one line at the given char offsets and trim every cell.
///
/// Column `k` spans `[boundaries[k], boundaries[k + 1])`; the last column
/// runs to end of line. Offsets past the end of the line yield `""`.
pub fn slice_line(line: &str, boundaries: &[usize]) -> Row {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();

    boundaries
        .iter()
        .enumerate()
        .map(|(k, &start)| {
            if start >= len {
                return String::new();
            }
            let end = boundaries.get(k + 1).map_or(len, |&next| next.min(len));
            chars[start..end.max(start)]
                .iter()
                .collect::<String>()
                .trim()
                .to_string()
        })
        .collect()
}

/// Split a line on runs of two or more whitespace characters.
pub fn split_on_gaps(line: &str) -> Row {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    RE_COLUMN_GAP
        .split(trimmed)
        .map(|piece| piece.trim().to_string())
        .collect()
}

/// Pad every row with trailing empty cells up to the widest row.
pub fn pad_rows(grid: &mut Grid) {
    let max_cols = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in grid.iter_mut() {
        row.resize(max_cols, String::new());
    }
}
