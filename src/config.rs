//! Configuration types for PDF-to-CSV conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The reconstruction heuristics are
//! fixed numeric thresholds, so they live here as named, overridable fields
//! rather than constants buried in the algorithm.

use crate::error::Pdf2CsvError;
use crate::progress::ProgressCallback;
use crate::table::statement::StatementOptions;
use crate::table::{TableParams, DEFAULT_CLUSTER_TOLERANCE, MIN_BOUNDARY_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for a PDF-to-CSV conversion.
///
/// # Example
/// ```rust
/// use edgequake_pdf2csv::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .cluster_tolerance(4)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.cluster_tolerance, 4);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Largest gap (in chars) between segment starts of one column. Default: 6.
    ///
    /// Columns whose left edges are closer than this merge into one. Lower it
    /// for dense layouts with narrow columns; raise it when values inside a
    /// column drift by a few characters from line to line.
    pub cluster_tolerance: usize,

    /// Minimum boundary count before column slicing is used. Default: 2.
    ///
    /// With fewer boundaries the document is treated as unstructured and each
    /// line is split on runs of two or more spaces instead.
    pub min_boundaries: usize,

    /// Map Unicode space variants and tabs to ASCII space before
    /// reconstruction. Default: true.
    pub normalize_whitespace: bool,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Path to the pdfium shared library, or the directory holding it.
    /// Falls back to `PDFIUM_LIB_PATH`, then to the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Number of documents converted at once by [`crate::convert_batch`]. Default: 4.
    pub concurrency: usize,

    /// Bank-statement passes run after reconstruction. Default: all off.
    pub statement: StatementOptions,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            cluster_tolerance: DEFAULT_CLUSTER_TOLERANCE,
            min_boundaries: MIN_BOUNDARY_COUNT,
            normalize_whitespace: true,
            pages: PageSelection::default(),
            password: None,
            pdfium_lib_path: None,
            concurrency: 4,
            statement: StatementOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("cluster_tolerance", &self.cluster_tolerance)
            .field("min_boundaries", &self.min_boundaries)
            .field("normalize_whitespace", &self.normalize_whitespace)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("concurrency", &self.concurrency)
            .field("statement", &self.statement)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The subset of settings the table reconstruction core needs.
    pub fn table_params(&self) -> TableParams {
        TableParams {
            cluster_tolerance: self.cluster_tolerance,
            min_boundaries: self.min_boundaries,
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn cluster_tolerance(mut self, chars: usize) -> Self {
        self.config.cluster_tolerance = chars;
        self
    }

    pub fn min_boundaries(mut self, n: usize) -> Self {
        self.config.min_boundaries = n;
        self
    }

    pub fn normalize_whitespace(mut self, v: bool) -> Self {
        self.config.normalize_whitespace = v;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn statement(mut self, options: StatementOptions) -> Self {
        self.config.statement = options;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2CsvError> {
        let c = &self.config;
        if c.min_boundaries == 0 {
            return Err(Pdf2CsvError::InvalidConfig(
                "Minimum boundary count must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Pdf2CsvError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.statement.opening_balance.is_some_and(|b| !b.is_finite()) {
            return Err(Pdf2CsvError::InvalidConfig(
                "Opening balance must be a finite number".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into sorted, deduplicated 0-indexed page numbers.
    /// Pages beyond `total_pages` are dropped.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let in_range = |p: usize| (1..=total_pages).contains(&p);
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => in_range(*p).then(|| p - 1).into_iter().collect(),
            PageSelection::Range(start, end) => {
                ((*start).max(1) - 1..(*end).min(total_pages)).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .copied()
                .filter(|&p| in_range(p))
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl FromStr for PageSelection {
    type Err = Pdf2CsvError;

    /// Parse `all`, `5`, `3-15`, or `1,3,5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let page = |p: &str| -> Result<usize, Pdf2CsvError> {
            let n: usize = p.trim().parse().map_err(|_| {
                Pdf2CsvError::InvalidConfig(format!("Invalid page number: '{}'", p.trim()))
            })?;
            if n == 0 {
                return Err(Pdf2CsvError::InvalidConfig(
                    "Pages are 1-indexed, minimum is 1".into(),
                ));
            }
            Ok(n)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (page(start)?, page(end)?);
            if start > end {
                return Err(Pdf2CsvError::InvalidConfig(format!(
                    "Invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }

        if s.contains(',') {
            let pages = s.split(',').map(page).collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        Ok(PageSelection::Single(page(&s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.cluster_tolerance, 6);
        assert_eq!(c.min_boundaries, 2);
        assert!(c.normalize_whitespace);
        assert_eq!(c.pages, PageSelection::All);
        assert_eq!(c.table_params(), TableParams::default());
        assert!(!c.statement.is_enabled());
    }

    #[test]
    fn test_builder_rejects_zero_concurrency() {
        let err = ConversionConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, Pdf2CsvError::InvalidConfig(_)));
    }

    #[test]
    fn test_builder_rejects_zero_min_boundaries() {
        assert!(ConversionConfig::builder().min_boundaries(0).build().is_err());
    }

    #[test]
    fn test_builder_rejects_non_finite_opening_balance() {
        let options = StatementOptions {
            opening_balance: Some(f64::NAN),
            ..StatementOptions::default()
        };
        let err = ConversionConfig::builder().statement(options).build().unwrap_err();
        assert!(matches!(err, Pdf2CsvError::InvalidConfig(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert!(PageSelection::Single(4).to_indices(3).is_empty());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3, 9]).to_indices(5), vec![0, 2]);
    }

    #[test]
    fn test_page_selection_parse() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!(" ALL ".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("5".parse::<PageSelection>().unwrap(), PageSelection::Single(5));
        assert_eq!(
            "3-15".parse::<PageSelection>().unwrap(),
            PageSelection::Range(3, 15)
        );
        assert_eq!(
            "1, 3,5".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn test_page_selection_parse_errors() {
        assert!("0".parse::<PageSelection>().is_err());
        assert!("5-3".parse::<PageSelection>().is_err());
        assert!("x".parse::<PageSelection>().is_err());
        assert!("1,,2".parse::<PageSelection>().is_err());
    }
}
