//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while pages are extracted. Reconstruction runs once over the whole
//! document afterwards. Every document ends with exactly one of
//! `on_conversion_complete` or `on_conversion_error`.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2csv::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct LineCounter {
//!     lines: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for LineCounter {
//!     fn on_page_complete(&self, _page_num: usize, _total_pages: usize, line_count: usize) {
//!         self.lines.fetch_add(line_count, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(LineCounter { lines: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it extracts each page.
///
/// Implementations must be `Send + Sync`: [`crate::convert_batch`] converts
/// several documents at once and shares one callback between them. All
/// methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once per document before any page is extracted.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's text is extracted (1-indexed).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's text was extracted.
    ///
    /// `line_count` is the number of text lines the page contributed.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, line_count: usize) {
        let _ = (page_num, total_pages, line_count);
    }

    /// Called when a page's text could not be extracted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once per document after the table has been reconstructed.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }

    /// Called once per document when the conversion failed as a whole.
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
