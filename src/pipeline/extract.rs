//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks on every call. Running extraction inside
//! `tokio::task::spawn_blocking` keeps the async workers free when several
//! documents are converted concurrently.
//!
//! ## Binding
//!
//! The library is located in this order: the configured
//! `pdfium_lib_path`, the `PDFIUM_LIB_PATH` environment variable, then the
//! system loader path. Either a file or the directory containing the
//! platform library name is accepted.

use crate::config::ConversionConfig;
use crate::error::{PageError, Pdf2CsvError};
use crate::output::{DocumentMetadata, PageText};
use crate::pipeline::input::InputKind;
use crate::pipeline::normalize;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable consulted when no library path is configured.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract the text of the selected pages, plus document metadata.
///
/// Pages whose text cannot be read are returned as failed [`PageText`]
/// entries rather than aborting the document.
pub async fn extract_document(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<(DocumentMetadata, Vec<PageText>), Pdf2CsvError> {
    let path = pdf_path.to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || extract_document_blocking(&path, &config))
        .await
        .map_err(|e| Pdf2CsvError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Read document metadata without extracting any page text.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentMetadata, Pdf2CsvError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(str::to_string);
    let lib = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium(lib.as_deref())?;
        let document = open_document(&pdfium, &path, pwd.as_deref())?;
        Ok(read_metadata(&document))
    })
    .await
    .map_err(|e| Pdf2CsvError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Bind to a pdfium shared library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, Pdf2CsvError> {
    let configured = lib_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

    let bindings = match configured {
        Some(p) => {
            let lib = if p.is_dir() {
                p.join(Pdfium::pdfium_platform_library_name())
            } else {
                p
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib).map_err(|e| {
                Pdf2CsvError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
            })?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| Pdf2CsvError::PdfiumBindingFailed(format!("system library: {:?}", e)))?,
    };

    Ok(Pdfium::new(bindings))
}

fn extract_document_blocking(
    pdf_path: &Path,
    config: &ConversionConfig,
) -> Result<(DocumentMetadata, Vec<PageText>), Pdf2CsvError> {
    let pdfium = bind_pdfium(config.pdfium_lib_path.as_deref())?;
    let document = open_document(&pdfium, pdf_path, config.password.as_deref())?;
    let metadata = read_metadata(&document);
    let total_pages = metadata.page_count;
    info!("PDF loaded: {} pages", total_pages);

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(Pdf2CsvError::PageOutOfRange {
            page: first_requested_page(config),
            total: total_pages,
        });
    }

    let selected = page_indices.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    let pages = document.pages();
    let mut results = Vec::with_capacity(selected);

    for idx in page_indices {
        let page_num = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, selected);
        }

        let text = pages
            .get(idx as u16)
            .and_then(|page| {
                let text = page.text()?;
                Ok(text.all())
            })
            .map_err(|e| PageError::TextExtractionFailed {
                page: page_num,
                detail: format!("{:?}", e),
            });

        let result = match text {
            Ok(text) => {
                let lines = if config.normalize_whitespace {
                    normalize::normalize_text(&text)
                } else {
                    normalize::split_lines(&text)
                };
                debug!("Extracted page {} → {} lines", page_num, lines.len());
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_complete(page_num, selected, lines.len());
                }
                PageText::ok(page_num, lines)
            }
            Err(e) => {
                warn!("Skipping page {}: {}", page_num, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_error(page_num, selected, &e.to_string());
                }
                PageText::failed(e)
            }
        };
        results.push(result);
    }

    Ok((metadata, results))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2CsvError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2CsvError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2CsvError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2CsvError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentMetadata {
        source_kind: InputKind::Pdf,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

/// Page number to report when a selection matches nothing.
pub(crate) fn first_requested_page(config: &ConversionConfig) -> usize {
    use crate::config::PageSelection;
    match &config.pages {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSelection;

    #[test]
    fn test_first_requested_page() {
        let mut c = ConversionConfig::default();
        assert_eq!(first_requested_page(&c), 0);
        c.pages = PageSelection::Range(7, 9);
        assert_eq!(first_requested_page(&c), 7);
        c.pages = PageSelection::Set(vec![12, 4]);
        assert_eq!(first_requested_page(&c), 4);
    }

    #[test]
    fn test_bind_missing_library_fails_cleanly() {
        let err = bind_pdfium(Some(Path::new("/nonexistent/libpdfium.so"))).unwrap_err();
        assert!(matches!(err, Pdf2CsvError::PdfiumBindingFailed(_)));
    }
}
